//! Webhook delivery subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → sender.rs (encode, validate, attempt loop)
//!     → options.rs (per-call overrides)
//!     → result.rs (per-attempt report to the caller's hook)
//!     → error.rs (terminal classification)
//! ```

pub mod error;
pub mod options;
pub mod result;
pub mod sender;

pub use error::{is_circuit_open, DeliveryError, Result};
pub use options::SendOptions;
pub use result::{DeliveryHook, DeliveryResult};
pub use sender::{Sender, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
