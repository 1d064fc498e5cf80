//! Outbound webhook delivery library.
//!
//! Delivers JSON payloads to HTTP endpoints with retries, backoff,
//! per-attempt timeouts, cancellation, circuit breaking and HMAC-SHA256
//! signing, and gives receivers the matching verification.
//!
//! ```text
//! Sender::send(ctx, url, payload, options)
//!     → security (URL vetting, size caps, signing)
//!     → resilience (breaker gate, timeouts, classification, backoff)
//!     → delivery (attempt loop, hook, terminal error)
//! ```

// Core
pub mod delivery;
pub mod security;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::SenderConfig;
pub use delivery::{DeliveryError, DeliveryResult, SendOptions, Sender};
pub use lifecycle::Context;
pub use resilience::{BackoffStrategy, CircuitBreaker, CircuitBreakerRegistry, CircuitState};
pub use security::{sign_payload, verify_signature, SignatureError, SignatureHeaders};
