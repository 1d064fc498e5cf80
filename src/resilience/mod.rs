//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Delivery to a destination:
//!     → circuit_breaker.rs (fail fast if the destination is known down)
//!     → timeouts.rs (bound every attempt by a deadline)
//!     → On failure: retries.rs (permanent or temporary?)
//!     → backoff.rs (how long to wait before the next attempt)
//!     → circuit_breaker.rs (record the outcome)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every attempt has a deadline
//! - Webhook POSTs are retried; receivers deduplicate by delivery ID
//! - Circuit breakers are per destination and shared across sends

pub mod backoff;
pub mod circuit_breaker;
pub mod clock;
pub mod registry;
pub mod retries;
pub mod timeouts;

pub use backoff::{BackoffStrategy, ExponentialBackoff, FixedBackoff, LinearBackoff};
pub use circuit_breaker::{CircuitBreaker, CircuitState, CircuitStats};
pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::CircuitBreakerRegistry;
pub use retries::{classify_status, FailureClass};
