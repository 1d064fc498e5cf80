//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Ctrl-C / caller cancel / deadline
//!     → signals.rs (cancel root context)
//!     → context.rs (token + deadline, inherited by children)
//!     → Sender observes it during backoff waits and in-flight requests
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative and observed at every suspension point
//! - Deadlines only ever shrink from parent to child

pub mod context;
pub mod signals;

pub use context::{Context, ContextError};
