//! Timeout enforcement.
//!
//! # Responsibilities
//! - Compute the deadline of a single delivery attempt
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities (`timeout_at`)
//! - An attempt never outlives the caller's deadline
//! - Timeout errors are distinct from other errors

use std::time::Duration;

use tokio::time::Instant;

/// Earlier of `now + timeout` and the caller's deadline.
pub fn attempt_deadline(now: Instant, timeout: Duration, parent: Option<Instant>) -> Instant {
    let own = now.checked_add(timeout).unwrap_or_else(far_future);
    match parent {
        Some(parent) => own.min(parent),
        None => own,
    }
}

fn far_future() -> Instant {
    // Roughly 30 years, the same horizon tokio uses for "never".
    Instant::now() + Duration::from_secs(86_400 * 365 * 30)
}
