//! Metrics collection.
//!
//! # Responsibilities
//! - Define delivery metrics (attempts, outcomes, latency, breaker activity)
//! - Record through the `metrics` facade; the embedding application picks
//!   the exporter
//!
//! # Metrics
//! - `webhook_delivery_attempts_total` (counter): attempts by outcome, status
//! - `webhook_delivery_duration_seconds` (histogram): per-attempt latency
//! - `webhook_deliveries_total` (counter): terminal results by result
//! - `webhook_circuit_rejections_total` (counter): sends refused by a breaker
//! - `webhook_circuit_transitions_total` (counter): breaker transitions by target state
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op
//! - Status label is the numeric code, or "none" when no response arrived

use std::time::Duration;

use crate::resilience::circuit_breaker::CircuitState;

pub fn record_attempt(success: bool, status_code: u16, duration: Duration) {
    let outcome = if success { "success" } else { "failure" };
    let status = if status_code == 0 {
        "none".to_string()
    } else {
        status_code.to_string()
    };
    metrics::counter!(
        "webhook_delivery_attempts_total",
        "outcome" => outcome,
        "status" => status
    )
    .increment(1);
    metrics::histogram!("webhook_delivery_duration_seconds").record(duration.as_secs_f64());
}

/// `result` is one of "delivered", "permanent", "exhausted", "cancelled".
pub fn record_delivery(result: &'static str) {
    metrics::counter!("webhook_deliveries_total", "result" => result).increment(1);
}

pub fn record_circuit_rejection() {
    metrics::counter!("webhook_circuit_rejections_total").increment(1);
}

pub fn record_circuit_transition(to: CircuitState) {
    metrics::counter!("webhook_circuit_transitions_total", "to" => to.as_str()).increment(1);
}
