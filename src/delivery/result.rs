//! Per-attempt delivery reports.

use std::sync::Arc;
use std::time::Duration;

use crate::delivery::error::DeliveryError;

/// Outcome of a single delivery attempt, handed to the `on_delivery` hook.
#[derive(Debug, Clone)]
pub struct DeliveryResult {
    pub success: bool,
    /// HTTP status, or 0 when no response was received.
    pub status_code: u16,
    /// 1-based attempt number.
    pub attempt: u32,
    pub duration: Duration,
    pub error: Option<DeliveryError>,
}

/// Observer invoked synchronously once per attempt, in attempt order.
pub type DeliveryHook = Arc<dyn Fn(&DeliveryResult) + Send + Sync>;
