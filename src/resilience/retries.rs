//! Retry classification.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is worth repeating
//!
//! # Design Decisions
//! - 4xx means the receiver rejected the request; repeating it cannot help,
//!   except for 408 (timeout), 425 (too early) and 429 (rate limited)
//! - Everything else (5xx, network errors, timeouts) is temporary

/// Outcome class of a failed delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retrying cannot succeed; stop immediately.
    Permanent,
    /// Retrying may succeed.
    Temporary,
}

/// 4xx statuses that are still worth retrying.
pub const RETRYABLE_CLIENT_STATUSES: [u16; 3] = [408, 425, 429];

/// Classify a non-2xx HTTP status.
pub fn classify_status(status: u16) -> FailureClass {
    if (400..500).contains(&status) && !RETRYABLE_CLIENT_STATUSES.contains(&status) {
        FailureClass::Permanent
    } else {
        FailureClass::Temporary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_permanent() {
        for status in [400, 401, 403, 404, 405, 410, 413, 422, 499] {
            assert_eq!(classify_status(status), FailureClass::Permanent, "{status}");
        }
    }

    #[test]
    fn test_retryable_client_errors() {
        for status in RETRYABLE_CLIENT_STATUSES {
            assert_eq!(classify_status(status), FailureClass::Temporary, "{status}");
        }
    }

    #[test]
    fn test_server_errors_are_temporary() {
        for status in [500, 502, 503, 504, 599] {
            assert_eq!(classify_status(status), FailureClass::Temporary, "{status}");
        }
    }
}
