//! Error types for webhook delivery.
//!
//! Every failure falls into one class that drives what the sender does next:
//!
//! | class          | variants                                               | retried |
//! |----------------|--------------------------------------------------------|---------|
//! | configuration  | `Encode`, `InvalidUrl`, `EmptyPayload`, `PayloadTooLarge`, `InvalidHeader`, `Signing`, `Client` | no, and no request is made |
//! | circuit open   | `CircuitOpen`                                          | no, and no request is made |
//! | permanent      | `Permanent` (4xx except 408/425/429)                   | no      |
//! | temporary      | `Temporary`, `Network`, `Timeout`                      | yes     |
//! | context        | `Context` (cancelled or caller deadline)               | no      |
//!
//! `RetriesExhausted` wraps the last temporary failure once the retry budget
//! is spent.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::ContextError;
use crate::security::{DestinationError, SignatureError};

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("failed to encode payload as JSON: {0}")]
    Encode(#[source] Arc<serde_json::Error>),

    #[error("invalid destination URL: {0}")]
    InvalidUrl(#[source] DestinationError),

    #[error("payload is empty")]
    EmptyPayload,

    #[error("payload is {size} bytes, limit is {limit}")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("signing failed: {0}")]
    Signing(#[from] SignatureError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] Arc<reqwest::Error>),

    #[error("circuit breaker open for {destination}")]
    CircuitOpen { destination: String },

    #[error("webhook rejected with HTTP {status}{}", detail(.body))]
    Permanent { status: u16, body: String },

    #[error("webhook failed with HTTP {status}{}", detail(.body))]
    Temporary { status: u16, body: String },

    #[error("request failed: {0}")]
    Network(#[source] Arc<reqwest::Error>),

    #[error("attempt timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("delivery failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<DeliveryError>,
    },
}

fn detail(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl DeliveryError {
    pub fn circuit_open(destination: impl Into<String>) -> Self {
        Self::CircuitOpen {
            destination: destination.into(),
        }
    }

    pub fn invalid_header(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHeader {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// The last attempt's error for exhausted deliveries, otherwise `self`.
    pub fn last_error(&self) -> &DeliveryError {
        match self {
            Self::RetriesExhausted { last, .. } => last.last_error(),
            other => other,
        }
    }

    /// Rejected before any request was made because of bad input.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Encode(_)
                | Self::InvalidUrl(_)
                | Self::EmptyPayload
                | Self::PayloadTooLarge { .. }
                | Self::InvalidHeader { .. }
                | Self::Signing(_)
                | Self::Client(_)
        )
    }

    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// The receiver refused the delivery; retrying cannot help.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent { .. })
    }

    /// Worth retrying. An exhausted delivery reports its last failure's class.
    pub fn is_temporary(&self) -> bool {
        matches!(
            self.last_error(),
            Self::Temporary { .. } | Self::Network(_) | Self::Timeout(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.last_error(), Self::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Context(_))
    }

    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    /// HTTP status of the (last) response, if one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self.last_error() {
            Self::Permanent { status, .. } | Self::Temporary { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Attempts made before giving up, for exhausted deliveries.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

/// True if `err` or anything in its source chain is a circuit-open error.
///
/// Useful once a `DeliveryError` has been boxed or wrapped by the caller.
pub fn is_circuit_open(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(delivery) = e.downcast_ref::<DeliveryError>() {
            if delivery.is_circuit_open() {
                return true;
            }
        }
        current = e.source();
    }
    false
}
