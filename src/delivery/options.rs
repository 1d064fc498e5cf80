//! Per-call delivery options.
//!
//! Every field is an override; anything left unset falls back to the
//! sender's defaults. Headers are merged, with per-call values winning.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::delivery::result::{DeliveryHook, DeliveryResult};
use crate::resilience::backoff::BackoffStrategy;
use crate::resilience::circuit_breaker::CircuitBreaker;

#[derive(Clone, Default)]
pub struct SendOptions {
    pub(crate) timeout: Option<Duration>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) max_retries: Option<u32>,
    pub(crate) backoff: Option<BackoffStrategy>,
    pub(crate) signature_secret: Option<String>,
    pub(crate) circuit_breaker: Option<Arc<CircuitBreaker>>,
    pub(crate) on_delivery: Option<DeliveryHook>,
    pub(crate) http_client: Option<reqwest::Client>,
    pub(crate) max_payload_size: Option<usize>,
    pub(crate) max_response_size: Option<usize>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Retries after the first attempt; 0 means a single attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_backoff(mut self, backoff: impl Into<BackoffStrategy>) -> Self {
        self.backoff = Some(backoff.into());
        self
    }

    /// Sign every attempt with HMAC-SHA256 under `secret`.
    pub fn with_signature_secret(mut self, secret: impl Into<String>) -> Self {
        self.signature_secret = Some(secret.into());
        self
    }

    /// Gate and record on a breaker shared with other sends to the same
    /// destination.
    pub fn with_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    pub fn on_delivery<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DeliveryResult) + Send + Sync + 'static,
    {
        self.on_delivery = Some(Arc::new(hook));
        self
    }

    /// Use a caller-built client (custom proxy, TLS roots, ...).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn with_max_payload_size(mut self, bytes: usize) -> Self {
        self.max_payload_size = Some(bytes);
        self
    }

    /// Most bytes of an error response read for diagnostics.
    pub fn with_max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = Some(bytes);
        self
    }
}

impl fmt::Debug for SendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendOptions")
            .field("timeout", &self.timeout)
            .field("headers", &self.headers.iter().map(|(k, _)| k).collect::<Vec<_>>())
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("signed", &self.signature_secret.is_some())
            .field("circuit_breaker", &self.circuit_breaker.is_some())
            .field("on_delivery", &self.on_delivery.is_some())
            .field("http_client", &self.http_client.is_some())
            .field("max_payload_size", &self.max_payload_size)
            .field("max_response_size", &self.max_response_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_overrides() {
        let options = SendOptions::new()
            .with_timeout(Duration::from_secs(2))
            .with_max_retries(0)
            .with_header("X-Tenant", "acme")
            .with_headers([("X-A", "1"), ("X-B", "2")])
            .with_max_response_size(128);

        assert_eq!(options.timeout, Some(Duration::from_secs(2)));
        assert_eq!(options.max_retries, Some(0));
        assert_eq!(options.headers.len(), 3);
        assert_eq!(options.max_response_size, Some(128));
        assert!(options.max_payload_size.is_none());
    }

    #[test]
    fn test_debug_redacts_secret_and_header_values() {
        let options = SendOptions::new()
            .with_signature_secret("super-secret")
            .with_header("Authorization", "Bearer token-value");
        let debug = format!("{options:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("token-value"));
        assert!(debug.contains("Authorization"));
    }
}
