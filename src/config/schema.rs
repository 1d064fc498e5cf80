//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the sender.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::backoff::{BackoffStrategy, ExponentialBackoff, FixedBackoff, LinearBackoff};
use crate::security::limits::{DEFAULT_MAX_PAYLOAD_BYTES, DEFAULT_MAX_RESPONSE_BYTES};
use crate::security::signing::SignatureError;

/// Root configuration for the webhook sender.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SenderConfig {
    /// Per-delivery behavior (timeout, retries, headers).
    pub delivery: DeliveryConfig,

    /// Wait policy between attempts.
    pub backoff: BackoffConfig,

    /// Per-destination circuit breaking.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Payload signing.
    pub signing: SigningConfig,

    /// Size caps.
    pub limits: LimitsConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// User-Agent header sent with every delivery.
    pub user_agent: String,

    /// Extra headers added to every delivery.
    pub headers: BTreeMap<String, String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 3,
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("webhook-sender/{}", env!("CARGO_PKG_VERSION"))
}

/// Which backoff variant to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Linear,
    Exponential,
}

/// Backoff configuration.
///
/// `interval_ms` drives fixed and linear; `initial_ms`, `multiplier` and
/// `jitter_factor` drive exponential; `max_interval_ms` caps linear and
/// exponential.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub kind: BackoffKind,
    pub interval_ms: u64,
    pub initial_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            kind: BackoffKind::Exponential,
            interval_ms: 1000,
            initial_ms: 1000,
            max_interval_ms: 30_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl BackoffConfig {
    pub fn strategy(&self) -> BackoffStrategy {
        let max = Duration::from_millis(self.max_interval_ms);
        match self.kind {
            BackoffKind::Fixed => FixedBackoff::new(Duration::from_millis(self.interval_ms)).into(),
            BackoffKind::Linear => {
                LinearBackoff::new(Duration::from_millis(self.interval_ms), max).into()
            }
            BackoffKind::Exponential => {
                ExponentialBackoff::new(Duration::from_millis(self.initial_ms), max, self.multiplier)
                    .with_jitter(self.jitter_factor)
                    .into()
            }
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Create breakers for destinations.
    pub enabled: bool,

    /// Consecutive failures before opening.
    pub failure_threshold: u32,

    /// Consecutive half-open successes before closing.
    pub success_threshold: u32,

    /// Seconds an open circuit waits before admitting trial deliveries.
    pub recovery_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            failure_threshold: 5,
            success_threshold: 2,
            recovery_timeout_secs: 30,
        }
    }
}

/// Signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Environment variable holding the shared secret. Secrets never live in
    /// the config file.
    pub secret_env: Option<String>,

    /// Maximum signature age accepted by `verify`, in seconds (0 disables).
    pub max_age_secs: u64,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret_env: None,
            max_age_secs: 300,
        }
    }
}

impl SigningConfig {
    /// Read the secret from the configured environment variable.
    ///
    /// `Ok(None)` when signing is not configured. A named variable that is
    /// unset or empty is an error so a signed setup never degrades to
    /// unsigned deliveries.
    pub fn resolve_secret(&self) -> Result<Option<String>, SignatureError> {
        let Some(var) = self.secret_env.as_deref() else {
            return Ok(None);
        };
        match std::env::var(var) {
            Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
            _ => Err(SignatureError::SecretEnvUnset(var.to_string())),
        }
    }

    /// Max age for verification: an explicit override wins over the file.
    pub fn verification_max_age(&self, override_secs: Option<u64>) -> Duration {
        Duration::from_secs(override_secs.unwrap_or(self.max_age_secs))
    }
}

/// Size limit configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest marshaled payload accepted, in bytes.
    pub max_payload_bytes: usize,

    /// Most error-response bytes read for diagnostics.
    pub max_response_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_delivery_defaults() {
        let config = SenderConfig::default();
        assert_eq!(config.delivery.timeout_secs, 10);
        assert_eq!(config.delivery.max_retries, 3);
        assert!(config.delivery.user_agent.starts_with("webhook-sender/"));
        assert_eq!(config.backoff.strategy(), BackoffStrategy::default());
        assert!(!config.circuit_breaker.enabled);
        assert_eq!(config.limits.max_payload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_minimal_toml() {
        let config: SenderConfig = toml::from_str("").unwrap();
        assert_eq!(config.delivery.max_retries, 3);
    }

    #[test]
    fn test_partial_toml() {
        let config: SenderConfig = toml::from_str(
            r#"
            [delivery]
            max_retries = 5

            [delivery.headers]
            Authorization = "Bearer abc"

            [backoff]
            kind = "fixed"
            interval_ms = 250

            [circuit_breaker]
            enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(config.delivery.max_retries, 5);
        assert_eq!(config.delivery.timeout_secs, 10);
        assert_eq!(config.delivery.headers["Authorization"], "Bearer abc");
        assert_eq!(
            config.backoff.strategy(),
            BackoffStrategy::fixed(Duration::from_millis(250))
        );
        assert!(config.circuit_breaker.enabled);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
    }

    #[test]
    fn test_linear_strategy() {
        let config = BackoffConfig {
            kind: BackoffKind::Linear,
            interval_ms: 500,
            max_interval_ms: 2000,
            ..Default::default()
        };
        assert_eq!(
            config.strategy(),
            BackoffStrategy::linear(Duration::from_millis(500), Duration::from_secs(2))
        );
    }

    #[test]
    fn test_resolve_secret_from_env() {
        std::env::set_var("WEBHOOK_SENDER_TEST_SECRET", "hunter2");
        let signing = SigningConfig {
            secret_env: Some("WEBHOOK_SENDER_TEST_SECRET".into()),
            ..Default::default()
        };
        assert_eq!(signing.resolve_secret().unwrap().as_deref(), Some("hunter2"));
        assert_eq!(SigningConfig::default().resolve_secret(), Ok(None));
    }

    #[test]
    fn test_unset_secret_env_is_an_error() {
        let unset = SigningConfig {
            secret_env: Some("WEBHOOK_SENDER_TEST_SECRET_UNSET".into()),
            ..Default::default()
        };
        assert_eq!(
            unset.resolve_secret(),
            Err(SignatureError::SecretEnvUnset(
                "WEBHOOK_SENDER_TEST_SECRET_UNSET".into()
            ))
        );

        std::env::set_var("WEBHOOK_SENDER_TEST_SECRET_EMPTY", "");
        let empty = SigningConfig {
            secret_env: Some("WEBHOOK_SENDER_TEST_SECRET_EMPTY".into()),
            ..Default::default()
        };
        assert!(empty.resolve_secret().is_err());
    }

    #[test]
    fn test_verification_max_age() {
        let signing = SigningConfig {
            max_age_secs: 60,
            ..Default::default()
        };
        assert_eq!(signing.verification_max_age(None), Duration::from_secs(60));
        assert_eq!(signing.verification_max_age(Some(0)), Duration::ZERO);
        assert_eq!(
            SigningConfig::default().verification_max_age(None),
            Duration::from_secs(300)
        );
    }
}
