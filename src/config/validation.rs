//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, jitter within [0, 1])
//! - Validate header names and values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SenderConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use reqwest::header::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::{BackoffKind, SenderConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &SenderConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.delivery.timeout_secs == 0 {
        errors.push(ValidationError::new("delivery.timeout_secs", "must be greater than 0"));
    }
    if HeaderValue::from_str(&config.delivery.user_agent).is_err() {
        errors.push(ValidationError::new(
            "delivery.user_agent",
            "is not a valid header value",
        ));
    }
    for (name, value) in &config.delivery.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("delivery.headers.{name}"),
                "is not a valid header name",
            ));
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(
                format!("delivery.headers.{name}"),
                "value is not a valid header value",
            ));
        }
    }

    let backoff = &config.backoff;
    match backoff.kind {
        BackoffKind::Fixed | BackoffKind::Linear => {
            if backoff.interval_ms == 0 {
                errors.push(ValidationError::new("backoff.interval_ms", "must be greater than 0"));
            }
        }
        BackoffKind::Exponential => {
            if backoff.initial_ms == 0 {
                errors.push(ValidationError::new("backoff.initial_ms", "must be greater than 0"));
            }
            if !backoff.multiplier.is_finite() || backoff.multiplier < 1.0 {
                errors.push(ValidationError::new("backoff.multiplier", "must be at least 1.0"));
            }
            if !(0.0..=1.0).contains(&backoff.jitter_factor) {
                errors.push(ValidationError::new(
                    "backoff.jitter_factor",
                    "must be between 0.0 and 1.0",
                ));
            }
        }
    }
    if backoff.kind != BackoffKind::Fixed && backoff.max_interval_ms == 0 {
        errors.push(ValidationError::new(
            "backoff.max_interval_ms",
            "must be greater than 0",
        ));
    }

    if config.circuit_breaker.enabled {
        let cb = &config.circuit_breaker;
        if cb.failure_threshold == 0 {
            errors.push(ValidationError::new(
                "circuit_breaker.failure_threshold",
                "must be greater than 0",
            ));
        }
        if cb.success_threshold == 0 {
            errors.push(ValidationError::new(
                "circuit_breaker.success_threshold",
                "must be greater than 0",
            ));
        }
        if cb.recovery_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "circuit_breaker.recovery_timeout_secs",
                "must be greater than 0",
            ));
        }
    }

    if let Some(var) = &config.signing.secret_env {
        if var.trim().is_empty() {
            errors.push(ValidationError::new("signing.secret_env", "must not be blank"));
        }
    }

    if config.limits.max_payload_bytes == 0 {
        errors.push(ValidationError::new("limits.max_payload_bytes", "must be greater than 0"));
    }

    if !matches!(
        config.observability.log_level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::new(
            "observability.log_level",
            "must be one of trace, debug, info, warn, error",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&SenderConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = SenderConfig::default();
        config.delivery.timeout_secs = 0;
        config.backoff.jitter_factor = 1.5;
        config.backoff.multiplier = 0.5;
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "delivery.timeout_secs",
                "backoff.multiplier",
                "backoff.jitter_factor",
                "observability.log_level",
            ]
        );
    }

    #[test]
    fn test_rejects_bad_headers() {
        let mut config = SenderConfig::default();
        config
            .delivery
            .headers
            .insert("Bad Header".into(), "ok".into());
        config
            .delivery
            .headers
            .insert("X-Good".into(), "line\nbreak".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("not a valid header name"));
    }

    #[test]
    fn test_breaker_thresholds_only_checked_when_enabled() {
        let mut config = SenderConfig::default();
        config.circuit_breaker.failure_threshold = 0;
        assert!(validate_config(&config).is_ok());

        config.circuit_breaker.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "circuit_breaker.failure_threshold");
    }
}
