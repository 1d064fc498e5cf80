//! Per-destination circuit breakers.
//!
//! Breakers are keyed by URL origin (`scheme://host:port`) so every path on
//! the same receiver shares failure history.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use url::Url;

use crate::config::CircuitBreakerConfig;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitStats};
use crate::resilience::clock::{Clock, SystemClock};

/// Lazily creates and hands out one shared breaker per destination.
#[derive(Debug)]
pub struct CircuitBreakerRegistry {
    failure_threshold: u32,
    success_threshold: u32,
    recovery_timeout: Duration,
    clock: Arc<dyn Clock>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            success_threshold: config.success_threshold,
            recovery_timeout: Duration::from_secs(config.recovery_timeout_secs),
            clock,
            breakers: DashMap::new(),
        }
    }

    /// The breaker for `url`'s origin, or `None` if the URL has no host.
    pub fn breaker_for(&self, url: &str) -> Option<Arc<CircuitBreaker>> {
        let key = origin_key(url)?;
        let breaker = self
            .breakers
            .entry(key)
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::with_clock(
                    self.failure_threshold,
                    self.success_threshold,
                    self.recovery_timeout,
                    self.clock.clone(),
                ))
            })
            .clone();
        Some(breaker)
    }

    /// Snapshot of every known destination.
    pub fn snapshot(&self) -> Vec<(String, CircuitStats)> {
        let mut out: Vec<_> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stats()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

fn origin_key(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some(format!("{}://{}:{}", url.scheme(), host.to_ascii_lowercase(), port))
}
