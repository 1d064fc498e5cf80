//! Circuit breaker for destination protection.
//!
//! # States
//! - Closed: normal operation, deliveries pass through
//! - Open: destination assumed down, deliveries fail fast
//! - Half-Open: trial deliveries probe whether it recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_threshold consecutive failures
//! Open → Half-Open: recovery_timeout elapsed since last failure (lazy, on allow())
//! Half-Open → Closed: success_threshold consecutive successes
//! Half-Open → Open: any failure (recovery clock restarts)
//! ```
//!
//! # Design Decisions
//! - One breaker per destination, shared via `Arc` across concurrent sends
//! - No background timer; the Open → Half-Open check is a pure function of
//!   `now - last_failure`, so an injected [`Clock`] makes it deterministic
//! - `state()` and `stats()` never mutate; only `allow()` performs the lazy
//!   transition

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::observability::metrics;
use crate::resilience::clock::{Clock, SystemClock};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_SUCCESS_THRESHOLD: u32 = 2;
pub const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Current state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time snapshot of a breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitStats {
    pub state: CircuitState,
    /// Consecutive failures.
    pub failures: u32,
    /// Consecutive successes while half-open.
    pub successes: u32,
    pub last_failure: Option<Instant>,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    failures: u32,
    successes: u32,
    last_failure: Option<Instant>,
}

/// Closed/Open/Half-Open state machine for a single destination.
#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    success_threshold: u32,
    recovery_timeout: Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a breaker. Zero thresholds or timeout fall back to 5 / 2 / 30s.
    pub fn new(failure_threshold: u32, success_threshold: u32, recovery_timeout: Duration) -> Self {
        Self::with_clock(
            failure_threshold,
            success_threshold,
            recovery_timeout,
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        failure_threshold: u32,
        success_threshold: u32,
        recovery_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            failure_threshold: if failure_threshold == 0 {
                DEFAULT_FAILURE_THRESHOLD
            } else {
                failure_threshold
            },
            success_threshold: if success_threshold == 0 {
                DEFAULT_SUCCESS_THRESHOLD
            } else {
                success_threshold
            },
            recovery_timeout: if recovery_timeout.is_zero() {
                DEFAULT_RECOVERY_TIMEOUT
            } else {
                recovery_timeout
            },
            clock,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                last_failure: None,
            }),
        }
    }

    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold
    }

    pub fn success_threshold(&self) -> u32 {
        self.success_threshold
    }

    pub fn recovery_timeout(&self) -> Duration {
        self.recovery_timeout
    }

    /// Whether a delivery may proceed.
    ///
    /// An open circuit whose recovery timeout has elapsed moves to
    /// half-open here and admits the caller.
    pub fn allow(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if self.recovery_elapsed(&inner) {
                    inner.state = CircuitState::HalfOpen;
                    inner.successes = 0;
                    tracing::info!("Circuit breaker transitioning to half-open");
                    metrics::record_circuit_transition(CircuitState::HalfOpen);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                inner.failures = 0;
            }
            CircuitState::HalfOpen => {
                inner.successes += 1;
                if inner.successes >= self.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failures = 0;
                    inner.successes = 0;
                    tracing::info!("Circuit breaker closing, destination recovered");
                    metrics::record_circuit_transition(CircuitState::Closed);
                }
            }
            // A late result from a delivery admitted before the circuit opened.
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        let now = self.clock.now();
        inner.last_failure = Some(now);

        match inner.state {
            CircuitState::Closed => {
                inner.failures += 1;
                if inner.failures >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    tracing::warn!(
                        failures = inner.failures,
                        recovery_timeout_ms =
                            u64::try_from(self.recovery_timeout.as_millis()).unwrap_or(u64::MAX),
                        "Circuit breaker opening"
                    );
                    metrics::record_circuit_transition(CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.failures = self.failure_threshold;
                inner.successes = 0;
                tracing::warn!("Trial delivery failed, circuit breaker re-opening");
                metrics::record_circuit_transition(CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    /// Current state, including a pending Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        let inner = self.lock();
        self.observed_state(&inner)
    }

    pub fn stats(&self) -> CircuitStats {
        let inner = self.lock();
        let state = self.observed_state(&inner);
        let successes = if state == CircuitState::HalfOpen && inner.state == CircuitState::Open {
            0
        } else {
            inner.successes
        };
        CircuitStats {
            state,
            failures: inner.failures,
            successes,
            last_failure: inner.last_failure,
        }
    }

    /// Force the breaker back to closed with cleared counters.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.successes = 0;
        inner.last_failure = None;
    }

    fn observed_state(&self, inner: &Inner) -> CircuitState {
        if inner.state == CircuitState::Open && self.recovery_elapsed(inner) {
            CircuitState::HalfOpen
        } else {
            inner.state
        }
    }

    fn recovery_elapsed(&self, inner: &Inner) -> bool {
        match inner.last_failure {
            Some(at) => self.clock.now().saturating_duration_since(at) > self.recovery_timeout,
            None => true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(
            DEFAULT_FAILURE_THRESHOLD,
            DEFAULT_SUCCESS_THRESHOLD,
            DEFAULT_RECOVERY_TIMEOUT,
        )
    }
}
