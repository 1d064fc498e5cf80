//! Backoff strategies for retry scheduling.
//!
//! # Responsibilities
//! - Map a retry number (1-based) to a wait duration
//! - Fixed, linear and exponential-with-jitter variants
//!
//! # Design Decisions
//! - Closed enum, no trait objects; every variant is `Copy`
//! - Attempt 0 is the initial delivery and never waits
//! - Jitter is a symmetric multiplier so retry storms spread evenly
//! - `jitter_factor = 0.0` is fully deterministic (used by tests)

use std::time::Duration;

use rand::Rng;

/// Waits the same interval before every retry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedBackoff {
    pub interval: Duration,
}

impl FixedBackoff {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn next_interval(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.interval
    }
}

/// Grows the wait by `interval` per retry, capped at `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearBackoff {
    pub interval: Duration,
    pub max_interval: Duration,
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
        }
    }
}

impl LinearBackoff {
    pub fn new(interval: Duration, max_interval: Duration) -> Self {
        Self {
            interval,
            max_interval,
        }
    }

    pub fn next_interval(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.interval.saturating_mul(attempt).min(self.max_interval)
    }
}

/// Exponential growth with optional symmetric jitter.
///
/// `initial * multiplier^(attempt - 1) * (1 + U(-jitter, +jitter))`, capped at
/// `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Fraction of the computed delay to randomize, in `[0.0, 1.0]`.
    pub jitter_factor: f64,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

impl ExponentialBackoff {
    pub fn new(initial_interval: Duration, max_interval: Duration, multiplier: f64) -> Self {
        Self {
            initial_interval,
            max_interval,
            multiplier,
            jitter_factor: 0.0,
        }
    }

    /// Set the jitter factor, clamped to `[0.0, 1.0]`.
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = sanitize_jitter(jitter_factor);
        self
    }

    pub fn next_interval(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let mut secs = self.initial_interval.as_secs_f64() * self.multiplier.powi(exponent);

        // The field is public, so `with_jitter`'s clamp may have been bypassed.
        let jitter_factor = sanitize_jitter(self.jitter_factor);
        if jitter_factor > 0.0 {
            let jitter = rand::thread_rng().gen_range(-jitter_factor..=jitter_factor);
            secs *= 1.0 + jitter;
        }

        // Overflowed or NaN products land on the cap rather than panicking
        // inside Duration::from_secs_f64.
        let max_secs = self.max_interval.as_secs_f64();
        if !secs.is_finite() || secs >= max_secs {
            return self.max_interval;
        }
        if secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Clamp to `[0.0, 1.0]`; NaN and infinities disable jitter.
fn sanitize_jitter(jitter_factor: f64) -> f64 {
    if jitter_factor.is_finite() {
        jitter_factor.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// The backoff applied between delivery attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    Fixed(FixedBackoff),
    Linear(LinearBackoff),
    Exponential(ExponentialBackoff),
}

impl BackoffStrategy {
    /// Wait before retry number `attempt`. Zero for `attempt == 0`.
    pub fn next_interval(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(b) => b.next_interval(attempt),
            Self::Linear(b) => b.next_interval(attempt),
            Self::Exponential(b) => b.next_interval(attempt),
        }
    }

    pub fn fixed(interval: Duration) -> Self {
        Self::Fixed(FixedBackoff::new(interval))
    }

    pub fn linear(interval: Duration, max_interval: Duration) -> Self {
        Self::Linear(LinearBackoff::new(interval, max_interval))
    }

    pub fn exponential(initial: Duration, max: Duration, multiplier: f64, jitter_factor: f64) -> Self {
        Self::Exponential(ExponentialBackoff::new(initial, max, multiplier).with_jitter(jitter_factor))
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fixed(_) => "fixed",
            Self::Linear(_) => "linear",
            Self::Exponential(_) => "exponential",
        }
    }
}

/// Exponential backoff with 10% jitter.
impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential(ExponentialBackoff::default().with_jitter(0.1))
    }
}

impl From<FixedBackoff> for BackoffStrategy {
    fn from(b: FixedBackoff) -> Self {
        Self::Fixed(b)
    }
}

impl From<LinearBackoff> for BackoffStrategy {
    fn from(b: LinearBackoff) -> Self {
        Self::Linear(b)
    }
}

impl From<ExponentialBackoff> for BackoffStrategy {
    fn from(b: ExponentialBackoff) -> Self {
        Self::Exponential(b)
    }
}
