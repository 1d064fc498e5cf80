//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Sender and circuit breakers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → the on_delivery hook (per-attempt results, owned by the caller)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Metrics are cheap and exporter-agnostic
//! - Secrets and payload bodies never reach logs

pub mod logging;
pub mod metrics;
