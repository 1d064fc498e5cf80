//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SenderConfig (validated, immutable)
//!     → Sender::from_config (client, default options, breaker registry)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets are referenced by environment variable name, never inlined

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BackoffConfig, BackoffKind, CircuitBreakerConfig, DeliveryConfig, LimitsConfig, LogFormat,
    ObservabilityConfig, SenderConfig, SigningConfig,
};
pub use validation::{validate_config, ValidationError};
