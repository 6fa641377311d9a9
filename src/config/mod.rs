//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServeConfig (validated, immutable)
//!     → handed to LifecycleManager and AdmissionGate
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal (or absent) config files
//! - Validation separates syntactic (serde) from semantic checks
//! - Command-line flags override file values in the binary

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    KeyStrategy, LifecycleConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RateLimitConfig, RouteLimitConfig, ServeConfig, TimeoutConfig, TlsConfig,
};
