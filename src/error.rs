//! Error types for edgeguard.

use thiserror::Error;

use crate::config::loader::ConfigError;

/// Main error type for edgeguard operations.
///
/// Rejections by the admission gate are not errors; they are reported through
/// [`GrantResult`](crate::security::window::GrantResult).
#[derive(Error, Debug)]
pub enum Error {
    /// A listening socket could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The graceful shutdown of the primary server reported an error.
    #[error("graceful shutdown failed: {0}")]
    Shutdown(#[source] std::io::Error),

    /// TLS certificate or key could not be loaded.
    #[error("TLS setup failed: {0}")]
    Tls(#[source] std::io::Error),

    /// A rate limit policy with a zero limit or zero period.
    #[error("invalid rate limit policy: limit={limit}, period={period_ms}ms")]
    InvalidPolicy { limit: u32, period_ms: u128 },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type alias for edgeguard operations.
pub type Result<T> = std::result::Result<T, Error>;
