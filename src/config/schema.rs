//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServeConfig {
    /// Listener configuration (bind address, TLS, redirect).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Startup and shutdown behaviour.
    pub lifecycle: LifecycleConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080", ":443", "*:443").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Also listen for plaintext HTTP and redirect it to the primary address.
    pub redirect: bool,

    /// Redirect listener address; defaults to the primary host on port 80.
    pub redirect_address: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            redirect: false,
            redirect_address: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeouts for serving requests. Zero means "use the default".
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time allowed for reading a request body, in seconds.
    pub read_secs: u64,

    /// Time allowed for producing a response, in seconds.
    pub write_secs: u64,

    /// How long shutdown waits for in-flight requests, in seconds.
    pub drain_secs: u64,
}

pub const DEFAULT_READ_SECS: u64 = 60;
pub const DEFAULT_WRITE_SECS: u64 = 60;
pub const DEFAULT_DRAIN_SECS: u64 = 30;

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: DEFAULT_READ_SECS,
            write_secs: DEFAULT_WRITE_SECS,
            drain_secs: DEFAULT_DRAIN_SECS,
        }
    }
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_secs(or_default(self.read_secs, DEFAULT_READ_SECS))
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(or_default(self.write_secs, DEFAULT_WRITE_SECS))
    }

    pub fn drain(&self) -> Duration {
        Duration::from_secs(or_default(self.drain_secs, DEFAULT_DRAIN_SECS))
    }
}

fn or_default(value: u64, default: u64) -> u64 {
    if value == 0 {
        default
    } else {
        value
    }
}

/// How the client key for rate limiting is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Socket peer address.
    #[default]
    PeerIp,
    /// Proxy headers first, then the socket peer address.
    RealIp,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per period for paths without a route override.
    pub limit: u32,

    /// Window length in seconds.
    pub period_secs: u64,

    /// Body of 429 responses; empty means the built-in message.
    pub message: String,

    /// Client key derivation.
    pub key: KeyStrategy,

    /// Per path-prefix overrides.
    pub routes: Vec<RouteLimitConfig>,

    /// How often idle client logs are purged, in seconds.
    pub purge_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: 60,
            period_secs: 60,
            message: String::new(),
            key: KeyStrategy::default(),
            routes: Vec::new(),
            purge_interval_secs: 300,
        }
    }
}

/// Policy override for requests whose path starts with `path_prefix`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteLimitConfig {
    pub path_prefix: String,
    pub limit: u32,
    pub period_secs: u64,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Shut down automatically this many seconds after becoming ready.
    pub test_mode_secs: Option<u64>,
}
