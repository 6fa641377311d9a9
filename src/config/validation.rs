//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits and periods > 0)
//! - Check address and path shapes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServeConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::ServeConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
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

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &ServeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::new("listener.bind_address", "must not be empty"));
    }
    if let Some(addr) = &config.listener.redirect_address {
        if addr.trim().is_empty() {
            errors.push(ValidationError::new("listener.redirect_address", "must not be empty"));
        }
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::new("listener.tls", "cert_path and key_path are required"));
        }
    }

    let rl = &config.rate_limit;
    if rl.limit == 0 {
        errors.push(ValidationError::new("rate_limit.limit", "must be greater than 0"));
    }
    if rl.period_secs == 0 {
        errors.push(ValidationError::new("rate_limit.period_secs", "must be greater than 0"));
    }
    if rl.purge_interval_secs == 0 {
        errors.push(ValidationError::new("rate_limit.purge_interval_secs", "must be greater than 0"));
    }
    for (i, route) in rl.routes.iter().enumerate() {
        let field = |name: &str| format!("rate_limit.routes[{i}].{name}");
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::new(field("path_prefix"), "must start with '/'"));
        }
        if route.limit == 0 {
            errors.push(ValidationError::new(field("limit"), "must be greater than 0"));
        }
        if route.period_secs == 0 {
            errors.push(ValidationError::new(field("period_secs"), "must be greater than 0"));
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be an ip:port socket address",
        ));
    }

    if config.lifecycle.test_mode_secs == Some(0) {
        errors.push(ValidationError::new("lifecycle.test_mode_secs", "must be greater than 0"));
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
    use crate::config::schema::RouteLimitConfig;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ServeConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = ServeConfig::default();
        config.listener.bind_address = " ".into();
        config.rate_limit.routes.push(RouteLimitConfig {
            path_prefix: "api".into(),
            limit: 0,
            period_secs: 1,
        });
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "localhost".into();

        let fields: Vec<_> = validate_config(&config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "rate_limit.routes[0].path_prefix",
                "rate_limit.routes[0].limit",
                "observability.metrics_address",
            ]
        );
    }
}
