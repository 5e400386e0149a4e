//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, windows > 0, addresses parse)
//! - Catch policies that would reject every request
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: KernelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{KernelConfig, SecurityConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a whole kernel configuration.
pub fn validate_config(config: &KernelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be > 0"));
    }

    errors.extend(security_errors(&config.security));

    if config.modules.init_timeout_ms == 0 {
        errors.push(ValidationError::new("modules.init_timeout_ms", "must be > 0"));
    }
    if config.modules.destroy_timeout_ms == 0 {
        errors.push(ValidationError::new("modules.destroy_timeout_ms", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate only the admission policy, as done on hot reload.
pub fn validate_security(security: &SecurityConfig) -> Result<(), Vec<ValidationError>> {
    let errors = security_errors(security);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn security_errors(security: &SecurityConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if security.max_requests_per_minute == 0 {
        errors.push(ValidationError::new(
            "security.max_requests_per_minute",
            "must be > 0 (disable rate limiting instead)",
        ));
    }
    if security.rate_limit_window_secs == 0 {
        errors.push(ValidationError::new("security.rate_limit_window_secs", "must be > 0"));
    }
    if security.max_payload_bytes == 0 {
        errors.push(ValidationError::new("security.max_payload_bytes", "must be > 0"));
    }
    if security.csrf_ttl_ms == 0 {
        errors.push(ValidationError::new("security.csrf_ttl_ms", "must be > 0"));
    }
    if security.sweep_interval_secs == 0 {
        errors.push(ValidationError::new("security.sweep_interval_secs", "must be > 0"));
    }
    if security.enable_request_validation && security.allowed_content_types.is_empty() {
        errors.push(ValidationError::new(
            "security.allowed_content_types",
            "empty allow-list would reject every mutating request",
        ));
    }
    if security.api_keys.iter().any(|k| k.trim().is_empty()) {
        errors.push(ValidationError::new("security.api_keys", "keys must not be blank"));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&KernelConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = KernelConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.security.max_requests_per_minute = 0;
        config.security.csrf_ttl_ms = 0;
        config.security.allowed_content_types.clear();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "security.max_requests_per_minute",
                "security.csrf_ttl_ms",
                "security.allowed_content_types",
            ]
        );
    }

    #[test]
    fn test_module_deadlines_must_be_positive() {
        let mut config = KernelConfig::default();
        config.modules.init_timeout_ms = 0;
        config.modules.destroy_timeout_ms = 0;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["modules.init_timeout_ms", "modules.destroy_timeout_ms"]);
    }

    #[test]
    fn test_empty_allow_list_ok_when_validation_disabled() {
        let mut security = SecurityConfig::default();
        security.enable_request_validation = false;
        security.allowed_content_types.clear();
        assert!(validate_security(&security).is_ok());
    }
}
