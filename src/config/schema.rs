//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the kernel.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration for the platform kernel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KernelConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Admission gateway policy.
    pub security: SecurityConfig,

    /// Module lifecycle settings.
    pub modules: ModulesConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Admission gateway configuration.
///
/// Each switch maps to exactly one bypass: a disabled stage passes every
/// request through untouched and does no bookkeeping.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable per-client sliding window rate limiting.
    pub enable_rate_limiting: bool,

    /// Requests allowed per client inside one window.
    pub max_requests_per_minute: u32,

    /// Sliding window width in seconds.
    pub rate_limit_window_secs: u64,

    /// Enable Content-Type / Content-Length admission checks.
    pub enable_request_validation: bool,

    /// Enable CSRF token checks on state-changing methods.
    pub enable_csrf_protection: bool,

    /// Maximum accepted request body in bytes.
    pub max_payload_bytes: u64,

    /// CSRF token lifetime in milliseconds.
    pub csrf_ttl_ms: u64,

    /// Consume a CSRF token on its first successful verification.
    pub csrf_single_use: bool,

    /// Media types accepted on mutating requests.
    pub allowed_content_types: Vec<String>,

    /// Bearer credentials that stand in for a CSRF token.
    pub api_keys: Vec<String>,

    /// Inject security response headers.
    pub enable_headers: bool,

    /// Treat `X-Forwarded-Proto: https` as a secure transport.
    pub trust_forwarded_proto: bool,

    /// Interval between sweeps of expired limiter and token entries.
    pub sweep_interval_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_rate_limiting: true,
            max_requests_per_minute: 100,
            rate_limit_window_secs: 60,
            enable_request_validation: true,
            enable_csrf_protection: true,
            max_payload_bytes: 10 * 1024 * 1024, // 10 MiB
            csrf_ttl_ms: 60 * 60 * 1000,
            csrf_single_use: false,
            allowed_content_types: vec!["application/json".to_string()],
            api_keys: Vec::new(),
            enable_headers: true,
            trust_forwarded_proto: false,
            sweep_interval_secs: 60,
        }
    }
}

/// Module lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModulesConfig {
    /// Upper bound on a single module's `initialize()` in milliseconds.
    pub init_timeout_ms: u64,

    /// Upper bound on a single module's `destroy()` in milliseconds.
    pub destroy_timeout_ms: u64,

    /// Modules skipped at discovery, on top of the infrastructure deny-list.
    pub disabled: Vec<String>,

    /// Free-form per-module settings, keyed by module name.
    pub settings: BTreeMap<String, toml::Value>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: 10_000,
            destroy_timeout_ms: 5_000,
            disabled: Vec::new(),
            settings: BTreeMap::new(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
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
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_policy() {
        let config = KernelConfig::default();
        assert!(config.security.enable_rate_limiting);
        assert_eq!(config.security.max_requests_per_minute, 100);
        assert_eq!(config.security.rate_limit_window_secs, 60);
        assert_eq!(config.security.max_payload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.security.csrf_ttl_ms, 3_600_000);
        assert_eq!(config.security.allowed_content_types, vec!["application/json"]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: KernelConfig = toml::from_str(
            r#"
            [security]
            max_requests_per_minute = 5
            enable_csrf_protection = false

            [modules.settings.heartbeat]
            interval_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.security.max_requests_per_minute, 5);
        assert!(!config.security.enable_csrf_protection);
        assert!(config.security.enable_rate_limiting);
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert!(config.modules.settings.contains_key("heartbeat"));
    }
}
