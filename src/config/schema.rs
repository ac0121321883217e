//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Named backend sections, each exposing a host/port pair.
    pub backends: BTreeMap<String, BackendConfig>,

    /// RPC dispatch table and struct declarations.
    pub rpc: RpcConfig,

    /// Reverse-proxy retry policy and proxied services.
    pub proxy: ProxyConfig,

    /// Authorization gate settings.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// A backend section: where a named protocol or service lives.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    ///
    /// Must cover the proxy retry budget and every protocol's connect plus
    /// call deadline.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 180 }
    }
}

/// RPC dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RpcConfig {
    /// Known protocol families. Anything not listed here is unsupported.
    pub protocols: Vec<ProtocolConfig>,

    /// Struct types recognised by the argument marshaller.
    pub structs: Vec<StructConfig>,
}

/// One entry of the RPC dispatch table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProtocolConfig {
    /// Protocol name as it appears in `/api/{name}/...`.
    pub name: String,

    /// Backend section to resolve. Defaults to `name`.
    #[serde(default)]
    pub backend: Option<String>,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_rpc_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Whole-call timeout in milliseconds.
    #[serde(default = "default_rpc_call_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl ProtocolConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backend: None,
            connect_timeout_ms: default_rpc_connect_timeout_ms(),
            call_timeout_ms: default_rpc_call_timeout_ms(),
        }
    }

    /// The backend section this protocol resolves against.
    pub fn backend_name(&self) -> &str {
        self.backend.as_deref().unwrap_or(&self.name)
    }
}

fn default_rpc_connect_timeout_ms() -> u64 {
    3_000
}

fn default_rpc_call_timeout_ms() -> u64 {
    30_000
}

/// A struct type declared in configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StructConfig {
    pub name: String,

    /// Declared field names. Empty means any field set is accepted.
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Reverse-proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Number of retries after the first attempt.
    pub max_retries: u32,

    /// Base factor for exponential backoff, in seconds.
    pub backoff_base_secs: f64,

    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds.
    pub read_timeout_ms: u64,

    /// Maximum idle pooled connections per host.
    pub pool_max_idle_per_host: usize,

    /// Internal HTTP services reachable through `/api/{name}/...`.
    pub services: Vec<ProxyServiceConfig>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            backoff_base_secs: 0.1,
            connect_timeout_ms: 500,
            read_timeout_ms: 30_000,
            pool_max_idle_per_host: 32,
            services: Vec::new(),
        }
    }
}

/// A reverse-proxied internal HTTP service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyServiceConfig {
    /// Service name as it appears in `/api/{name}/...`.
    pub name: String,

    /// Backend section to resolve. Defaults to `name`.
    #[serde(default)]
    pub backend: Option<String>,

    /// Use https when talking to the backend.
    #[serde(default)]
    pub tls: bool,

    /// Payload rewrite applied before forwarding.
    #[serde(default)]
    pub rewrite: PayloadRewrite,
}

impl ProxyServiceConfig {
    pub fn new(name: impl Into<String>, rewrite: PayloadRewrite) -> Self {
        Self {
            name: name.into(),
            backend: None,
            tls: false,
            rewrite,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.as_deref().unwrap_or(&self.name)
    }
}

/// Service-specific payload rewriting.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayloadRewrite {
    #[default]
    None,
    /// Append an expiry to signed-URL queries.
    ObjectStorage,
    /// Inject caller IP, timestamp and idempotency token.
    AuditLog,
}

/// Authorization gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// When false every request is allowed.
    pub enabled: bool,

    /// Exact paths exempt from verification for GET.
    pub get_whitelist: Vec<String>,

    /// Exact paths exempt from verification for POST.
    pub post_whitelist: Vec<String>,

    /// Cookie carrying the session token.
    pub session_cookie: String,

    /// Backend section of the session verification service.
    pub verify_backend: String,

    /// Path on the verification service.
    pub verify_path: String,

    /// Verification call timeout in milliseconds.
    pub verify_timeout_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            get_whitelist: vec![
                "/".to_string(),
                "/api/admin/server_address".to_string(),
            ],
            post_whitelist: vec![
                "/api/admin/get_vcode".to_string(),
                "/api/admin/check_vcode".to_string(),
                "/api/admin/get_config".to_string(),
                "/api/admin/get_password_config".to_string(),
            ],
            session_cookie: "session".to_string(),
            verify_backend: "session".to_string(),
            verify_path: "/session/verify".to_string(),
            verify_timeout_ms: 2_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}
