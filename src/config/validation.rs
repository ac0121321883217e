//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (protocols and services reference existing backends)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Detect name collisions between protocols, services and struct types
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::resilience::retries::RetryPolicy;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("backend '{0}' has port 0")]
    InvalidPort(String),

    #[error("backend '{0}' has an empty host")]
    EmptyHost(String),

    #[error("{kind} '{name}' references unknown backend '{backend}'")]
    UnknownBackend {
        kind: &'static str,
        name: String,
        backend: String,
    },

    #[error("duplicate {kind} name '{name}'")]
    Duplicate { kind: &'static str, name: String },

    #[error("'{0}' is both an RPC protocol and a proxied service")]
    AmbiguousTarget(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("timeouts.request_secs ({request_secs}s) is shorter than the {source_name} budget of {required_ms}ms")]
    RequestTimeoutTooShort {
        request_secs: u64,
        source_name: String,
        required_ms: u64,
    },

    #[error("whitelisted path '{0}' must start with '/'")]
    InvalidWhitelistPath(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (name, backend) in &config.backends {
        if backend.port == 0 {
            errors.push(ValidationError::InvalidPort(name.clone()));
        }
        if backend.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost(name.clone()));
        }
    }

    let mut protocols = HashSet::new();
    for protocol in &config.rpc.protocols {
        if !protocols.insert(protocol.name.as_str()) {
            errors.push(ValidationError::Duplicate {
                kind: "protocol",
                name: protocol.name.clone(),
            });
        }
        if !config.backends.contains_key(protocol.backend_name()) {
            errors.push(ValidationError::UnknownBackend {
                kind: "protocol",
                name: protocol.name.clone(),
                backend: protocol.backend_name().to_string(),
            });
        }
        if protocol.call_timeout_ms == 0 {
            errors.push(ValidationError::ZeroValue("rpc.protocols.call_timeout_ms"));
        }
    }

    let mut services = HashSet::new();
    for service in &config.proxy.services {
        if !services.insert(service.name.as_str()) {
            errors.push(ValidationError::Duplicate {
                kind: "proxy service",
                name: service.name.clone(),
            });
        }
        if protocols.contains(service.name.as_str()) {
            errors.push(ValidationError::AmbiguousTarget(service.name.clone()));
        }
        if !config.backends.contains_key(service.backend_name()) {
            errors.push(ValidationError::UnknownBackend {
                kind: "proxy service",
                name: service.name.clone(),
                backend: service.backend_name().to_string(),
            });
        }
    }

    let mut structs = HashSet::new();
    for decl in &config.rpc.structs {
        if !structs.insert(decl.name.as_str()) {
            errors.push(ValidationError::Duplicate {
                kind: "struct",
                name: decl.name.clone(),
            });
        }
    }

    if config.proxy.read_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("proxy.read_timeout_ms"));
    }
    if config.proxy.connect_timeout_ms == 0 {
        errors.push(ValidationError::ZeroValue("proxy.connect_timeout_ms"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }

    let request_ms = config.timeouts.request_secs.saturating_mul(1000);
    let proxy_ms = RetryPolicy::from(&config.proxy).worst_case_duration().as_millis() as u64;
    if !config.proxy.services.is_empty() && request_ms < proxy_ms {
        errors.push(ValidationError::RequestTimeoutTooShort {
            request_secs: config.timeouts.request_secs,
            source_name: "proxy retry".to_string(),
            required_ms: proxy_ms,
        });
    }
    for protocol in &config.rpc.protocols {
        let rpc_ms = protocol.connect_timeout_ms.saturating_add(protocol.call_timeout_ms);
        if request_ms < rpc_ms {
            errors.push(ValidationError::RequestTimeoutTooShort {
                request_secs: config.timeouts.request_secs,
                source_name: format!("protocol '{}'", protocol.name),
                required_ms: rpc_ms,
            });
        }
    }

    for path in config.auth.get_whitelist.iter().chain(&config.auth.post_whitelist) {
        if !path.starts_with('/') {
            errors.push(ValidationError::InvalidWhitelistPath(path.clone()));
        }
    }

    if config.auth.enabled && !config.backends.contains_key(&config.auth.verify_backend) {
        errors.push(ValidationError::UnknownBackend {
            kind: "auth verifier",
            name: config.auth.verify_path.clone(),
            backend: config.auth.verify_backend.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
