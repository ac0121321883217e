//! Backend target resolution.
//!
//! Names are resolved against the live configuration snapshot on every call,
//! so a reloaded `[backends.*]` section takes effect on the next request.

use std::fmt;

use crate::config::SharedConfig;
use crate::rpc::error::RpcError;

/// Where a named protocol or service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl BackendTarget {
    /// `host:port`, suitable for connecting or building a URL authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.host, self.port)
    }
}

/// Resolves backend names to host/port pairs.
#[derive(Clone)]
pub struct BackendResolver {
    config: SharedConfig,
}

impl BackendResolver {
    pub fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, name: &str) -> Result<BackendTarget, RpcError> {
        let config = self.config.load();
        let backend = config
            .backends
            .get(name)
            .ok_or_else(|| RpcError::UnknownBackend(name.to_string()))?;

        Ok(BackendTarget {
            name: name.to_string(),
            host: backend.host.clone(),
            port: backend.port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, BackendConfig, GatewayConfig};
    use std::sync::Arc;

    fn config_with(port: u16) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.backends.insert(
            "EVFS".into(),
            BackendConfig {
                host: "10.0.0.1".into(),
                port,
            },
        );
        config
    }

    #[test]
    fn test_resolve_known_backend() {
        let resolver = BackendResolver::new(config::shared(config_with(9000)));
        let target = resolver.resolve("EVFS").unwrap();
        assert_eq!(target.authority(), "10.0.0.1:9000");
    }

    #[test]
    fn test_resolve_unknown_backend() {
        let resolver = BackendResolver::new(config::shared(GatewayConfig::default()));
        let err = resolver.resolve("Nope").unwrap_err();
        assert!(matches!(err, RpcError::UnknownBackend(name) if name == "Nope"));
    }

    #[test]
    fn test_reload_takes_effect_on_next_call() {
        let shared = config::shared(config_with(9000));
        let resolver = BackendResolver::new(shared.clone());
        assert_eq!(resolver.resolve("EVFS").unwrap().port, 9000);

        shared.store(Arc::new(config_with(9100)));
        assert_eq!(resolver.resolve("EVFS").unwrap().port, 9100);
    }
}
