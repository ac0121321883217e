//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the struct registry and dispatch table from the initial config
//! - Create the pooled proxy transport
//! - Choose the session verifier
//! - Assemble the shared [`AppState`]
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The registry and dispatch table are fixed for the life of the process

use std::sync::Arc;
use thiserror::Error;

use crate::config::{self, GatewayConfig};
use crate::http::AppState;
use crate::proxy::{ProxyServices, RetryingTransport, TransportError};
use crate::resilience::retries::RetryPolicy;
use crate::routing::Router;
use crate::rpc::{
    BackendResolver, DispatchTable, MarshalError, Marshaller, ProtocolDispatcher, RpcConnector,
    StructRegistry, TcpConnector,
};
use crate::security::access_control::{
    AllowAll, AuthGate, RemoteSessionVerifier, SessionVerifier, Whitelist,
};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid struct registry: {0}")]
    Registry(#[from] MarshalError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Assembles the gateway from a validated configuration.
///
/// The RPC connector and session verifier default to TCP framing and the
/// configured auth mode; both can be replaced.
pub struct GatewayBuilder {
    config: GatewayConfig,
    registry: Option<StructRegistry>,
    connector: Option<Arc<dyn RpcConnector>>,
    verifier: Option<Arc<dyn SessionVerifier>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            registry: None,
            connector: None,
            verifier: None,
        }
    }

    /// Use `registry` instead of the one declared in `[[rpc.structs]]`.
    pub fn registry(mut self, registry: StructRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn RpcConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn verifier(mut self, verifier: Arc<dyn SessionVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn build(self) -> Result<AppState, StartupError> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => StructRegistry::from_config(&self.config.rpc.structs)?,
        };
        let table = DispatchTable::from_config(&self.config.rpc.protocols);
        let services = ProxyServices::from_config(&self.config.proxy.services);
        let policy = RetryPolicy::from(&self.config.proxy);
        let transport = RetryingTransport::new(policy, self.config.proxy.pool_max_idle_per_host)?;
        let whitelist = Whitelist::from_config(&self.config.auth);

        tracing::info!(
            protocols = table.len(),
            structs = registry.len(),
            proxy_services = self.config.proxy.services.len(),
            auth_enabled = self.config.auth.enabled,
            "Gateway components initialized"
        );

        let shared = config::shared(self.config);
        let resolver = BackendResolver::new(shared.clone());

        let verifier = match self.verifier {
            Some(verifier) => verifier,
            None => default_verifier(&shared, &transport, &resolver),
        };
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(TcpConnector) as Arc<dyn RpcConnector>);

        Ok(AppState {
            router: Arc::new(Router::new(Arc::new(services))),
            marshaller: Arc::new(Marshaller::new(Arc::new(registry))),
            dispatcher: ProtocolDispatcher::new(table, resolver.clone(), connector),
            transport,
            resolver,
            auth: AuthGate::new(whitelist, verifier),
            config: shared,
        })
    }
}

fn default_verifier(
    config: &config::SharedConfig,
    transport: &RetryingTransport,
    resolver: &BackendResolver,
) -> Arc<dyn SessionVerifier> {
    let snapshot = config.load();
    if snapshot.auth.enabled {
        Arc::new(RemoteSessionVerifier::new(
            transport.client().clone(),
            resolver.clone(),
            &snapshot.auth,
        ))
    } else {
        tracing::warn!("Authentication disabled; every request is admitted");
        Arc::new(AllowAll)
    }
}
