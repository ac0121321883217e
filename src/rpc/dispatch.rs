//! Protocol client dispatch.
//!
//! The dispatch table is fixed at startup from `[[rpc.protocols]]`. Each
//! invocation resolves the protocol's backend against the live configuration,
//! opens a fresh channel, performs one call and drops the channel.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ProtocolConfig;
use crate::observability::metrics;
use crate::rpc::channel::{ChannelTimeouts, RpcConnector};
use crate::rpc::error::RpcError;
use crate::rpc::marshal::CallArgument;
use crate::rpc::resolver::BackendResolver;

/// One known protocol family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolEntry {
    pub name: String,
    pub backend: String,
    pub timeouts: ChannelTimeouts,
}

impl From<&ProtocolConfig> for ProtocolEntry {
    fn from(config: &ProtocolConfig) -> Self {
        Self {
            name: config.name.clone(),
            backend: config.backend_name().to_string(),
            timeouts: ChannelTimeouts {
                connect: Duration::from_millis(config.connect_timeout_ms),
                call: Duration::from_millis(config.call_timeout_ms),
            },
        }
    }
}

/// Immutable protocol name → entry table.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    entries: HashMap<String, ProtocolEntry>,
}

impl DispatchTable {
    pub fn from_config(protocols: &[ProtocolConfig]) -> Self {
        let entries = protocols
            .iter()
            .map(|p| (p.name.clone(), ProtocolEntry::from(p)))
            .collect();
        Self { entries }
    }

    pub fn get(&self, protocol: &str) -> Option<&ProtocolEntry> {
        self.entries.get(protocol)
    }

    pub fn contains(&self, protocol: &str) -> bool {
        self.entries.contains_key(protocol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Invokes methods on RPC backends.
#[derive(Clone)]
pub struct ProtocolDispatcher {
    table: Arc<DispatchTable>,
    resolver: BackendResolver,
    connector: Arc<dyn RpcConnector>,
}

impl ProtocolDispatcher {
    pub fn new(
        table: DispatchTable,
        resolver: BackendResolver,
        connector: Arc<dyn RpcConnector>,
    ) -> Self {
        Self {
            table: Arc::new(table),
            resolver,
            connector,
        }
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Invoke `method` on the backend serving `protocol`.
    pub async fn invoke(
        &self,
        protocol: &str,
        method: &str,
        args: &[CallArgument],
    ) -> Result<Value, RpcError> {
        let entry = self
            .table
            .get(protocol)
            .ok_or_else(|| RpcError::UnsupportedProtocol(protocol.to_string()))?;

        let start = Instant::now();
        let result = self.invoke_entry(entry, method, args).await;
        metrics::record_rpc_call(protocol, result_label(&result), start);
        result
    }

    async fn invoke_entry(
        &self,
        entry: &ProtocolEntry,
        method: &str,
        args: &[CallArgument],
    ) -> Result<Value, RpcError> {
        let target = self.resolver.resolve(&entry.backend)?;

        tracing::debug!(
            protocol = %entry.name,
            method = %method,
            target = %target,
            args = args.len(),
            "Invoking RPC method"
        );

        let mut channel = self.connector.connect(&target, entry.timeouts).await?;
        channel.call(method, args).await
    }
}

fn result_label(result: &Result<Value, RpcError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(RpcError::Remote { .. }) => "remote_exception",
        Err(RpcError::Application(_)) => "application_error",
        Err(_) => "transport_error",
    }
}
