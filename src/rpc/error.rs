//! Error types for marshalling and RPC dispatch.

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while turning JSON into call arguments.
#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("unknown struct type '{0}'")]
    UnknownStructType(String),

    #[error("struct type '{0}' is already registered")]
    DuplicateStructType(String),

    #[error("struct '{type_name}' has no field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("fields of struct '{0}' must be a JSON object")]
    InvalidFields(String),

    #[error("request body must be a JSON array of call arguments")]
    InvalidBody,

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while dispatching a call to a backend.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The protocol has no entry in the dispatch table.
    #[error("protocol '{0}' is not implemented")]
    UnsupportedProtocol(String),

    /// No backend section with this name exists in the current configuration.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    #[error("failed to connect to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connect to {0} timed out")]
    ConnectTimeout(String),

    #[error("call to {target} timed out after {millis}ms")]
    CallTimeout { target: String, millis: u64 },

    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    #[error("malformed reply: {0}")]
    Codec(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A structured exception raised by the remote service.
    #[error("remote exception {exception_type}")]
    Remote {
        exception_type: String,
        attrs: Map<String, Value>,
    },

    /// A protocol-level failure reported by the remote side.
    #[error("{0}")]
    Application(String),
}
