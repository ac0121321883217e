//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::{body::Body, http::Request, http::StatusCode, Router};
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use rpc_gateway::config::{BackendConfig, GatewayConfig};
use rpc_gateway::http::AppState;
use rpc_gateway::rpc::codec::{read_frame, write_frame};
use rpc_gateway::security::access_control::{RequestCredentials, SessionVerifier};
use rpc_gateway::{GatewayServer, Shutdown};

/// A request seen by a mock HTTP backend.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

pub type CaptureLog<T> = Arc<Mutex<Vec<T>>>;

/// Start an HTTP backend that records every request and answers via `respond`.
pub async fn start_http_backend<F>(respond: F) -> (SocketAddr, CaptureLog<Captured>)
where
    F: Fn(&Captured) -> (u16, String) + Send + Sync + 'static,
{
    let log: CaptureLog<Captured> = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let handler_log = log.clone();
    let app = Router::new().fallback(move |request: Request<Body>| {
        let log = handler_log.clone();
        let respond = respond.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
            let captured = Captured {
                method: parts.method.to_string(),
                path: parts.uri.path().to_string(),
                query: parts.uri.query().map(str::to_string),
                headers: parts
                    .headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                    .collect(),
                body: body.to_vec(),
            };
            let (status, reply) = respond(&captured);
            log.lock().unwrap().push(captured);
            (StatusCode::from_u16(status).unwrap(), reply)
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, log)
}

/// Start an RPC backend speaking length-prefixed JSON frames.
///
/// `respond` receives each decoded call frame and returns the reply body
/// without `seq` (e.g. `{"result": ...}`); the sequence number is copied over.
pub async fn start_rpc_backend<F>(respond: F) -> (SocketAddr, CaptureLog<Value>)
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    let log: CaptureLog<Value> = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let accept_log = log.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let log = accept_log.clone();
            let respond = respond.clone();
            tokio::spawn(async move {
                while let Ok(frame) = read_frame(&mut socket).await {
                    let call: Value = serde_json::from_slice(&frame).unwrap();
                    let mut reply = match respond(&call) {
                        Value::Object(map) => map,
                        other => panic!("reply must be an object, got {}", other),
                    };
                    reply.insert("seq".into(), call["seq"].clone());
                    log.lock().unwrap().push(call);

                    let bytes = serde_json::to_vec(&Value::Object(reply)).unwrap();
                    if write_frame(&mut socket, &bytes).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
    (addr, log)
}

/// A port nothing listens on.
pub fn dead_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn backend(addr: SocketAddr) -> BackendConfig {
    BackendConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
    }
}

/// Defaults tuned for fast tests.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.proxy.backoff_base_secs = 0.01;
    config.proxy.connect_timeout_ms = 200;
    config.proxy.read_timeout_ms = 2000;
    config
}

/// Serve `state` on an ephemeral port. Keep the returned `Shutdown` alive
/// for as long as the gateway should run.
pub async fn spawn_gateway(state: AppState) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    let (_, config_updates) = mpsc::unbounded_channel();

    let server = GatewayServer::new(state);
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, shutdown_rx).await;
    });
    (addr, shutdown)
}

/// Verifier answering `true` for the first `allowed` checks and `false` after.
pub struct ScriptedVerifier {
    allowed: usize,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn allow_first(allowed: usize) -> Arc<Self> {
        Arc::new(Self {
            allowed,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn deny_all() -> Arc<Self> {
        Self::allow_first(0)
    }

    pub fn allow_all() -> Arc<Self> {
        Self::allow_first(usize::MAX)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SessionVerifier for ScriptedVerifier {
    fn verify<'a>(&'a self, _request: &'a RequestCredentials) -> BoxFuture<'a, bool> {
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { previous < self.allowed })
    }
}

/// Reply body for an RPC exception.
pub fn exception(exception_type: &str, attrs: Value) -> Value {
    let mut exception = Map::new();
    exception.insert("type".into(), Value::String(exception_type.to_string()));
    exception.insert("attrs".into(), attrs);
    let mut reply = Map::new();
    reply.insert("exception".into(), Value::Object(exception));
    Value::Object(reply)
}
