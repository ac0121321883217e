//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create the Axum router with the auth gate in front of every route
//! - Wire up middleware (tracing, request ID, body limit, timeout)
//! - Dispatch RPC calls and forward proxied requests
//! - Apply configuration reloads to the live snapshot
//! - Record request metrics

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::Instrument;

use crate::config::{GatewayConfig, SharedConfig};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::{json_bytes, json_response, GatewayError};
use crate::observability::metrics;
use crate::proxy::augment::{self, CallerContext, ForwardRequest};
use crate::proxy::services::target_url;
use crate::proxy::RetryingTransport;
use crate::resilience::retries::RetryPolicy;
use crate::routing::{CallTarget, Route, Router as GatewayRouter};
use crate::rpc::{BackendResolver, Marshaller, ProtocolDispatcher};
use crate::security::access_control::{auth_gate_middleware, AuthGate};
use crate::security::headers::{client_ip, forwardable_headers};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<GatewayRouter>,
    pub marshaller: Arc<Marshaller>,
    pub dispatcher: ProtocolDispatcher,
    pub transport: RetryingTransport,
    pub resolver: BackendResolver,
    pub auth: AuthGate,
    pub config: SharedConfig,
}

/// HTTP front end of the gateway.
pub struct GatewayServer {
    router: Router,
    config: SharedConfig,
}

impl GatewayServer {
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        let router = build_router(state);
        Self { router, config }
    }

    /// The fully layered router, for driving requests without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Serve until `shutdown` fires.
    ///
    /// Each configuration received on `config_updates` replaces the live
    /// snapshot; backend addresses and the auth verifier's target pick it up
    /// on their next resolution.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let live = self.config.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!(
                    backends = new_config.backends.len(),
                    "Configuration reloaded; protocol table and struct registry unchanged"
                );
                live.store(Arc::new(new_config));
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let (request_timeout, body_limit) = {
        let config = state.config.load();
        (request_deadline(&config), config.security.max_body_size)
    };
    let gate = state.auth.clone();

    Router::new()
        .route("/", any(gateway_handler))
        .route("/{*path}", any(gateway_handler))
        .layer(middleware::from_fn_with_state(gate, auth_gate_middleware))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(propagate_request_id_layer())
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request_id(req.headers()),
                )
            }),
        )
        .layer(set_request_id_layer())
}

/// Whole-request deadline: the configured value, raised so it never cuts
/// short a proxy retry loop or an RPC connect plus call.
pub fn request_deadline(config: &GatewayConfig) -> Duration {
    let configured = Duration::from_secs(config.timeouts.request_secs);
    let proxy = RetryPolicy::from(&config.proxy).worst_case_duration();
    let rpc = config
        .rpc
        .protocols
        .iter()
        .map(|p| Duration::from_millis(p.connect_timeout_ms.saturating_add(p.call_timeout_ms)))
        .max()
        .unwrap_or_default();

    // One second of slack for body reads and response encoding.
    let required = proxy.max(rpc) + Duration::from_secs(1);
    if configured < required {
        tracing::warn!(
            configured_secs = config.timeouts.request_secs,
            required_ms = required.as_millis() as u64,
            "Request timeout raised to cover backend retries"
        );
    }
    configured.max(required)
}

/// Single entry point behind the auth gate.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let route = state.router.match_request(&method, &path);
    let (target, response) = match route {
        Route::Status => ("status".to_string(), status_response()),
        Route::Rpc(call) => {
            let label = call.protocol.clone();
            (label, handle_rpc(&state, call, request).await.into_response())
        }
        Route::Proxy { service, path } => {
            let response = handle_proxy(&state, &service, &path, request)
                .await
                .into_response();
            (service, response)
        }
        Route::NotFound => {
            tracing::warn!(method = %method, path = %path, "No route matched");
            ("none".to_string(), GatewayError::NotFound(path).into_response())
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), &target, start);
    response
}

fn status_response() -> Response {
    json_response(
        StatusCode::OK,
        &json!({
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "status": "running",
        }),
    )
}

async fn handle_rpc(
    state: &AppState,
    call: CallTarget,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    if !state.dispatcher.table().contains(&call.protocol) {
        tracing::warn!(protocol = %call.protocol, "Unsupported protocol");
        return Err(GatewayError::UnsupportedTarget(call.protocol));
    }

    let body = read_body(request.into_body()).await?;
    let args = state.marshaller.marshal_body(&body)?;
    let method = call.qualified_method();

    // Detached so a client disconnect does not abort the backend call.
    let dispatcher = state.dispatcher.clone();
    let (protocol, rpc_method) = (call.protocol.clone(), method.clone());
    let task = async move { dispatcher.invoke(&protocol, &rpc_method, &args).await };
    let outcome = tokio::spawn(task.in_current_span())
        .await
        .map_err(|e| GatewayError::Unknown(format!("RPC task failed: {}", e)))?;

    match outcome {
        Ok(result) => Ok(json_response(StatusCode::OK, &result)),
        Err(e) => {
            tracing::warn!(protocol = %call.protocol, method = %method, error = %e, "RPC call failed");
            Err(e.into())
        }
    }
}

async fn handle_proxy(
    state: &AppState,
    service: &str,
    path: &str,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let service = state
        .router
        .services()
        .get(service)
        .cloned()
        .ok_or_else(|| GatewayError::NotFound(path.to_string()))?;
    let target = state
        .resolver
        .resolve(service.backend_name())
        .map_err(|e| GatewayError::ProxyUnavailable(e.to_string()))?;

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();
    let body = read_body(body).await?;

    let url = target_url(&service, &target, path, parts.uri.query())
        .map_err(|e| GatewayError::ProxyUnavailable(e.to_string()))?;
    let mut forward = ForwardRequest {
        method: parts.method.clone(),
        url,
        headers: forwardable_headers(&parts.headers),
        body,
    };
    let caller = CallerContext {
        client_ip: client_ip(&parts.headers, peer),
        now: SystemTime::now(),
    };
    augment::apply(service.rewrite, &mut forward, &caller)?;

    tracing::debug!(service = %service.name, url = %forward.url, "Forwarding request");
    let transport = state.transport.clone();
    let task = async move {
        transport
            .send(forward.method, forward.url.as_str(), forward.headers, forward.body)
            .await
    };
    let response = tokio::spawn(task.in_current_span())
        .await
        .map_err(|e| GatewayError::Unknown(format!("proxy task failed: {}", e)))??;

    if response.status.is_success() {
        return Ok(json_bytes(response.status, response.body));
    }

    // A failing downstream call may mean the session lapsed mid-flight.
    // Whitelisted paths never needed a session.
    let exempt = state.auth.whitelist().is_exempt(&parts.method, parts.uri.path());
    if !exempt
        && !state
            .auth
            .verify(&parts.method, parts.uri.path(), &parts.headers)
            .await
    {
        tracing::info!(service = %service.name, status = %response.status, "Session no longer valid");
        return Err(GatewayError::AuthDenied);
    }

    Err(GatewayError::Downstream {
        status: response.status,
        body: response.body,
    })
}

async fn read_body(body: Body) -> Result<Bytes, GatewayError> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|e| GatewayError::Unknown(format!("failed to read request body: {}", e)))
}
