//! Response rendering and error normalization.
//!
//! # Responsibilities
//! - Render call results as `application/json` with 200
//! - Collapse every failure into `{"error": {...}}`
//! - Map failure kinds to status codes
//!
//! # Status Codes
//! - Auth gate rejection: 403, empty body
//! - Any RPC-path failure: 501 with the error envelope
//! - Proxy downstream failure: downstream status, body passed through
//! - Proxy transport exhausted: 502 with the error envelope

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::proxy::augment::AugmentError;
use crate::proxy::transport::TransportError;
use crate::rpc::error::{MarshalError, RpcError};

/// Status used for every RPC-path failure.
pub const RPC_ERROR_STATUS: StatusCode = StatusCode::NOT_IMPLEMENTED;

/// Attribute of a domain exception holding its message.
const DOMAIN_MESSAGE_ATTR: &str = "expMsg";

/// Envelope key clients read the message from.
const ENVELOPE_MESSAGE_KEY: &str = "errMsg";

/// Every failure the gateway can render.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The session verifier rejected the request.
    #[error("access denied")]
    AuthDenied,

    /// No dispatch entry for the requested protocol.
    #[error("target '{0}' is not implemented")]
    UnsupportedTarget(String),

    /// Structured exception raised by a backend.
    #[error("domain exception: {}", domain_message(.attrs))]
    DomainRpc { attrs: Map<String, Value> },

    /// Protocol-level failure reported by a backend.
    #[error("{0}")]
    GenericRpc(String),

    /// Anything else raised while handling the call.
    #[error("{0}")]
    Unknown(String),

    /// Non-2xx from a proxied service, after the auth re-check passed.
    #[error("downstream returned {status}")]
    Downstream { status: StatusCode, body: Bytes },

    /// The proxied service could not be reached within the retry budget.
    #[error("{0}")]
    ProxyUnavailable(String),

    #[error("no route for {0}")]
    NotFound(String),
}

fn domain_message(attrs: &Map<String, Value>) -> String {
    match attrs.get(DOMAIN_MESSAGE_ATTR) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::AuthDenied => StatusCode::FORBIDDEN,
            GatewayError::Downstream { status, .. } => *status,
            GatewayError::ProxyUnavailable(_) => StatusCode::BAD_GATEWAY,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::UnsupportedTarget(_)
            | GatewayError::DomainRpc { .. }
            | GatewayError::GenericRpc(_)
            | GatewayError::Unknown(_) => RPC_ERROR_STATUS,
        }
    }

    /// The `error` object of the envelope.
    pub fn envelope_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        match self {
            GatewayError::AuthDenied
            | GatewayError::UnsupportedTarget(_)
            | GatewayError::Downstream { .. } => {}
            GatewayError::DomainRpc { attrs } => {
                for (key, value) in attrs {
                    let key = if key == DOMAIN_MESSAGE_ATTR {
                        ENVELOPE_MESSAGE_KEY
                    } else {
                        key.as_str()
                    };
                    payload.insert(key.to_string(), value.clone());
                }
            }
            GatewayError::GenericRpc(message)
            | GatewayError::Unknown(message)
            | GatewayError::ProxyUnavailable(message) => {
                payload.insert(ENVELOPE_MESSAGE_KEY.to_string(), Value::String(message.clone()));
            }
            GatewayError::NotFound(path) => {
                payload.insert(
                    ENVELOPE_MESSAGE_KEY.to_string(),
                    Value::String(format!("no route for {}", path)),
                );
            }
        }
        payload
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            GatewayError::AuthDenied => status.into_response(),
            GatewayError::Downstream { body, .. } => json_bytes(status, body),
            other => {
                let envelope = json!({ "error": other.envelope_payload() });
                json_response(status, &envelope)
            }
        }
    }
}

impl From<RpcError> for GatewayError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::UnsupportedProtocol(name) => GatewayError::UnsupportedTarget(name),
            RpcError::Remote { attrs, .. } => GatewayError::DomainRpc { attrs },
            RpcError::Application(message) => GatewayError::GenericRpc(message),
            other => GatewayError::Unknown(other.to_string()),
        }
    }
}

impl From<MarshalError> for GatewayError {
    fn from(err: MarshalError) -> Self {
        GatewayError::Unknown(err.to_string())
    }
}

impl From<AugmentError> for GatewayError {
    fn from(err: AugmentError) -> Self {
        GatewayError::Unknown(err.to_string())
    }
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        GatewayError::ProxyUnavailable(err.to_string())
    }
}

/// Serialize `value` as a JSON response.
pub fn json_response(status: StatusCode, value: &Value) -> Response {
    match serde_json::to_vec(value) {
        Ok(bytes) => json_bytes(status, Bytes::from(bytes)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Wrap already-encoded JSON bytes.
pub fn json_bytes(status: StatusCode, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_domain_error_envelope() {
        let mut attrs = Map::new();
        attrs.insert("expMsg".into(), json!("not found"));
        attrs.insert("errNum".into(), json!(5));
        let err = GatewayError::from(RpcError::Remote {
            exception_type: "ncTException".into(),
            attrs,
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(
            body_json(response).await,
            json!({"error": {"errNum": 5, "errMsg": "not found"}})
        );
    }

    #[tokio::test]
    async fn test_generic_and_unknown_errors_carry_message_only() {
        let response = GatewayError::from(RpcError::Application("bad method".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body_json(response).await, json!({"error": {"errMsg": "bad method"}}));

        let response = GatewayError::from(RpcError::UnknownBackend("EVFS".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(
            body_json(response).await,
            json!({"error": {"errMsg": "unknown backend 'EVFS'"}})
        );
    }

    #[tokio::test]
    async fn test_unsupported_target_is_empty_envelope() {
        let response = GatewayError::from(RpcError::UnsupportedProtocol("Foo".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body_json(response).await, json!({"error": {}}));
    }

    #[tokio::test]
    async fn test_auth_denied_has_empty_body() {
        let response = GatewayError::AuthDenied.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_downstream_passthrough() {
        let response = GatewayError::Downstream {
            status: StatusCode::CONFLICT,
            body: Bytes::from_static(b"{\"code\":409}"),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await, json!({"code": 409}));
    }

    #[test]
    fn test_marshal_error_is_unknown_tier() {
        let err = GatewayError::from(MarshalError::InvalidBody);
        assert_eq!(err.status(), RPC_ERROR_STATUS);
        assert_eq!(
            err.envelope_payload()["errMsg"],
            json!("request body must be a JSON array of call arguments")
        );
    }
}
