use reqwest::header::COOKIE;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Gateway status as reported by `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub service: String,
    pub version: String,
    pub status: String,
}

/// Outcome of a call that did not succeed.
#[derive(Debug, Error)]
pub enum CallError {
    /// Transport failure talking to the gateway.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    /// 403 from the auth gate.
    #[error("access denied")]
    Denied,
    /// Non-2xx with the `error` object of the envelope, when there was one.
    #[error("gateway returned {status}: {}", Value::Object(.error.clone()))]
    Gateway {
        status: StatusCode,
        error: Map<String, Value>,
    },
}

pub struct GatewayClient {
    client: Client,
    gateway_url: String,
    session: Option<(String, String)>,
}

impl GatewayClient {
    pub fn new(gateway_url: &str) -> Self {
        Self {
            client: Client::new(),
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            session: None,
        }
    }

    /// Send `cookie_name=token` with every request.
    pub fn with_session(mut self, cookie_name: &str, token: &str) -> Self {
        self.session = Some((cookie_name.to_string(), token.to_string()));
        self
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(format!("{}{}", self.gateway_url, path));
        match &self.session {
            Some((name, token)) => builder.header(COOKIE, format!("{}={}", name, token)),
            None => builder,
        }
    }

    pub async fn status(&self) -> Result<GatewayStatus, reqwest::Error> {
        self.client
            .get(format!("{}/", self.gateway_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }

    /// Invoke `method` (or `module.method`) on `protocol` with `args` as the argument list.
    pub async fn call(&self, protocol: &str, method: &str, args: &[Value]) -> Result<Value, CallError> {
        let path = format!("/api/{}/{}", protocol, method.replace('.', "/"));
        let resp = self.post(&path).json(&args).send().await?;
        decode(resp).await
    }

    /// POST a JSON body to a proxied service path, e.g. `/api/audit/log`.
    pub async fn proxy_post(&self, path: &str, body: &Value) -> Result<Response, reqwest::Error> {
        self.post(path).json(body).send().await
    }
}

async fn decode(resp: Response) -> Result<Value, CallError> {
    let status = resp.status();
    if status == StatusCode::FORBIDDEN {
        return Err(CallError::Denied);
    }

    let text = resp.text().await?;
    let body: Option<Value> = serde_json::from_str(&text).ok();
    if status.is_success() {
        return Ok(body.unwrap_or(Value::Null));
    }

    let error = match body {
        Some(Value::Object(mut envelope)) => match envelope.remove("error") {
            Some(Value::Object(error)) => error,
            _ => Map::new(),
        },
        _ => Map::new(),
    };
    Err(CallError::Gateway { status, error })
}
