//! Authorization gate.
//!
//! Runs before routing. Exact `(GET, path)` and `(POST, path)` pairs from the
//! whitelist pass straight through; every other request is handed to the
//! [`SessionVerifier`] predicate and rejected with an empty 403 when it
//! returns false.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AuthConfig;
use crate::http::response::GatewayError;
use crate::rpc::BackendResolver;
use crate::security::cookies::Cookies;

/// What the verifier gets to look at.
#[derive(Debug, Clone)]
pub struct RequestCredentials {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub cookies: Cookies,
}

impl RequestCredentials {
    pub fn new(method: &Method, path: &str, headers: &HeaderMap) -> Self {
        Self {
            method: method.clone(),
            path: path.to_string(),
            headers: headers.clone(),
            cookies: Cookies::from_headers(headers),
        }
    }
}

/// Session validity predicate.
pub trait SessionVerifier: Send + Sync {
    fn verify<'a>(&'a self, request: &'a RequestCredentials) -> BoxFuture<'a, bool>;
}

/// Accepts every request. Installed when `auth.enabled = false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SessionVerifier for AllowAll {
    fn verify<'a>(&'a self, _request: &'a RequestCredentials) -> BoxFuture<'a, bool> {
        Box::pin(async { true })
    }
}

/// Asks the session service whether the request's session cookie is valid.
pub struct RemoteSessionVerifier {
    client: reqwest::Client,
    resolver: BackendResolver,
    backend: String,
    path: String,
    cookie: String,
    timeout: Duration,
}

impl RemoteSessionVerifier {
    pub fn new(client: reqwest::Client, resolver: BackendResolver, config: &AuthConfig) -> Self {
        Self {
            client,
            resolver,
            backend: config.verify_backend.clone(),
            path: config.verify_path.clone(),
            cookie: config.session_cookie.clone(),
            timeout: Duration::from_millis(config.verify_timeout_ms),
        }
    }

    async fn check(&self, token: &str) -> bool {
        let target = match self.resolver.resolve(&self.backend) {
            Ok(target) => target,
            Err(e) => {
                tracing::error!(error = %e, "Session verifier backend unavailable");
                return false;
            }
        };
        let url = format!("http://{}{}", target.authority(), self.path);

        match self
            .client
            .post(&url)
            .json(&json!({ "token": token }))
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Session verification failed");
                false
            }
        }
    }
}

impl SessionVerifier for RemoteSessionVerifier {
    fn verify<'a>(&'a self, request: &'a RequestCredentials) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            match request.cookies.get(&self.cookie) {
                Some(token) if !token.is_empty() => self.check(token).await,
                _ => false,
            }
        })
    }
}

/// Exact paths exempt from verification.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    get: HashSet<String>,
    post: HashSet<String>,
}

impl Whitelist {
    pub fn new<G, P>(get: G, post: P) -> Self
    where
        G: IntoIterator<Item = String>,
        P: IntoIterator<Item = String>,
    {
        Self {
            get: get.into_iter().collect(),
            post: post.into_iter().collect(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.get_whitelist.clone(), config.post_whitelist.clone())
    }

    pub fn is_exempt(&self, method: &Method, path: &str) -> bool {
        if *method == Method::GET {
            self.get.contains(path)
        } else if *method == Method::POST {
            self.post.contains(path)
        } else {
            false
        }
    }
}

/// Whitelist plus verifier, shared by the middleware and the proxy re-check.
#[derive(Clone)]
pub struct AuthGate {
    whitelist: Arc<Whitelist>,
    verifier: Arc<dyn SessionVerifier>,
}

impl AuthGate {
    pub fn new(whitelist: Whitelist, verifier: Arc<dyn SessionVerifier>) -> Self {
        Self {
            whitelist: Arc::new(whitelist),
            verifier,
        }
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    /// Run the verification predicate, ignoring the whitelist.
    pub async fn verify(&self, method: &Method, path: &str, headers: &HeaderMap) -> bool {
        let credentials = RequestCredentials::new(method, path, headers);
        self.verifier.verify(&credentials).await
    }

    /// Whitelist check, then the predicate.
    pub async fn admit(&self, method: &Method, path: &str, headers: &HeaderMap) -> bool {
        self.whitelist.is_exempt(method, path) || self.verify(method, path, headers).await
    }
}

pub async fn auth_gate_middleware(
    State(gate): State<AuthGate>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let admitted = gate
        .admit(req.method(), req.uri().path(), req.headers())
        .await;

    if admitted {
        next.run(req).await
    } else {
        tracing::info!(method = %req.method(), path = %req.uri().path(), "Request denied by auth gate");
        GatewayError::AuthDenied.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDeny(AtomicUsize);

    impl SessionVerifier for CountingDeny {
        fn verify<'a>(&'a self, _request: &'a RequestCredentials) -> BoxFuture<'a, bool> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { false })
        }
    }

    #[test]
    fn test_whitelist_is_method_specific() {
        let whitelist = Whitelist::from_config(&AuthConfig::default());
        assert!(whitelist.is_exempt(&Method::GET, "/"));
        assert!(!whitelist.is_exempt(&Method::POST, "/"));
        assert!(whitelist.is_exempt(&Method::POST, "/api/admin/get_vcode"));
        assert!(!whitelist.is_exempt(&Method::GET, "/api/admin/get_vcode"));
        assert!(!whitelist.is_exempt(&Method::PUT, "/api/admin/get_vcode"));
        assert!(!whitelist.is_exempt(&Method::GET, "/api/admin/server_address/"));
    }

    #[tokio::test]
    async fn test_admit_skips_predicate_for_whitelisted_paths() {
        let verifier = Arc::new(CountingDeny(AtomicUsize::new(0)));
        let gate = AuthGate::new(
            Whitelist::from_config(&AuthConfig::default()),
            verifier.clone(),
        );

        assert!(gate.admit(&Method::GET, "/", &HeaderMap::new()).await);
        assert_eq!(verifier.0.load(Ordering::SeqCst), 0);

        assert!(!gate.admit(&Method::GET, "/api/EVFS/GetInfo", &HeaderMap::new()).await);
        assert_eq!(verifier.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_verifier_without_cookie_denies() {
        let resolver = BackendResolver::new(crate::config::shared(Default::default()));
        let verifier =
            RemoteSessionVerifier::new(reqwest::Client::new(), resolver, &AuthConfig::default());
        let credentials = RequestCredentials::new(&Method::GET, "/api/x/y", &HeaderMap::new());
        assert!(!verifier.verify(&credentials).await);
    }
}
