//! Route lookup.
//!
//! # Design Decisions
//! - Immutable after construction
//! - A configured proxy service name shadows an RPC protocol of the same name
//! - Explicit `NotFound` rather than a silent default

use axum::http::Method;
use std::sync::Arc;

use crate::proxy::ProxyServices;
use crate::routing::matcher::{match_call, split_api_path, CallTarget};

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /`
    Status,
    /// Reverse-proxied to an internal HTTP service.
    Proxy { service: String, path: String },
    /// Dispatched to an RPC backend.
    Rpc(CallTarget),
    NotFound,
}

/// Verbs accepted on RPC paths.
const RPC_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
];

#[derive(Debug, Clone)]
pub struct Router {
    services: Arc<ProxyServices>,
}

impl Router {
    pub fn new(services: Arc<ProxyServices>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &ProxyServices {
        &self.services
    }

    pub fn match_request(&self, method: &Method, path: &str) -> Route {
        if path == "/" {
            return if *method == Method::GET || *method == Method::HEAD {
                Route::Status
            } else {
                Route::NotFound
            };
        }

        if let Some((name, rest)) = split_api_path(path) {
            if self.services.contains(name) {
                return Route::Proxy {
                    service: name.to_string(),
                    path: rest.to_string(),
                };
            }
        }

        match match_call(path) {
            Some(target) if RPC_METHODS.contains(method) => Route::Rpc(target),
            _ => Route::NotFound,
        }
    }
}
