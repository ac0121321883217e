//! HTTP/JSON gateway in front of RPC backends and internal HTTP services.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod routing;
pub mod rpc;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::{GatewayBuilder, Shutdown};
