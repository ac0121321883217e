//! Client for the rpc-gateway HTTP API.

mod client;

pub use client::{CallError, GatewayClient, GatewayStatus};
