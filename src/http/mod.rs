//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (request ID)
//!     → security::access_control (auth gate)
//!     → server.rs (route: status, RPC call or proxy)
//!     → response.rs (JSON body or error envelope)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::GatewayError;
pub use server::{build_router, AppState, GatewayServer};
