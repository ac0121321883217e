//! Reverse-proxy subsystem.
//!
//! # Data Flow
//! ```text
//! /api/{service}/{rest..}?query
//!     → services.rs (service → backend section, scheme)
//!     → augment.rs (object-storage expiry / audit-log fields)
//!     → transport.rs (pooled client, retry with backoff)
//!     → downstream status + body
//! ```

pub mod augment;
pub mod services;
pub mod transport;

pub use augment::{CallerContext, ForwardRequest};
pub use services::ProxyServices;
pub use transport::{ProxyResponse, RetryingTransport, TransportError};
