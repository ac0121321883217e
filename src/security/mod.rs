//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cookies.rs (permissive decoding of the raw Cookie header)
//!     → access_control.rs (whitelist, then session verifier)
//!     → Pass to routing
//!
//! Forwarded request:
//!     → headers.rs (caller IP, strip hop-by-hop headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a verifier error counts as an invalid session
//! - Whitelist entries are exact (method, path) pairs, no prefixes

pub mod access_control;
pub mod cookies;
pub mod headers;

pub use access_control::{AllowAll, AuthGate, RemoteSessionVerifier, RequestCredentials, SessionVerifier, Whitelist};
pub use cookies::Cookies;
