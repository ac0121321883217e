//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (status, proxy service, RPC call or no-match)
//!     → matcher.rs (path shape: /api/{name}/..., /api/{p}/{m}, /api/{p}/{mod}/{m})
//! ```
//!
//! # Design Decisions
//! - Proxy service names are fixed at startup
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::CallTarget;
pub use router::{Route, Router};
