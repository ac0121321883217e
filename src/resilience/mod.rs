//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Proxied request:
//!     → transport sends with connect/read timeouts
//!     → On transport failure: retries.rs (retryable? attempts left?)
//!     → backoff.rs (exponential sleep before the next attempt)
//! ```
//!
//! RPC calls are never retried; their deadlines live with the channel.

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
