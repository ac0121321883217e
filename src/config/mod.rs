//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via ArcSwap to the resolver, proxy and auth gate
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the Arc<GatewayConfig> snapshot
//!     → next backend resolution observes the new values
//! ```
//!
//! # Design Decisions
//! - A snapshot is immutable once loaded; changes swap the whole snapshot
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The dispatch table and struct registry are built once at startup and
//!   are not affected by reloads

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AuthConfig, BackendConfig, GatewayConfig, ListenerConfig, PayloadRewrite, ProtocolConfig,
    ProxyConfig, ProxyServiceConfig, StructConfig,
};

use arc_swap::ArcSwap;
use std::sync::Arc;

/// The live configuration snapshot, swapped whole on reload.
pub type SharedConfig = Arc<ArcSwap<GatewayConfig>>;

/// Wrap a configuration for sharing.
pub fn shared(config: GatewayConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}
