//! RPC subsystem.
//!
//! # Data Flow
//! ```text
//! raw JSON body
//!     → marshal.rs (JSON → CallArgument, consulting registry.rs)
//!     → dispatch.rs (protocol → dispatch table entry)
//!     → resolver.rs (backend name → host/port, live config)
//!     → channel.rs (fresh TCP session per call)
//!     → codec.rs (length-prefixed JSON frames)
//!     → result JSON or RpcError
//! ```

pub mod channel;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod marshal;
pub mod registry;
pub mod resolver;

pub use channel::{ChannelTimeouts, RpcChannel, RpcConnector, TcpConnector};
pub use dispatch::{DispatchTable, ProtocolDispatcher, ProtocolEntry};
pub use error::{MarshalError, RpcError};
pub use marshal::{CallArgument, Fields, Marshaller};
pub use registry::{StructDescriptor, StructRegistry};
pub use resolver::{BackendResolver, BackendTarget};
