//! JSON-RPC plumbing towards the SPDK daemon.
//!
//! # Architecture
//!
//! - **Transport**: one socket connection per call, write then half-close
//! - **Client**: id correlation, error mapping, typed result decoding
//! - **Protocol**: envelope types and the incremental reply decoder
//! - **Stub**: scripted backend used by tests and local tooling

pub mod client;
pub mod protocol;
pub mod stub;
pub mod transport;

pub use client::JsonRpcClient;
pub use protocol::{JsonRpcErrorObject, JsonRpcRequest, JsonRpcResponse};
pub use stub::{StubBackend, StubReply};
pub use transport::{BackendAddress, SocketTransport, Transport};
