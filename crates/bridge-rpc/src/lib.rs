//! JSON-RPC 2.0 server exposing the SPDK bridge over HTTP.
//!
//! `POST /rpc` takes operation names such as `CreateNvmeSubsystem` with the
//! typed request as params; `GET /health` probes the SPDK daemon.

pub mod handlers;
pub mod server;

pub use server::{router, start_server, AppState, ServerHandle};
