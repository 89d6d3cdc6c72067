//! JSON-RPC module for daemon communication.
//!
//! Provides the JSON-RPC 2.0 server implementation for:
//! - `classify`: Classify an audio file and generate recommendations
//! - `status`: Report model availability and configured limits
//! - `ping`: Health check
//! - `shutdown`: Graceful shutdown
//!
//! Client-input errors and system faults surface in distinct error code
//! families so transports can map them to distinct status codes.

pub mod methods;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use server::{run_server, ServerState};
pub use types::{
    ClassifyParams, JsonRpcError, JsonRpcErrorResponse, JsonRpcRequest, JsonRpcResponse,
    RequestId, StatusResult, CODE_CLIENT_ERROR, CODE_SYSTEM_FAULT,
};
