//! JSON-RPC method handlers.
//!
//! Implements the handlers for all supported JSON-RPC methods.

use super::server::ServerState;
use super::types::{ClassifyParams, JsonRpcError, StatusResult};

/// Handles a JSON-RPC method call.
pub fn handle_request(
    method: &str,
    params: serde_json::Value,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    match method {
        "classify" => handle_classify(params, state),
        "status" => handle_status(state),
        "ping" => handle_ping(),
        "shutdown" => handle_shutdown(state),
        _ => Err(JsonRpcError::method_not_found(method)),
    }
}

/// Handles the ping method for health checks.
fn handle_ping() -> Result<serde_json::Value, JsonRpcError> {
    Ok(serde_json::json!({ "status": "ok" }))
}

/// Handles the shutdown method.
fn handle_shutdown(state: &ServerState) -> Result<serde_json::Value, JsonRpcError> {
    state.shutdown();
    Ok(serde_json::json!({ "status": "shutting_down" }))
}

/// Handles the status method.
///
/// Reports model availability so operators can see a degraded generator;
/// recovery still requires a restart, loading is never retried.
fn handle_status(state: &ServerState) -> Result<serde_json::Value, JsonRpcError> {
    let result = StatusResult::new(
        state.pipeline.status(),
        state.config.sample_rate,
        state.config.max_audio_duration_sec,
    );

    serde_json::to_value(result)
        .map_err(|e| JsonRpcError::internal_error(format!("Failed to serialize status: {}", e)))
}

/// Handles the classify method.
fn handle_classify(
    params: serde_json::Value,
    state: &ServerState,
) -> Result<serde_json::Value, JsonRpcError> {
    // Parse parameters
    let params: ClassifyParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))?;

    // Read the clip; a bad path is a caller mistake, not a service fault
    let bytes = std::fs::read(&params.path).map_err(|e| {
        JsonRpcError::invalid_params(format!("Cannot read {}: {}", params.path, e))
    })?;

    let result = state
        .pipeline
        .classify_with_recommendations(&bytes)
        .map_err(|e| JsonRpcError::from_daemon_error(&e))?;

    serde_json::to_value(result)
        .map_err(|e| JsonRpcError::internal_error(format!("Failed to serialize result: {}", e)))
}
