//! JSON-RPC types for the daemon protocol.
//!
//! Implements the request/response envelope and the error mapping that
//! keeps client-input errors and system faults in distinct code families.

use serde::{Deserialize, Serialize};

use crate::error::DaemonError;
use crate::pipeline::PipelineStatus;

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestId {
    Integer(i64),
    String(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Integer(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::String(id)
    }
}

/// A JSON-RPC request wrapper.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub id: RequestId,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A JSON-RPC response wrapper.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse<T: Serialize> {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    pub result: T,
}

impl<T: Serialize> JsonRpcResponse<T> {
    pub fn new(id: RequestId, result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// A JSON-RPC error response.
#[derive(Debug, Serialize)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: &'static str,
    pub id: Option<RequestId>,
    pub error: JsonRpcError,
}

impl JsonRpcErrorResponse {
    pub fn new(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error,
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonRpcErrorData>,
}

/// Extended error data for application-specific errors.
#[derive(Debug, Serialize)]
pub struct JsonRpcErrorData {
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error code for client-input errors (bad audio).
pub const CODE_CLIENT_ERROR: i32 = -32000;

/// Application error code for system faults.
pub const CODE_SYSTEM_FAULT: i32 = -32010;

impl JsonRpcError {
    /// Creates a parse error (-32700).
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an invalid request error (-32600).
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    /// Creates a method not found error (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {}", method),
            data: None,
        }
    }

    /// Creates an invalid params error (-32602).
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    /// Creates an internal error (-32603).
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
            data: None,
        }
    }

    /// Maps a pipeline error to the outward error shape.
    ///
    /// Client-input errors keep their message, since it only describes the
    /// submitted audio. System faults carry the generic category description
    /// and error code and never the internal failure text.
    pub fn from_daemon_error(err: &DaemonError) -> Self {
        if err.code.is_client_error() {
            Self {
                code: CODE_CLIENT_ERROR,
                message: err.message.clone(),
                data: Some(JsonRpcErrorData {
                    error_code: err.code.as_str().to_string(),
                    details: None,
                }),
            }
        } else {
            Self {
                code: CODE_SYSTEM_FAULT,
                message: err.code.description().to_string(),
                data: Some(JsonRpcErrorData {
                    error_code: err.code.as_str().to_string(),
                    details: None,
                }),
            }
        }
    }
}

// ============================================================================
// Classify Request/Response
// ============================================================================

/// Parameters for a classify request.
#[derive(Debug, Deserialize)]
pub struct ClassifyParams {
    /// Path to the audio file to classify. The transport layer has already
    /// validated size and content type; the daemon validates the content.
    pub path: String,
}

/// Response for a status request.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// True once the classifier is loaded (always, for a serving daemon).
    pub classifier_loaded: bool,

    /// Number of genre labels in the classifier vocabulary.
    pub genre_labels: usize,

    /// True when the recommendation generator loaded successfully.
    pub generator_available: bool,

    /// Load failure reason when the generator is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_unavailable_reason: Option<String>,

    /// Classifier input sample rate in Hz.
    pub sample_rate: u32,

    /// Maximum accepted clip duration in seconds.
    pub max_audio_duration_sec: u32,
}

impl StatusResult {
    /// Builds a status response from the pipeline status and config values.
    pub fn new(status: PipelineStatus, sample_rate: u32, max_audio_duration_sec: u32) -> Self {
        Self {
            classifier_loaded: status.classifier_loaded,
            genre_labels: status.genre_labels,
            generator_available: status.generator_available,
            generator_unavailable_reason: status.generator_unavailable_reason,
            sample_rate,
            max_audio_duration_sec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_from_int() {
        let id: RequestId = 42.into();
        assert_eq!(id, RequestId::Integer(42));
    }

    #[test]
    fn request_id_from_string() {
        let id: RequestId = "abc".to_string().into();
        assert_eq!(id, RequestId::String("abc".to_string()));
    }

    #[test]
    fn json_rpc_error_codes() {
        assert_eq!(JsonRpcError::parse_error("").code, -32700);
        assert_eq!(JsonRpcError::invalid_request("").code, -32600);
        assert_eq!(JsonRpcError::method_not_found("").code, -32601);
        assert_eq!(JsonRpcError::invalid_params("").code, -32602);
        assert_eq!(JsonRpcError::internal_error("").code, -32603);
    }

    #[test]
    fn client_error_keeps_its_message() {
        let err = DaemonError::invalid_audio("empty audio buffer");
        let rpc = JsonRpcError::from_daemon_error(&err);
        assert_eq!(rpc.code, CODE_CLIENT_ERROR);
        assert!(rpc.message.contains("empty audio buffer"));
        assert_eq!(rpc.data.unwrap().error_code, "INVALID_AUDIO");
    }

    #[test]
    fn system_fault_hides_internal_text() {
        let inner = DaemonError::inference_failed("present.3.decoder.key not found");
        let err = DaemonError::service_fault(inner);
        let rpc = JsonRpcError::from_daemon_error(&err);
        assert_eq!(rpc.code, CODE_SYSTEM_FAULT);
        assert!(!rpc.message.contains("present.3"));
        let data = rpc.data.unwrap();
        assert_eq!(data.error_code, "SERVICE_FAULT");
        assert!(data.details.is_none());
    }

    #[test]
    fn classify_params_deserialize() {
        let params: ClassifyParams =
            serde_json::from_value(serde_json::json!({"path": "/tmp/clip.mp3"})).unwrap();
        assert_eq!(params.path, "/tmp/clip.mp3");
    }
}
