//! Error types for the genre-daemon.
//!
//! Defines all error codes and types used throughout the daemon for
//! consistent error handling and reporting.

use std::fmt;

/// Error codes returned by the daemon in error responses.
///
/// These codes are used in JSON-RPC error responses and allow clients
/// to programmatically handle specific error conditions. Codes are split
/// into client-input errors (the submitted audio was unusable) and system
/// faults (the service itself could not complete the request); see
/// [`ErrorCode::is_client_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Submitted bytes could not be decoded as audio.
    /// Trigger: empty buffer, unrecognized container, corrupt stream.
    InvalidAudio,

    /// Decoded audio exceeds the configured duration limit.
    /// Trigger: clip longer than `max_audio_duration_sec`.
    AudioTooLong,

    /// ONNX model files not found at expected path.
    /// Trigger: Model files missing from cache directory.
    ModelNotFound,

    /// Failed to load an ONNX model into memory.
    /// Trigger: Corrupt file, wrong format, or OOM during load.
    ModelLoadFailed,

    /// Failed to download model from remote source.
    /// Trigger: Network error, disk full during download.
    ModelDownloadFailed,

    /// A required model is not loaded for this process.
    /// Trigger: inference requested against a model that failed to load.
    ModelUnavailable,

    /// Model executed but produced an unusable result.
    /// Trigger: empty label list, missing output tensor, tokenizer failure.
    InferenceFailed,

    /// Normalized outward-facing system fault.
    /// Trigger: any non-client failure leaving the classification pipeline.
    ServiceFault,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidAudio => "INVALID_AUDIO",
            ErrorCode::AudioTooLong => "AUDIO_TOO_LONG",
            ErrorCode::ModelNotFound => "MODEL_NOT_FOUND",
            ErrorCode::ModelLoadFailed => "MODEL_LOAD_FAILED",
            ErrorCode::ModelDownloadFailed => "MODEL_DOWNLOAD_FAILED",
            ErrorCode::ModelUnavailable => "MODEL_UNAVAILABLE",
            ErrorCode::InferenceFailed => "INFERENCE_FAILED",
            ErrorCode::ServiceFault => "SERVICE_FAULT",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidAudio => "Submitted bytes could not be decoded as audio",
            ErrorCode::AudioTooLong => "Audio clip exceeds the configured duration limit",
            ErrorCode::ModelNotFound => "ONNX model files not found at expected path",
            ErrorCode::ModelLoadFailed => "Failed to load ONNX model into memory",
            ErrorCode::ModelDownloadFailed => "Failed to download model from remote source",
            ErrorCode::ModelUnavailable => "Required model is not loaded",
            ErrorCode::InferenceFailed => "Model inference produced an unusable result",
            ErrorCode::ServiceFault => "Classification service error",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::InvalidAudio => {
                "Submit a clip in a common audio container (MP3, WAV, FLAC, OGG) \
                 and verify the file is not truncated or empty"
            }
            ErrorCode::AudioTooLong => {
                "Trim the clip below the configured maximum duration \
                 (default 300 seconds) before submitting"
            }
            ErrorCode::ModelNotFound => {
                "Run the daemon once with network access to download models automatically, \
                 or point GENRE_AUDIO_MODEL_PATH / GENRE_TEXT_MODEL_PATH at a local copy"
            }
            ErrorCode::ModelLoadFailed => {
                "Check available memory (4GB+ recommended), verify model files are not corrupted, \
                 or delete the model cache and re-download"
            }
            ErrorCode::ModelDownloadFailed => {
                "Check internet connection, verify disk space (1GB+ required), \
                 or try again later if HuggingFace is unavailable"
            }
            ErrorCode::ModelUnavailable => {
                "Restart the daemon; model loading is attempted once per process \
                 and is not retried automatically"
            }
            ErrorCode::InferenceFailed => {
                "Restart the daemon or check system memory. If the issue persists, \
                 delete the model cache and re-download"
            }
            ErrorCode::ServiceFault => {
                "Retry the request; if the fault persists, inspect the daemon's \
                 stderr log and restart the process"
            }
        }
    }

    /// Returns true for errors caused by the submitted input rather than
    /// the service. The boundary layer maps these to a distinct error
    /// family (the HTTP 400 class rather than the 500 class).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorCode::InvalidAudio | ErrorCode::AudioTooLong)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for daemon operations.
#[derive(Debug)]
pub struct DaemonError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DaemonError {
    /// Creates a new DaemonError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an INVALID_AUDIO error.
    pub fn invalid_audio(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidAudio,
            format!("Invalid audio: {}", reason.into()),
        )
    }

    /// Creates an AUDIO_TOO_LONG error.
    pub fn audio_too_long(duration_sec: f64, max_sec: u32) -> Self {
        Self::new(
            ErrorCode::AudioTooLong,
            format!("Audio too long: {:.1}s (maximum {}s)", duration_sec, max_sec),
        )
    }

    /// Creates a MODEL_NOT_FOUND error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelNotFound,
            format!("Model files not found at: {}", path.into()),
        )
    }

    /// Creates a MODEL_LOAD_FAILED error.
    pub fn model_load_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelLoadFailed,
            format!("Failed to load model: {}", reason.into()),
        )
    }

    /// Creates a MODEL_DOWNLOAD_FAILED error.
    pub fn model_download_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelDownloadFailed,
            format!("Failed to download model: {}", reason.into()),
        )
    }

    /// Creates a MODEL_UNAVAILABLE error.
    pub fn model_unavailable(which: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ModelUnavailable,
            format!("Model not loaded: {}", which.into()),
        )
    }

    /// Creates an INFERENCE_FAILED error.
    pub fn inference_failed(reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InferenceFailed,
            format!("Inference failed: {}", reason.into()),
        )
    }

    /// Creates a SERVICE_FAULT wrapping an underlying system error.
    ///
    /// The outward message is deliberately generic; the wrapped error keeps
    /// the detail for the daemon's own log.
    pub fn service_fault(source: DaemonError) -> Self {
        Self {
            code: ErrorCode::ServiceFault,
            message: "classification service error".to_string(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for DaemonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for DaemonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using DaemonError.
pub type Result<T> = std::result::Result<T, DaemonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_as_str() {
        assert_eq!(ErrorCode::InvalidAudio.as_str(), "INVALID_AUDIO");
        assert_eq!(ErrorCode::AudioTooLong.as_str(), "AUDIO_TOO_LONG");
        assert_eq!(ErrorCode::ModelNotFound.as_str(), "MODEL_NOT_FOUND");
        assert_eq!(ErrorCode::ModelLoadFailed.as_str(), "MODEL_LOAD_FAILED");
        assert_eq!(ErrorCode::ModelDownloadFailed.as_str(), "MODEL_DOWNLOAD_FAILED");
        assert_eq!(ErrorCode::ModelUnavailable.as_str(), "MODEL_UNAVAILABLE");
        assert_eq!(ErrorCode::InferenceFailed.as_str(), "INFERENCE_FAILED");
        assert_eq!(ErrorCode::ServiceFault.as_str(), "SERVICE_FAULT");
    }

    #[test]
    fn error_code_recovery_hints_not_empty() {
        // Ensure all error codes have non-empty recovery hints
        assert!(!ErrorCode::InvalidAudio.recovery_hint().is_empty());
        assert!(!ErrorCode::AudioTooLong.recovery_hint().is_empty());
        assert!(!ErrorCode::ModelNotFound.recovery_hint().is_empty());
        assert!(!ErrorCode::ModelLoadFailed.recovery_hint().is_empty());
        assert!(!ErrorCode::ModelDownloadFailed.recovery_hint().is_empty());
        assert!(!ErrorCode::ModelUnavailable.recovery_hint().is_empty());
        assert!(!ErrorCode::InferenceFailed.recovery_hint().is_empty());
        assert!(!ErrorCode::ServiceFault.recovery_hint().is_empty());
    }

    #[test]
    fn client_error_partition() {
        assert!(ErrorCode::InvalidAudio.is_client_error());
        assert!(ErrorCode::AudioTooLong.is_client_error());
        assert!(!ErrorCode::ModelNotFound.is_client_error());
        assert!(!ErrorCode::ModelUnavailable.is_client_error());
        assert!(!ErrorCode::InferenceFailed.is_client_error());
        assert!(!ErrorCode::ServiceFault.is_client_error());
    }

    #[test]
    fn daemon_error_display() {
        let err = DaemonError::audio_too_long(321.5, 300);
        assert!(err.to_string().contains("AUDIO_TOO_LONG"));
        assert!(err.to_string().contains("321.5"));
        assert!(err.to_string().contains("Recovery:"));
    }

    #[test]
    fn service_fault_hides_detail_but_keeps_source() {
        let inner = DaemonError::inference_failed("logits tensor missing");
        let outer = DaemonError::service_fault(inner);
        assert_eq!(outer.code, ErrorCode::ServiceFault);
        assert!(!outer.message.contains("logits"));
        let source = std::error::Error::source(&outer).expect("source retained");
        assert!(source.to_string().contains("logits"));
    }
}
