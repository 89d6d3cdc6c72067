//! Result types returned to the daemon boundary.
//!
//! A ClassificationResult is the only value the pipeline hands to callers;
//! it is immutable once constructed. AudioMetadata is descriptive only and
//! not required for correctness downstream.

use serde::{Deserialize, Serialize};

/// The classified genre of a clip together with generated recommendations.
///
/// `recommendations` is empty when the text-generation model is unavailable
/// or produced no usable text; it is never null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Lower-cased, trimmed genre label from the classifier's vocabulary.
    pub genre: String,

    /// Free-text recommendations for the classified genre.
    pub recommendations: Vec<String>,
}

impl ClassificationResult {
    /// Creates a result with recommendations.
    pub fn new(genre: impl Into<String>, recommendations: Vec<String>) -> Self {
        Self {
            genre: genre.into(),
            recommendations,
        }
    }

    /// Creates a result without recommendations (degraded mode).
    pub fn degraded(genre: impl Into<String>) -> Self {
        Self {
            genre: genre.into(),
            recommendations: Vec::new(),
        }
    }
}

/// Descriptive properties of a decoded audio clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioMetadata {
    /// Duration of the decoded waveform in seconds.
    pub duration_sec: f32,

    /// Sample rate of the waveform after resampling, in Hz.
    pub sample_rate: u32,

    /// Channel count of the source stream before downmixing.
    pub channels: u16,

    /// Size of the submitted byte buffer.
    pub byte_size: usize,

    /// Short tag naming the source codec ("mp3", "flac", ...), or
    /// "unknown" when the codec has no common name.
    pub format: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_result_has_empty_recommendations() {
        let result = ClassificationResult::degraded("jazz");
        assert_eq!(result.genre, "jazz");
        assert!(result.recommendations.is_empty());
    }

    #[test]
    fn result_serializes_to_boundary_shape() {
        let result = ClassificationResult::new("rock", vec!["try these bands".to_string()]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["genre"], "rock");
        assert_eq!(json["recommendations"][0], "try these bands");
    }

    #[test]
    fn empty_recommendations_serialize_as_empty_array() {
        let result = ClassificationResult::degraded("pop");
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"recommendations\":[]"));
    }
}
