//! Classification pipeline.
//!
//! Composes decode, classification, and recommendation into one
//! request-scoped operation with the degradation policy applied.
//!
//! The pipeline is created exactly once per process and shared by
//! reference; it keeps no per-request state. Model sessions take `&mut`
//! for inference and are not assumed safe for concurrent mutation, so each
//! model sits behind its own mutex and concurrent requests serialize per
//! model. There is no cancellation, timeout, or retry at this layer.

use std::sync::Mutex;

use crate::audio::AudioDecoder;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use crate::models::{GenreClassifier, RecommendationGenerator};
use crate::types::ClassificationResult;

/// Decode, classify, and recommend for one clip at a time.
pub struct ClassificationPipeline {
    decoder: AudioDecoder,
    classifier: Mutex<GenreClassifier>,
    generator: Mutex<RecommendationGenerator>,
}

impl std::fmt::Debug for ClassificationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassificationPipeline").finish_non_exhaustive()
    }
}

/// Model availability as seen by the boundary layer.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineStatus {
    /// True once the pipeline exists; the classifier load is fatal,
    /// so a constructed pipeline always has it.
    pub classifier_loaded: bool,
    /// Number of genre labels in the classifier vocabulary.
    pub genre_labels: usize,
    /// True when the recommendation generator loaded successfully.
    pub generator_available: bool,
    /// Load failure reason when the generator is unavailable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator_unavailable_reason: Option<String>,
}

impl ClassificationPipeline {
    /// Creates the pipeline, loading both models exactly once.
    ///
    /// A classifier load failure is returned as an error and must be
    /// treated as fatal by the caller. A generator load failure is absorbed:
    /// the pipeline starts degraded and serves classification without
    /// recommendations.
    pub fn new(config: &DaemonConfig) -> Result<Self> {
        let decoder = AudioDecoder::new(config.sample_rate, config.max_audio_duration_sec);

        let classifier =
            GenreClassifier::load(&config.effective_audio_model_path(), config)?;

        let generator =
            RecommendationGenerator::load(&config.effective_text_model_path(), config);

        Ok(Self {
            decoder,
            classifier: Mutex::new(classifier),
            generator: Mutex::new(generator),
        })
    }

    /// Returns the availability of both models.
    pub fn status(&self) -> PipelineStatus {
        let classifier = self.classifier.lock().unwrap();
        let generator = self.generator.lock().unwrap();
        PipelineStatus {
            classifier_loaded: true,
            genre_labels: classifier.labels().len(),
            generator_available: generator.is_available(),
            generator_unavailable_reason: generator.unavailable_reason().map(String::from),
        }
    }

    /// Classifies a clip and generates recommendations for its genre.
    ///
    /// Decode failures propagate as client-input errors. Classifier
    /// failures are logged with detail and normalized to a single
    /// system-fault shape with a generic message. Generator failures never
    /// surface; they degrade to an empty recommendation set.
    pub fn classify_with_recommendations(&self, bytes: &[u8]) -> Result<ClassificationResult> {
        let (waveform, metadata) = self.decoder.decode(bytes)?;

        eprintln!(
            "Decoded {:.1}s of audio ({} Hz, {} source channels, {} bytes, {})",
            metadata.duration_sec,
            metadata.sample_rate,
            metadata.channels,
            metadata.byte_size,
            metadata.format
        );

        let genre = {
            let mut classifier = self.classifier.lock().unwrap();
            match classifier.classify(&waveform) {
                Ok(genre) => genre,
                Err(e) => {
                    eprintln!("Classification failed: {}", e);
                    return Err(DaemonError::service_fault(e));
                }
            }
        };

        eprintln!("Classified genre: {}", genre);

        let recommendations = {
            let mut generator = self.generator.lock().unwrap();
            if generator.is_available() {
                generator.recommend(&genre)
            } else {
                Vec::new()
            }
        };

        Ok(ClassificationResult::new(genre, recommendations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::path::PathBuf;

    #[test]
    fn missing_classifier_is_fatal_at_construction() {
        let config = DaemonConfig {
            audio_model_path: Some(PathBuf::from("/nonexistent/audio")),
            text_model_path: Some(PathBuf::from("/nonexistent/text")),
            ..Default::default()
        };
        let err = ClassificationPipeline::new(&config).unwrap_err();
        assert_eq!(err.code, ErrorCode::ModelNotFound);
        assert!(!err.code.is_client_error());
    }
}
