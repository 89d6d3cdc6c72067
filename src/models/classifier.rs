//! Genre classifier backed by an audio-classification ONNX model.
//!
//! Owns the classification session and its label vocabulary. The model is
//! loaded exactly once at construction; a load failure leaves the process
//! without a classifier, which callers must treat as fatal.

use std::path::Path;

use half::f16;
use ort::session::Session;
use ort::value::{DynValue, Tensor};

use crate::audio::Waveform;
use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};

/// Required model files for the audio classifier.
pub const REQUIRED_AUDIO_MODEL_FILES: &[&str] = &["model.onnx", "config.json"];

/// Audio-classification model wrapper.
///
/// Every call to [`classify`](Self::classify) runs a fresh inference; no
/// results are cached. Classification is deterministic for a fixed waveform
/// and model.
pub struct GenreClassifier {
    session: Session,
    labels: Vec<String>,
}

impl std::fmt::Debug for GenreClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenreClassifier")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl GenreClassifier {
    /// Loads the classifier from a model directory.
    ///
    /// The directory must contain `model.onnx` and a `config.json` with an
    /// `id2label` map. Loading is attempted once; on failure the classifier
    /// does not exist and the constructing caller must treat the error as a
    /// fatal startup condition.
    pub fn load(model_dir: &Path, config: &DaemonConfig) -> Result<Self> {
        check_audio_models(model_dir)?;

        let labels = load_labels(model_dir)?;

        let mut builder = Session::builder().map_err(|e| {
            DaemonError::model_load_failed(format!("Failed to create session: {}", e))
        })?;
        if let Some(threads) = config.threads {
            builder = builder.with_intra_threads(threads as usize).map_err(|e| {
                DaemonError::model_load_failed(format!("Failed to set thread count: {}", e))
            })?;
        }
        let session = builder
            .commit_from_file(model_dir.join("model.onnx"))
            .map_err(|e| {
                DaemonError::model_load_failed(format!("Failed to load model.onnx: {}", e))
            })?;

        eprintln!(
            "Audio classifier loaded ({} genre labels).",
            labels.len()
        );

        Ok(Self { session, labels })
    }

    /// Returns the label vocabulary of the loaded model.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Classifies a waveform into a genre label.
    ///
    /// Runs the model once on the normalized waveform and returns the
    /// top-ranked label, lower-cased and trimmed.
    pub fn classify(&mut self, waveform: &Waveform) -> Result<String> {
        let normalized = normalize(&waveform.samples);
        let n = normalized.len();

        let input = Tensor::from_array(([1, n], normalized)).map_err(|e| {
            DaemonError::inference_failed(format!("Failed to create input tensor: {}", e))
        })?;

        let mut outputs = self.session.run(ort::inputs![input]).map_err(|e| {
            DaemonError::inference_failed(format!("Classifier inference failed: {}", e))
        })?;

        let logits = outputs
            .remove("logits")
            .ok_or_else(|| DaemonError::inference_failed("logits not found in output"))?;

        let scores = extract_scores(&logits)?;
        if scores.is_empty() {
            return Err(DaemonError::inference_failed(
                "model returned no classification scores",
            ));
        }

        let best = argmax(&scores)
            .ok_or_else(|| DaemonError::inference_failed("classification scores not comparable"))?;

        let label = self.labels.get(best).ok_or_else(|| {
            DaemonError::inference_failed(format!("label id {} outside vocabulary", best))
        })?;

        let genre = label.trim().to_lowercase();
        if genre.is_empty() {
            return Err(DaemonError::inference_failed("model returned an empty label"));
        }

        Ok(genre)
    }
}

/// Checks if all required classifier files exist in the directory.
///
/// Returns Ok(()) if all files exist, or an error listing missing files.
pub fn check_audio_models(model_dir: &Path) -> Result<()> {
    let mut missing = Vec::new();

    for file in REQUIRED_AUDIO_MODEL_FILES {
        let path = model_dir.join(file);
        if !path.exists() {
            missing.push(*file);
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DaemonError::model_not_found(format!(
            "Missing model files in {}: {}",
            model_dir.display(),
            missing.join(", ")
        )))
    }
}

/// Loads the label vocabulary from the model's config.json.
fn load_labels(model_dir: &Path) -> Result<Vec<String>> {
    let config_path = model_dir.join("config.json");
    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        DaemonError::model_load_failed(format!("Failed to read config.json: {}", e))
    })?;

    let json: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        DaemonError::model_load_failed(format!("Failed to parse config.json: {}", e))
    })?;

    let id2label = json
        .get("id2label")
        .and_then(|v| v.as_object())
        .ok_or_else(|| {
            DaemonError::model_load_failed("config.json missing 'id2label' map".to_string())
        })?;

    let mut labels = vec![String::new(); id2label.len()];
    for (id, label) in id2label {
        let idx: usize = id.parse().map_err(|_| {
            DaemonError::model_load_failed(format!("id2label key is not an index: {}", id))
        })?;
        let name = label.as_str().ok_or_else(|| {
            DaemonError::model_load_failed(format!("id2label[{}] is not a string", id))
        })?;
        if idx >= labels.len() {
            labels.resize(idx + 1, String::new());
        }
        labels[idx] = name.to_string();
    }

    if labels.is_empty() {
        return Err(DaemonError::model_load_failed(
            "id2label map is empty".to_string(),
        ));
    }

    Ok(labels)
}

/// Normalizes a waveform to zero mean and unit variance.
///
/// Matches the feature-extractor preprocessing the classification model was
/// trained with.
fn normalize(samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }
    let n = samples.len() as f32;
    let mean = samples.iter().sum::<f32>() / n;
    let variance = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>() / n;
    let denom = (variance + 1e-7).sqrt();
    samples.iter().map(|s| (s - mean) / denom).collect()
}

/// Extracts a score row from a [1, n_labels] output tensor, f32 or f16.
fn extract_scores(value: &DynValue) -> Result<Vec<f32>> {
    let (shape, data): (Vec<usize>, Vec<f32>) =
        if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
            let shape_vec: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
            (shape_vec, data.to_vec())
        } else if let Ok((shape, data)) = value.try_extract_tensor::<f16>() {
            let shape_vec: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
            let data_f32: Vec<f32> = data.iter().map(|e| f32::from(*e)).collect();
            (shape_vec, data_f32)
        } else {
            return Err(DaemonError::inference_failed("scores must be f32 or f16"));
        };

    let n_labels = shape.last().copied().unwrap_or(0);
    if n_labels == 0 || data.len() < n_labels {
        return Err(DaemonError::inference_failed(
            "classifier output has no label dimension",
        ));
    }

    Ok(data[..n_labels].to_vec())
}

/// Returns the index of the largest score, if any.
fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, value)) if score <= value => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_model_dir_is_fatal() {
        let config = DaemonConfig::default();
        let err =
            GenreClassifier::load(&PathBuf::from("/nonexistent/model/dir"), &config).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ModelNotFound);
    }

    #[test]
    fn required_files_list() {
        assert_eq!(REQUIRED_AUDIO_MODEL_FILES.len(), 2);
        assert!(REQUIRED_AUDIO_MODEL_FILES.contains(&"model.onnx"));
        assert!(REQUIRED_AUDIO_MODEL_FILES.contains(&"config.json"));
    }

    #[test]
    fn labels_load_from_id2label() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"id2label": {"0": "blues", "1": "classical", "2": "rock"}}"#,
        )
        .unwrap();

        let labels = load_labels(dir.path()).unwrap();
        assert_eq!(labels, vec!["blues", "classical", "rock"]);
    }

    #[test]
    fn labels_reject_missing_map() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"model_type": "hubert"}"#).unwrap();

        let err = load_labels(dir.path()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ModelLoadFailed);
    }

    #[test]
    fn normalize_zero_mean_unit_variance() {
        let samples = vec![0.1, 0.4, -0.2, 0.3, -0.6];
        let normalized = normalize(&samples);
        let n = normalized.len() as f32;
        let mean = normalized.iter().sum::<f32>() / n;
        let variance = normalized.iter().map(|s| (s - mean) * (s - mean)).sum::<f32>() / n;
        assert!(mean.abs() < 1e-5);
        assert!((variance - 1.0).abs() < 1e-3);
    }

    #[test]
    fn argmax_picks_top_score() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.3, 0.1]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
