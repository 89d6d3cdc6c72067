//! Recommendation generator backed by a seq2seq text-generation model.
//!
//! Owns the tokenizer and the encoder/decoder ONNX sessions. Unlike the
//! classifier, a load failure here is non-fatal: the generator records
//! itself as unavailable and every recommendation request degrades to an
//! empty result. No failure in this module ever reaches the caller.

use std::borrow::Cow;
use std::path::Path;

use ort::session::{Session, SessionInputValue};
use ort::value::{DynValue, Tensor};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokenizers::Tokenizer;

use crate::config::{DaemonConfig, GenerationConfig};
use crate::error::{DaemonError, ErrorCode, Result};
use crate::models::logits::Logits;
use crate::models::prompts::prompt_for;
use crate::types::TextGenConfig;

/// Required model files for the text generator.
pub const REQUIRED_TEXT_MODEL_FILES: &[&str] = &[
    "tokenizer.json",
    "encoder_model.onnx",
    "decoder_model.onnx",
    "decoder_with_past_model.onnx",
];

/// Text-generation model wrapper with explicit availability state.
///
/// Construction never fails; the outcome of the single load attempt is
/// recorded and queryable via [`is_available`](Self::is_available). The
/// unavailable state is permanent for the process lifetime.
pub struct RecommendationGenerator {
    state: GeneratorState,
    params: GenerationConfig,
}

/// Outcome of the once-only model load.
enum GeneratorState {
    Ready(Box<TextGenModels>),
    Unavailable { reason: String },
}

impl RecommendationGenerator {
    /// Attempts to load the text-generation models exactly once.
    ///
    /// A failed load produces a generator in the unavailable state rather
    /// than an error; classification continues without recommendations.
    pub fn load(model_dir: &Path, config: &DaemonConfig) -> Self {
        let state = match TextGenModels::load(model_dir, config) {
            Ok(models) => {
                eprintln!("Text generator loaded.");
                GeneratorState::Ready(Box::new(models))
            }
            Err(e) => {
                eprintln!("Text generator unavailable, running degraded: {}", e);
                GeneratorState::Unavailable {
                    reason: e.to_string(),
                }
            }
        };

        Self {
            state,
            params: config.generation.clone(),
        }
    }

    /// Returns true if the generation models loaded successfully.
    pub fn is_available(&self) -> bool {
        matches!(self.state, GeneratorState::Ready(_))
    }

    /// Returns the load failure reason when unavailable.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.state {
            GeneratorState::Unavailable { reason } => Some(reason),
            GeneratorState::Ready(_) => None,
        }
    }

    /// Generates recommendations for a genre.
    ///
    /// Never fails: an unavailable generator or any internal generation
    /// failure produces an empty set. Internal failures are logged; the
    /// unavailable state is silent since it was already reported at load.
    pub fn recommend(&mut self, genre: &str) -> Vec<String> {
        match self.try_generate(genre) {
            Ok(recommendations) => recommendations,
            Err(e) if e.code == ErrorCode::ModelUnavailable => Vec::new(),
            Err(e) => {
                eprintln!("Recommendation generation failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Runs one generation attempt, surfacing the failure variant.
    ///
    /// Returns `MODEL_UNAVAILABLE` when the models never loaded, or the
    /// underlying inference error. [`recommend`](Self::recommend) absorbs
    /// both into an empty result.
    pub fn try_generate(&mut self, genre: &str) -> Result<Vec<String>> {
        let models = match &mut self.state {
            GeneratorState::Ready(models) => models,
            GeneratorState::Unavailable { .. } => {
                return Err(DaemonError::model_unavailable(
                    "text-generation model is not loaded",
                ));
            }
        };

        let prompt = prompt_for(genre);
        let text = models.generate(&prompt, &self.params)?;
        Ok(clean_generated(&text, &prompt))
    }
}

/// Loaded tokenizer and ONNX sessions for text generation.
struct TextGenModels {
    tokenizer: Tokenizer,
    encoder: Session,
    decoder: Session,
    decoder_with_past: Session,
    config: TextGenConfig,
}

impl TextGenModels {
    /// Loads all text-generation sessions from a directory.
    ///
    /// The directory should contain:
    /// - `tokenizer.json` - HuggingFace tokenizer
    /// - `encoder_model.onnx` - T5 encoder
    /// - `decoder_model.onnx` - First pass decoder
    /// - `decoder_with_past_model.onnx` - Decoder with KV cache
    ///
    /// Optionally:
    /// - `config.json` - Model configuration (uses flan-t5-base defaults if absent)
    fn load(model_dir: &Path, daemon_config: &DaemonConfig) -> Result<Self> {
        check_text_models(model_dir)?;

        let mut tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
            .map_err(|e| {
                DaemonError::model_load_failed(format!("Failed to load tokenizer: {}", e))
            })?;

        tokenizer
            .with_padding(None)
            .with_truncation(None)
            .map_err(|e| {
                DaemonError::model_load_failed(format!("Failed to configure tokenizer: {}", e))
            })?;

        let config = load_or_default_text_config(model_dir)?;
        if let Some(problem) = config.validate() {
            return Err(DaemonError::model_load_failed(format!(
                "Inconsistent text model config: {}",
                problem
            )));
        }

        let encoder = build_session(&model_dir.join("encoder_model.onnx"), daemon_config)?;
        let decoder = build_session(&model_dir.join("decoder_model.onnx"), daemon_config)?;
        let decoder_with_past =
            build_session(&model_dir.join("decoder_with_past_model.onnx"), daemon_config)?;

        Ok(Self {
            tokenizer,
            encoder,
            decoder,
            decoder_with_past,
            config,
        })
    }

    /// Generates text for a prompt by sampled autoregressive decoding.
    ///
    /// Encodes the prompt, then samples tokens one at a time with the KV
    /// cache threaded between decoder passes, stopping at the end-of-sequence
    /// token or the configured new-token budget.
    fn generate(&mut self, prompt: &str, params: &GenerationConfig) -> Result<String> {
        let mut rng: Box<dyn RngCore> = match params.seed {
            Some(seed) => Box::new(ChaCha8Rng::seed_from_u64(seed)),
            None => Box::new(rand::thread_rng()),
        };

        // Tokenize the prompt
        let tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| DaemonError::inference_failed(format!("Tokenization failed: {}", e)))?
            .get_ids()
            .iter()
            .map(|e| *e as i64)
            .collect::<Vec<_>>();

        if tokens.is_empty() {
            return Err(DaemonError::inference_failed(
                "tokenizer produced no input tokens",
            ));
        }
        let tokens_len = tokens.len();

        // Encode the prompt
        let input_ids = Tensor::from_array(([1, tokens_len], tokens)).map_err(|e| {
            DaemonError::inference_failed(format!("Failed to create input tensor: {}", e))
        })?;
        let attention_mask_data: Vec<i64> = vec![1; tokens_len];
        let attention_mask =
            Tensor::from_array(([1, tokens_len], attention_mask_data)).map_err(|e| {
                DaemonError::inference_failed(format!("Failed to create attention mask: {}", e))
            })?;

        let mut encoder_outputs = self
            .encoder
            .run(ort::inputs![input_ids, attention_mask])
            .map_err(|e| {
                DaemonError::inference_failed(format!("Encoder inference failed: {}", e))
            })?;

        let encoder_hidden_states = encoder_outputs
            .remove("last_hidden_state")
            .ok_or_else(|| {
                DaemonError::inference_failed("last_hidden_state not found in output")
            })?;

        // Attention mask for the decoder passes
        let mask_data: Vec<i64> = vec![1; tokens_len];
        let encoder_attention_mask = Tensor::from_array(([1, tokens_len], mask_data))
            .map_err(|e| {
                DaemonError::inference_failed(format!(
                    "Failed to create decoder attention mask: {}",
                    e
                ))
            })?
            .into_dyn();

        // First pass with the full decoder, primed with the start token
        let start_ids =
            Tensor::from_array(([1usize, 1], vec![self.config.decoder_start_token_id])).map_err(
                |e| DaemonError::inference_failed(format!("Failed to create input_ids: {}", e)),
            )?;

        let session_inputs: Vec<(Cow<str>, SessionInputValue)> = vec![
            (
                Cow::from("encoder_attention_mask"),
                SessionInputValue::from(encoder_attention_mask.view()),
            ),
            (
                Cow::from("input_ids"),
                SessionInputValue::from(start_ids.view()),
            ),
            (
                Cow::from("encoder_hidden_states"),
                SessionInputValue::from(encoder_hidden_states.view()),
            ),
        ];

        let mut outputs = self.decoder.run(session_inputs).map_err(|e| {
            DaemonError::inference_failed(format!("Initial decoder inference failed: {}", e))
        })?;

        let logits_value = outputs
            .remove("logits")
            .ok_or_else(|| DaemonError::inference_failed("logits not found in output"))?;
        let mut next = sample_next(
            Logits::from_3d_dyn_value(&logits_value)?,
            params,
            rng.as_mut(),
        )?;

        // Extract KV cache from first pass
        let num_layers = self.config.num_decoder_layers as usize;
        let mut kv_cache: Vec<(String, DynValue)> = Vec::new();
        for j in 0..num_layers {
            for kind in ["decoder.key", "decoder.value", "encoder.key", "encoder.value"] {
                let value = outputs.remove(&format!("present.{j}.{kind}")).ok_or_else(|| {
                    DaemonError::inference_failed(format!("present.{j}.{kind} not found"))
                })?;
                kv_cache.push((format!("past_key_values.{j}.{kind}"), value));
            }
        }

        // Autoregressive sampling with the KV-cache decoder
        let mut generated: Vec<u32> = Vec::new();
        loop {
            if next == self.config.eos_token_id {
                break;
            }
            generated.push(next as u32);
            if generated.len() >= params.max_new_tokens {
                break;
            }

            let step_ids = Tensor::from_array(([1usize, 1], vec![next])).map_err(|e| {
                DaemonError::inference_failed(format!("Failed to create input_ids: {}", e))
            })?;

            let mut session_inputs: Vec<(Cow<str>, SessionInputValue)> = vec![
                (
                    Cow::from("input_ids"),
                    SessionInputValue::from(step_ids.view()),
                ),
                (
                    Cow::from("encoder_attention_mask"),
                    SessionInputValue::from(encoder_attention_mask.view()),
                ),
            ];
            for (k, v) in &kv_cache {
                session_inputs.push((Cow::from(k.as_str()), SessionInputValue::from(v.view())));
            }

            let mut outputs = self.decoder_with_past.run(session_inputs).map_err(|e| {
                DaemonError::inference_failed(format!(
                    "Decoder with past inference failed: {}",
                    e
                ))
            })?;

            let logits_value = outputs
                .remove("logits")
                .ok_or_else(|| DaemonError::inference_failed("logits not found"))?;
            next = sample_next(
                Logits::from_3d_dyn_value(&logits_value)?,
                params,
                rng.as_mut(),
            )?;

            // Update KV cache (only decoder keys/values change)
            for j in 0..num_layers {
                let dk = outputs
                    .remove(&format!("present.{j}.decoder.key"))
                    .ok_or_else(|| {
                        DaemonError::inference_failed(format!("present.{j}.decoder.key not found"))
                    })?;
                let dv = outputs
                    .remove(&format!("present.{j}.decoder.value"))
                    .ok_or_else(|| {
                        DaemonError::inference_failed(format!(
                            "present.{j}.decoder.value not found"
                        ))
                    })?;

                kv_cache[j * 4] = (format!("past_key_values.{j}.decoder.key"), dk);
                kv_cache[j * 4 + 1] = (format!("past_key_values.{j}.decoder.value"), dv);
            }
        }

        if generated.is_empty() {
            return Ok(String::new());
        }

        self.tokenizer.decode(&generated, true).map_err(|e| {
            DaemonError::inference_failed(format!("Failed to decode generated tokens: {}", e))
        })
    }
}

/// Samples the next token id from processed logits.
fn sample_next(logits: Logits, params: &GenerationConfig, rng: &mut dyn RngCore) -> Result<i64> {
    let sampled = logits
        .apply_temperature(params.temperature)
        .sample_top_k(params.top_k, rng)?;
    sampled
        .first()
        .map(|e| e.0)
        .ok_or_else(|| DaemonError::inference_failed("sampler returned no token"))
}

/// Builds an ONNX session with the configured thread hint.
fn build_session(path: &Path, config: &DaemonConfig) -> Result<Session> {
    let mut builder = Session::builder().map_err(|e| {
        DaemonError::model_load_failed(format!("Failed to create session: {}", e))
    })?;
    if let Some(threads) = config.threads {
        builder = builder.with_intra_threads(threads as usize).map_err(|e| {
            DaemonError::model_load_failed(format!("Failed to set thread count: {}", e))
        })?;
    }
    builder.commit_from_file(path).map_err(|e| {
        DaemonError::model_load_failed(format!(
            "Failed to load {}: {}",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            e
        ))
    })
}

/// Checks if all required generator files exist in the directory.
///
/// Returns Ok(()) if all files exist, or an error listing missing files.
pub fn check_text_models(model_dir: &Path) -> Result<()> {
    let mut missing = Vec::new();

    for file in REQUIRED_TEXT_MODEL_FILES {
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

/// Loads the text model configuration from config.json or uses defaults.
fn load_or_default_text_config(model_dir: &Path) -> Result<TextGenConfig> {
    let config_path = model_dir.join("config.json");

    if !config_path.exists() {
        // Use default flan-t5-base config
        return Ok(TextGenConfig::flan_t5_base());
    }

    let content = std::fs::read_to_string(&config_path).map_err(|e| {
        DaemonError::model_load_failed(format!("Failed to read config.json: {}", e))
    })?;

    let json: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
        DaemonError::model_load_failed(format!("Failed to parse config.json: {}", e))
    })?;

    let defaults = TextGenConfig::flan_t5_base();

    let num_decoder_layers = json
        .get("num_decoder_layers")
        .and_then(|v| v.as_u64())
        .unwrap_or(defaults.num_decoder_layers as u64) as u32;

    let num_attention_heads = json
        .get("num_heads")
        .and_then(|v| v.as_u64())
        .unwrap_or(defaults.num_attention_heads as u64) as u32;

    let vocab_size = json
        .get("vocab_size")
        .and_then(|v| v.as_u64())
        .unwrap_or(defaults.vocab_size as u64) as u32;

    let d_model = json
        .get("d_model")
        .and_then(|v| v.as_u64())
        .unwrap_or(defaults.d_model as u64) as u32;

    let d_kv = json
        .get("d_kv")
        .and_then(|v| v.as_u64())
        .unwrap_or(defaults.d_kv as u64) as u32;

    let pad_token_id = json
        .get("pad_token_id")
        .and_then(|v| v.as_i64())
        .unwrap_or(defaults.pad_token_id);

    let eos_token_id = json
        .get("eos_token_id")
        .and_then(|v| v.as_i64())
        .unwrap_or(defaults.eos_token_id);

    let decoder_start_token_id = json
        .get("decoder_start_token_id")
        .and_then(|v| v.as_i64())
        .unwrap_or(defaults.decoder_start_token_id);

    Ok(TextGenConfig {
        vocab_size,
        num_decoder_layers,
        num_attention_heads,
        d_model,
        d_kv,
        pad_token_id,
        eos_token_id,
        decoder_start_token_id,
    })
}

/// Strips the prompt from generated text and trims whitespace.
///
/// An empty remainder yields an empty set; otherwise a one-element set with
/// the cleaned text.
fn clean_generated(text: &str, prompt: &str) -> Vec<String> {
    let cleaned = if text.contains(prompt) {
        text.replace(prompt, "")
    } else {
        text.to_string()
    };

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        Vec::new()
    } else {
        vec![cleaned.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn degraded_generator() -> RecommendationGenerator {
        let config = DaemonConfig::default();
        RecommendationGenerator::load(&PathBuf::from("/nonexistent/model/dir"), &config)
    }

    #[test]
    fn missing_models_degrade_instead_of_failing() {
        let generator = degraded_generator();
        assert!(!generator.is_available());
        assert!(generator
            .unavailable_reason()
            .expect("reason recorded")
            .contains("MODEL_NOT_FOUND"));
    }

    #[test]
    fn degraded_generator_returns_empty_for_any_genre() {
        let mut generator = degraded_generator();
        for genre in ["rock", "jazz", "vaporwave", "", "ELECTRO"] {
            assert!(generator.recommend(genre).is_empty());
        }
    }

    #[test]
    fn degraded_generation_attempt_reports_unavailable() {
        let mut generator = degraded_generator();
        let err = generator.try_generate("jazz").unwrap_err();
        assert_eq!(err.code, ErrorCode::ModelUnavailable);
    }

    #[test]
    fn required_files_list() {
        assert_eq!(REQUIRED_TEXT_MODEL_FILES.len(), 4);
        assert!(REQUIRED_TEXT_MODEL_FILES.contains(&"tokenizer.json"));
        assert!(REQUIRED_TEXT_MODEL_FILES.contains(&"decoder_with_past_model.onnx"));
    }

    #[test]
    fn text_config_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default_text_config(dir.path()).unwrap();
        assert_eq!(config.vocab_size, 32128);
        assert_eq!(config.num_decoder_layers, 12);
    }

    #[test]
    fn text_config_reads_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"num_decoder_layers": 24, "num_heads": 16, "d_model": 1024, "d_kv": 64, "eos_token_id": 2}"#,
        )
        .unwrap();

        let config = load_or_default_text_config(dir.path()).unwrap();
        assert_eq!(config.num_decoder_layers, 24);
        assert_eq!(config.num_attention_heads, 16);
        assert_eq!(config.d_model, 1024);
        assert_eq!(config.eos_token_id, 2);
        // Unspecified fields keep defaults
        assert_eq!(config.vocab_size, 32128);
    }

    #[test]
    fn clean_generated_strips_prompt() {
        let prompt = "Please recommend popular artists in the pop genre in bullet points.";
        let text = format!("{} - Artist A\n- Artist B", prompt);
        let result = clean_generated(&text, prompt);
        assert_eq!(result, vec!["- Artist A\n- Artist B".to_string()]);
    }

    #[test]
    fn clean_generated_passes_through_without_prompt() {
        let result = clean_generated("  some recommendations  ", "unrelated prompt");
        assert_eq!(result, vec!["some recommendations".to_string()]);
    }

    #[test]
    fn clean_generated_empty_text_yields_empty_set() {
        assert!(clean_generated("", "prompt").is_empty());
        assert!(clean_generated("   ", "prompt").is_empty());
        assert!(clean_generated("prompt", "prompt").is_empty());
    }
}
