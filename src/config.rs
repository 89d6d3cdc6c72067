//! Daemon configuration module.
//!
//! Contains the runtime configuration for the genre-daemon, including
//! audio constraints, model path configuration, and generation parameters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Target sample rate for classifier input in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Maximum accepted clip duration in seconds.
pub const DEFAULT_MAX_AUDIO_DURATION_SEC: u32 = 300;

/// Runtime configuration for the daemon.
///
/// This configuration is typically loaded from command-line arguments
/// or environment variables at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Path to the directory containing the audio-classification ONNX model.
    /// If None, uses the platform-specific default cache location.
    pub audio_model_path: Option<PathBuf>,

    /// Path to the directory containing the text-generation ONNX models.
    /// If None, uses the platform-specific default cache location.
    pub text_model_path: Option<PathBuf>,

    /// Sample rate the decoded waveform is resampled to before
    /// classification, in Hz.
    pub sample_rate: u32,

    /// Maximum accepted clip duration in seconds. Longer clips are
    /// rejected as client errors before any inference runs.
    pub max_audio_duration_sec: u32,

    /// Number of threads for intra-op parallelism in ONNX Runtime.
    /// If None, uses ONNX Runtime's default (typically number of CPU cores).
    pub threads: Option<u32>,

    /// Recommendation generation parameters.
    pub generation: GenerationConfig,
}

/// Sampling parameters for recommendation text generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum number of new tokens to generate per recommendation.
    pub max_new_tokens: usize,

    /// Softmax temperature for sampling. Higher values flatten the
    /// distribution; 1.0 leaves logits unchanged.
    pub temperature: f32,

    /// Number of top logits considered by the sampler.
    pub top_k: usize,

    /// Seed for reproducible sampling. None uses a thread-local RNG,
    /// making generation non-deterministic across calls.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 200,
            temperature: 0.7,
            top_k: 50,
            seed: None,
        }
    }
}

impl DaemonConfig {
    /// Creates a new DaemonConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a DaemonConfig from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `GENRE_AUDIO_MODEL_PATH` - Path to the audio-classification model directory
    /// - `GENRE_TEXT_MODEL_PATH` - Path to the text-generation model directory
    /// - `GENRE_SAMPLE_RATE` - Classifier input sample rate in Hz
    /// - `GENRE_MAX_AUDIO_DURATION` - Maximum clip duration in seconds
    /// - `GENRE_THREADS` - Number of threads for CPU execution
    /// - `GENRE_MAX_NEW_TOKENS` - Generation token budget
    /// - `GENRE_TEMPERATURE` - Sampling temperature
    /// - `GENRE_TOP_K` - Top-k sampling cutoff
    ///
    /// Falls back to defaults for unset variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("GENRE_AUDIO_MODEL_PATH") {
            config.audio_model_path = Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("GENRE_TEXT_MODEL_PATH") {
            config.text_model_path = Some(PathBuf::from(path));
        }

        if let Ok(rate_str) = std::env::var("GENRE_SAMPLE_RATE") {
            if let Ok(rate) = rate_str.parse::<u32>() {
                if rate > 0 {
                    config.sample_rate = rate;
                }
            }
        }

        if let Ok(duration_str) = std::env::var("GENRE_MAX_AUDIO_DURATION") {
            if let Ok(duration) = duration_str.parse::<u32>() {
                if duration > 0 {
                    config.max_audio_duration_sec = duration;
                }
            }
        }

        if let Ok(threads_str) = std::env::var("GENRE_THREADS") {
            if let Ok(threads) = threads_str.parse::<u32>() {
                if threads > 0 {
                    config.threads = Some(threads);
                }
            }
        }

        if let Ok(tokens_str) = std::env::var("GENRE_MAX_NEW_TOKENS") {
            if let Ok(tokens) = tokens_str.parse::<usize>() {
                if tokens > 0 && tokens <= 1024 {
                    config.generation.max_new_tokens = tokens;
                }
            }
        }

        if let Ok(temp_str) = std::env::var("GENRE_TEMPERATURE") {
            if let Ok(temp) = temp_str.parse::<f32>() {
                if temp > 0.0 && temp <= 2.0 {
                    config.generation.temperature = temp;
                }
            }
        }

        if let Ok(top_k_str) = std::env::var("GENRE_TOP_K") {
            if let Ok(top_k) = top_k_str.parse::<usize>() {
                if top_k > 0 {
                    config.generation.top_k = top_k;
                }
            }
        }

        config
    }

    /// Returns the effective audio model path, using platform defaults if not specified.
    pub fn effective_audio_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.audio_model_path {
            path.clone()
        } else {
            default_audio_model_path()
        }
    }

    /// Returns the effective text model path, using platform defaults if not specified.
    pub fn effective_text_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.text_model_path {
            path.clone()
        } else {
            default_text_model_path()
        }
    }

    /// Validates the configuration.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.sample_rate == 0 {
            return Some("sample_rate must be > 0".to_string());
        }
        if self.sample_rate > 192_000 {
            return Some(format!("sample_rate too high: {} (max 192000)", self.sample_rate));
        }

        if self.max_audio_duration_sec == 0 {
            return Some("max_audio_duration_sec must be > 0".to_string());
        }
        if self.max_audio_duration_sec > 3600 {
            return Some(format!(
                "max_audio_duration_sec too high: {} (max 3600)",
                self.max_audio_duration_sec
            ));
        }

        if let Some(threads) = self.threads {
            if threads == 0 {
                return Some("threads must be > 0".to_string());
            }
            if threads > 256 {
                return Some(format!("threads too high: {} (max 256)", threads));
            }
        }

        if self.generation.max_new_tokens == 0 {
            return Some("max_new_tokens must be > 0".to_string());
        }
        if self.generation.max_new_tokens > 1024 {
            return Some(format!(
                "max_new_tokens too high: {} (max 1024)",
                self.generation.max_new_tokens
            ));
        }

        if !(self.generation.temperature > 0.0 && self.generation.temperature <= 2.0) {
            return Some(format!(
                "temperature out of range: {} (must be in (0, 2])",
                self.generation.temperature
            ));
        }

        if self.generation.top_k == 0 {
            return Some("top_k must be > 0".to_string());
        }

        None
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            audio_model_path: None,
            text_model_path: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_audio_duration_sec: DEFAULT_MAX_AUDIO_DURATION_SEC,
            threads: None,
            generation: GenerationConfig::default(),
        }
    }
}

/// Returns the platform-specific default audio model storage path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Caches/genre-daemon/audio-classifier
/// - Linux: ~/.cache/genre-daemon/audio-classifier
/// - Windows: C:\Users\<user>\AppData\Local\genre-daemon\cache\audio-classifier
fn default_audio_model_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "genre-daemon") {
        proj_dirs.cache_dir().join("audio-classifier")
    } else {
        // Fallback to current directory
        PathBuf::from("./models/audio-classifier")
    }
}

/// Returns the platform-specific default text model storage path.
///
/// Uses the `directories` crate to find appropriate locations:
/// - macOS: ~/Library/Caches/genre-daemon/text-generator
/// - Linux: ~/.cache/genre-daemon/text-generator
/// - Windows: C:\Users\<user>\AppData\Local\genre-daemon\cache\text-generator
fn default_text_model_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "genre-daemon") {
        proj_dirs.cache_dir().join("text-generator")
    } else {
        // Fallback to current directory
        PathBuf::from("./models/text-generator")
    }
}
