//! Model components for classification and recommendation.
//!
//! This module contains the ONNX model wrappers and their support code:
//! - [`GenreClassifier`](classifier::GenreClassifier): Waveform to genre label
//! - [`RecommendationGenerator`](generator::RecommendationGenerator): Genre to recommendation text
//! - [`Logits`](logits::Logits): Logits processing and sampling
//! - [`prompts`]: Genre-to-prompt templates with fallback

pub mod classifier;
pub mod downloader;
pub mod generator;
pub mod logits;
pub mod prompts;

// Re-export commonly used types
pub use classifier::{check_audio_models, GenreClassifier, REQUIRED_AUDIO_MODEL_FILES};
pub use downloader::{ensure_audio_models, ensure_text_models, AUDIO_MODEL_URLS, TEXT_MODEL_URLS};
pub use generator::{check_text_models, RecommendationGenerator, REQUIRED_TEXT_MODEL_FILES};
pub use logits::Logits;
pub use prompts::{prompt_for, KnownGenre};
