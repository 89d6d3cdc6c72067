//! TextGenConfig type for the text-generation model parameters.
//!
//! Contains the configuration parameters for the seq2seq ONNX model
//! ensemble, matching the model's architecture requirements.

use serde::{Deserialize, Serialize};

/// Configuration parameters for the text-generation model architecture.
///
/// These values are derived from the model's config.json and are required
/// for KV cache bookkeeping during autoregressive decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextGenConfig {
    /// Token vocabulary size (32128 for the T5 family).
    pub vocab_size: u32,

    /// Number of decoder transformer layers.
    pub num_decoder_layers: u32,

    /// Number of attention heads in each layer.
    pub num_attention_heads: u32,

    /// Hidden dimension size (embedding dimension).
    pub d_model: u32,

    /// Key/value dimension per attention head.
    /// Typically d_model / num_attention_heads.
    pub d_kv: u32,

    /// Padding token ID.
    pub pad_token_id: i64,

    /// End-of-sequence token ID; generation stops when sampled.
    pub eos_token_id: i64,

    /// Token the decoder is primed with before the first sampling step.
    pub decoder_start_token_id: i64,
}

impl TextGenConfig {
    /// Creates a TextGenConfig for the flan-t5-base model.
    ///
    /// This is the default configuration matching the ONNX export of
    /// google/flan-t5-base on HuggingFace.
    pub fn flan_t5_base() -> Self {
        Self {
            vocab_size: 32128,
            num_decoder_layers: 12,
            num_attention_heads: 12,
            d_model: 768,
            d_kv: 64, // 768 / 12 = 64
            pad_token_id: 0,
            eos_token_id: 1,
            decoder_start_token_id: 0, // T5 starts decoding from the pad token
        }
    }

    /// Validates the configuration for consistency.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.vocab_size == 0 {
            return Some("vocab_size must be > 0".to_string());
        }

        if self.num_decoder_layers == 0 {
            return Some("num_decoder_layers must be > 0".to_string());
        }

        if self.num_attention_heads == 0 {
            return Some("num_attention_heads must be > 0".to_string());
        }

        if self.d_model == 0 {
            return Some("d_model must be > 0".to_string());
        }

        // d_kv should typically be d_model / num_attention_heads
        let expected_d_kv = self.d_model / self.num_attention_heads;
        if self.d_kv != expected_d_kv {
            return Some(format!(
                "d_kv ({}) should be d_model / num_attention_heads ({})",
                self.d_kv, expected_d_kv
            ));
        }

        if self.eos_token_id < 0 {
            return Some(format!("eos_token_id must be >= 0, got {}", self.eos_token_id));
        }

        if self.eos_token_id as u32 >= self.vocab_size {
            return Some(format!(
                "eos_token_id ({}) outside vocabulary of size {}",
                self.eos_token_id, self.vocab_size
            ));
        }

        None
    }
}

impl Default for TextGenConfig {
    fn default() -> Self {
        Self::flan_t5_base()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flan_t5_base_config() {
        let config = TextGenConfig::flan_t5_base();
        assert_eq!(config.vocab_size, 32128);
        assert_eq!(config.num_decoder_layers, 12);
        assert_eq!(config.pad_token_id, 0);
        assert_eq!(config.eos_token_id, 1);
        assert!(config.validate().is_none());
    }

    #[test]
    fn config_validation() {
        let mut config = TextGenConfig::flan_t5_base();
        config.d_kv = 128; // Wrong value
        assert!(config.validate().is_some());
    }

    #[test]
    fn eos_outside_vocab_rejected() {
        let mut config = TextGenConfig::flan_t5_base();
        config.eos_token_id = config.vocab_size as i64;
        assert!(config.validate().is_some());
    }
}
