//! Logits processing for decoder output.
//!
//! Handles temperature scaling and top-k sampling for token generation.

use std::fmt::{Debug, Formatter};
use std::ops::{Deref, DerefMut};

use half::f16;
use ndarray::{Array, Array2, Axis, Ix3, IxDyn};
use ort::util::ArrayExt;
use ort::value::DynValue;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::RngCore;

use crate::error::{DaemonError, Result};

/// Wrapper around 2D logits array with processing methods.
pub struct Logits(Array2<f32>);

impl Deref for Logits {
    type Target = Array2<f32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Logits {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Debug for Logits {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Logits({:?})", self.0.dim())
    }
}

impl Logits {
    /// Creates Logits from a 3D DynValue, supporting both f32 and f16.
    ///
    /// The input shape is expected to be [batch_size, decoder_sequence_length,
    /// vocab_size]. Only the final decoder position is kept, since sampling
    /// always continues from the end of the sequence.
    pub fn from_3d_dyn_value(value: &DynValue) -> Result<Self> {
        let (shape, data): (Vec<usize>, Vec<f32>) =
            if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
                let shape_vec: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
                (shape_vec, data.to_vec())
            } else if let Ok((shape, data)) = value.try_extract_tensor::<f16>() {
                let shape_vec: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
                let data_f32: Vec<f32> = data.iter().map(|e| f32::from(*e)).collect();
                (shape_vec, data_f32)
            } else {
                return Err(DaemonError::inference_failed("Logits must be f32 or f16"));
            };

        // Create ndarray from raw data
        let arr = Array::from_shape_vec(IxDyn(&shape), data).map_err(|e| {
            DaemonError::inference_failed(format!("Failed to create array: {}", e))
        })?;

        let arr = arr
            .into_dimensionality::<Ix3>()
            .map_err(|e| DaemonError::inference_failed(format!("Expected 3D logits: {}", e)))?;

        let seq_len = arr.dim().1;
        if seq_len == 0 {
            return Err(DaemonError::inference_failed("decoder returned empty logits"));
        }

        let arr = arr.index_axis(Axis(1), seq_len - 1).to_owned();
        Ok(Self(arr))
    }

    /// Scales the logits by the sampling temperature.
    ///
    /// Values above 1.0 flatten the distribution, values below sharpen it.
    /// A temperature of 1.0 (or any non-positive value) leaves the logits
    /// unchanged.
    pub fn apply_temperature(mut self, temperature: f32) -> Self {
        if temperature > 0.0 && (temperature - 1.0).abs() > f32::EPSILON {
            self.0.mapv_inplace(|v| v / temperature);
        }
        self
    }

    /// Samples from the logits using top-k sampling.
    ///
    /// Returns a vector of (token_id, log_probability) pairs, one per batch
    /// entry.
    ///
    /// # Arguments
    ///
    /// * `k` - Take into account only top k logits in each batch
    /// * `rng` - Source of randomness; pass a seeded RNG for reproducible runs
    pub fn sample_top_k(&self, k: usize, rng: &mut dyn RngCore) -> Result<Vec<(i64, f32)>> {
        let mut result = vec![];
        let softmax_logits = self.0.softmax(Axis(1));

        for batch in softmax_logits.axis_iter(Axis(0)) {
            let k = k.min(batch.len()).max(1);

            // Vec<(token_id, softmax_prob)>
            let mut ranked = batch
                .iter()
                .enumerate()
                .map(|(i, e)| (i as i64, *e))
                .collect::<Vec<_>>();

            // Bring the most probable tokens to the front, then trim to k.
            ranked.sort_by(|a, b| {
                b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
            });
            ranked.truncate(k);

            // Sample a random index weighted by the softmax probabilities.
            let distribution = WeightedIndex::new(ranked.iter().map(|e| e.1)).map_err(|e| {
                DaemonError::inference_failed(format!(
                    "could not build sampling distribution: {}",
                    e
                ))
            })?;
            let (idx, softmax_prob) = ranked[distribution.sample(rng)];

            // Use natural log for log probability
            result.push((idx, softmax_prob.ln()));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn temperature_one_is_identity() {
        let arr = Array::from_shape_vec((1, 3), vec![1.0, 2.0, 3.0]).unwrap();
        let logits = Logits(arr.clone()).apply_temperature(1.0);
        assert_eq!(*logits, arr);
    }

    #[test]
    fn low_temperature_sharpens_distribution() {
        let arr = Array::from_shape_vec((1, 3), vec![1.0, 2.0, 3.0]).unwrap();
        let flat_max = Logits(arr.clone())
            .softmax(Axis(1))
            .iter()
            .cloned()
            .fold(f32::MIN, f32::max);
        let sharp_max = Logits(arr)
            .apply_temperature(0.5)
            .softmax(Axis(1))
            .iter()
            .cloned()
            .fold(f32::MIN, f32::max);
        assert!(sharp_max > flat_max);
    }

    #[test]
    fn sample_top_k_returns_valid_indices() {
        let arr = Array::from_shape_vec((2, 3), vec![0.1, 0.2, 0.7, 0.3, 0.4, 0.3]).unwrap();
        let logits = Logits(arr);
        let mut rng = rand::thread_rng();
        let samples = logits.sample_top_k(2, &mut rng).unwrap();
        assert_eq!(samples.len(), 2);
        for (idx, _log_prob) in &samples {
            assert!(*idx >= 0 && *idx < 3);
        }
    }

    #[test]
    fn top_k_one_is_greedy() {
        let arr = Array::from_shape_vec((1, 4), vec![0.0, 5.0, 1.0, -2.0]).unwrap();
        let logits = Logits(arr);
        let mut rng = rand::thread_rng();
        let samples = logits.sample_top_k(1, &mut rng).unwrap();
        assert_eq!(samples[0].0, 1);
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let arr = Array::from_shape_vec((1, 5), vec![0.5, 1.5, 0.2, 1.1, 0.9]).unwrap();
        let logits = Logits(arr);

        let mut rng_a = ChaCha8Rng::seed_from_u64(7);
        let mut rng_b = ChaCha8Rng::seed_from_u64(7);
        let a = logits.sample_top_k(3, &mut rng_a).unwrap();
        let b = logits.sample_top_k(3, &mut rng_b).unwrap();
        assert_eq!(a[0].0, b[0].0);
    }
}
