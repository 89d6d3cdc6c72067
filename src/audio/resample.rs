//! Mono waveform resampling.
//!
//! Converts decoded audio from its source rate to the classifier input
//! rate using rubato's sinc interpolation.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::{DaemonError, Result};

/// Input chunk size for the fixed-input resampler.
const CHUNK_SIZE: usize = 1024;

/// Resamples a mono waveform from `from_rate` to `to_rate`.
///
/// Returns the input unchanged when the rates already match.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler =
        SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1).map_err(|e| {
            DaemonError::invalid_audio(format!(
                "cannot resample {} Hz to {} Hz: {}",
                from_rate, to_rate, e
            ))
        })?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + CHUNK_SIZE);

    // Full chunks through process(), the remainder and the internal
    // filter tail through process_partial().
    let mut pos = 0;
    while pos + CHUNK_SIZE <= samples.len() {
        let chunk: &[&[f32]] = &[&samples[pos..pos + CHUNK_SIZE]];
        let frames = resampler
            .process(chunk, None)
            .map_err(|e| DaemonError::invalid_audio(format!("resampling failed: {}", e)))?;
        output.extend_from_slice(&frames[0]);
        pos += CHUNK_SIZE;
    }

    if pos < samples.len() {
        let remainder: &[&[f32]] = &[&samples[pos..]];
        let frames = resampler
            .process_partial(Some(remainder), None)
            .map_err(|e| DaemonError::invalid_audio(format!("resampling failed: {}", e)))?;
        output.extend_from_slice(&frames[0]);
    }

    let frames = resampler
        .process_partial::<&[f32]>(None, None)
        .map_err(|e| DaemonError::invalid_audio(format!("resampling failed: {}", e)))?;
    output.extend_from_slice(&frames[0]);

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(duration_sec: f32, sample_rate: u32) -> Vec<f32> {
        let n = (duration_sec * sample_rate as f32) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (2.0 * std::f32::consts::PI * 440.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn identity_when_rates_match() {
        let input = sine(0.5, 16_000);
        let output = resample(&input, 16_000, 16_000).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn upsampling_roughly_doubles_length() {
        let input = sine(1.0, 8_000);
        let output = resample(&input, 8_000, 16_000).unwrap();
        let expected = input.len() * 2;
        let tolerance = expected / 20;
        assert!(
            output.len() >= expected - tolerance && output.len() <= expected + tolerance,
            "unexpected output length {} for expected {}",
            output.len(),
            expected
        );
    }

    #[test]
    fn downsampling_roughly_halves_length() {
        let input = sine(1.0, 44_100);
        let output = resample(&input, 44_100, 16_000).unwrap();
        let expected = (input.len() as f64 * 16_000.0 / 44_100.0) as usize;
        let tolerance = expected / 20;
        assert!(
            output.len() >= expected - tolerance && output.len() <= expected + tolerance,
            "unexpected output length {} for expected {}",
            output.len(),
            expected
        );
    }

    #[test]
    fn short_input_survives_partial_path() {
        // Shorter than one chunk, exercises process_partial only
        let input = sine(0.01, 44_100);
        let output = resample(&input, 44_100, 16_000).unwrap();
        assert!(!output.is_empty());
    }

    #[test]
    fn output_amplitude_stays_bounded() {
        let input = sine(0.5, 22_050);
        let output = resample(&input, 22_050, 16_000).unwrap();
        assert!(output.iter().all(|s| s.abs() <= 1.1));
    }
}
