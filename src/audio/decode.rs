//! Audio decoding for submitted byte buffers.
//!
//! Probes the container format, decodes the first audio track, downmixes
//! to mono, and resamples to the classifier input rate. Decoding is a pure
//! transformation: all failures are client-input errors.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{
    CodecType, DecoderOptions, CODEC_TYPE_AAC, CODEC_TYPE_FLAC, CODEC_TYPE_MP3, CODEC_TYPE_NULL,
    CODEC_TYPE_OPUS, CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_S16BE, CODEC_TYPE_PCM_S16LE,
    CODEC_TYPE_PCM_S24LE, CODEC_TYPE_PCM_S32LE, CODEC_TYPE_PCM_U8, CODEC_TYPE_VORBIS,
};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::resample::resample;
use crate::audio::Waveform;
use crate::error::{DaemonError, Result};
use crate::types::AudioMetadata;

/// Maximum number of consecutive undecodable packets before the stream is
/// rejected as corrupt.
const MAX_CONSECUTIVE_DECODE_ERRORS: usize = 10;

/// Decodes submitted byte buffers into normalized mono waveforms.
pub struct AudioDecoder {
    target_sample_rate: u32,
    max_duration_sec: u32,
}

impl AudioDecoder {
    /// Creates a decoder targeting the given sample rate and duration limit.
    pub fn new(target_sample_rate: u32, max_duration_sec: u32) -> Self {
        Self {
            target_sample_rate,
            max_duration_sec,
        }
    }

    /// Decodes a byte buffer into a mono waveform at the target rate.
    ///
    /// Validates that the buffer is non-empty, the container is
    /// recognizable, the decoded waveform has at least one sample, and the
    /// duration does not exceed the configured maximum.
    pub fn decode(&self, bytes: &[u8]) -> Result<(Waveform, AudioMetadata)> {
        if bytes.is_empty() {
            return Err(DaemonError::invalid_audio("empty audio buffer"));
        }

        let byte_size = bytes.len();
        let cursor = Cursor::new(bytes.to_vec());
        let stream = MediaSourceStream::new(Box::new(cursor), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                DaemonError::invalid_audio(format!("unrecognized audio format: {}", e))
            })?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DaemonError::invalid_audio("no audio track found"))?;

        let track_id = track.id;
        let codec = track.codec_params.codec;
        let source_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| DaemonError::invalid_audio("stream is missing a sample rate"))?;
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .unwrap_or(0);

        // Reject over-long clips before decoding when the container
        // declares its frame count.
        if let Some(frames) = track.codec_params.n_frames {
            let estimated_sec = frames as f64 / source_rate as f64;
            if estimated_sec > self.max_duration_sec as f64 {
                return Err(DaemonError::audio_too_long(
                    estimated_sec,
                    self.max_duration_sec,
                ));
            }
        }

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DaemonError::invalid_audio(format!("unsupported codec: {}", e)))?;

        let max_source_samples = self.max_duration_sec as u64 * source_rate as u64;
        let mut mono: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;
        let mut consecutive_errors = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(DaemonError::invalid_audio(format!(
                        "failed to read audio packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    consecutive_errors = 0;
                    let spec = *decoded.spec();
                    channels = spec.channels.count();

                    if sample_buf.is_none() {
                        sample_buf =
                            Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
                    }
                    let buf = sample_buf
                        .as_mut()
                        .ok_or_else(|| DaemonError::invalid_audio("sample buffer missing"))?;
                    buf.copy_interleaved_ref(decoded);

                    let ch = channels.max(1);
                    for frame in buf.samples().chunks_exact(ch) {
                        mono.push(frame.iter().sum::<f32>() / ch as f32);
                    }
                }
                Err(SymphoniaError::DecodeError(_)) | Err(SymphoniaError::IoError(_)) => {
                    // Skip corrupt packets up to a limit
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_CONSECUTIVE_DECODE_ERRORS {
                        return Err(DaemonError::invalid_audio(format!(
                            "stream corrupt after {} undecodable packets",
                            MAX_CONSECUTIVE_DECODE_ERRORS
                        )));
                    }
                    continue;
                }
                Err(e) => {
                    return Err(DaemonError::invalid_audio(format!(
                        "failed to decode audio: {}",
                        e
                    )));
                }
            }

            if mono.len() as u64 > max_source_samples {
                return Err(DaemonError::audio_too_long(
                    mono.len() as f64 / source_rate as f64,
                    self.max_duration_sec,
                ));
            }
        }

        if mono.is_empty() {
            return Err(DaemonError::invalid_audio("audio stream contains no samples"));
        }

        let samples = resample(&mono, source_rate, self.target_sample_rate)?;
        let waveform = Waveform::new(samples, self.target_sample_rate);

        if waveform.is_empty() {
            return Err(DaemonError::invalid_audio("resampled waveform is empty"));
        }
        if waveform.duration_sec() > self.max_duration_sec as f64 {
            return Err(DaemonError::audio_too_long(
                waveform.duration_sec(),
                self.max_duration_sec,
            ));
        }

        let metadata = AudioMetadata {
            duration_sec: waveform.duration_sec() as f32,
            sample_rate: self.target_sample_rate,
            channels: channels as u16,
            byte_size,
            format: codec_tag(codec).to_string(),
        };

        Ok((waveform, metadata))
    }
}

/// Maps well-known codec types to a short descriptive tag.
fn codec_tag(codec: CodecType) -> &'static str {
    match codec {
        CODEC_TYPE_MP3 => "mp3",
        CODEC_TYPE_AAC => "aac",
        CODEC_TYPE_FLAC => "flac",
        CODEC_TYPE_VORBIS => "vorbis",
        CODEC_TYPE_OPUS => "opus",
        CODEC_TYPE_PCM_S16LE | CODEC_TYPE_PCM_S16BE | CODEC_TYPE_PCM_U8 | CODEC_TYPE_PCM_S24LE
        | CODEC_TYPE_PCM_S32LE | CODEC_TYPE_PCM_F32LE => "pcm",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    /// Builds an in-memory 16-bit WAV with a 440 Hz tone.
    fn wav_fixture(duration_sec: f32, sample_rate: u32, channels: u16) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            let n = (duration_sec * sample_rate as f32) as usize;
            for i in 0..n {
                let t = i as f32 / sample_rate as f32;
                let sample = (16000.0 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()) as i16;
                for _ in 0..channels {
                    writer.write_sample(sample).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_stereo_wav_to_mono_at_target_rate() {
        let decoder = AudioDecoder::new(16_000, 300);
        let bytes = wav_fixture(1.0, 44_100, 2);

        let (waveform, metadata) = decoder.decode(&bytes).unwrap();

        assert_eq!(waveform.sample_rate, 16_000);
        assert!(!waveform.is_empty());
        assert!((waveform.duration_sec() - 1.0).abs() < 0.1);
        assert_eq!(metadata.channels, 2);
        assert_eq!(metadata.sample_rate, 16_000);
        assert_eq!(metadata.format, "pcm");
        assert_eq!(metadata.byte_size, bytes.len());
    }

    #[test]
    fn decodes_mono_wav_without_resampling() {
        let decoder = AudioDecoder::new(16_000, 300);
        let bytes = wav_fixture(0.5, 16_000, 1);

        let (waveform, metadata) = decoder.decode(&bytes).unwrap();

        assert_eq!(waveform.sample_rate, 16_000);
        assert_eq!(waveform.samples.len(), 8_000);
        assert_eq!(metadata.channels, 1);
    }

    #[test]
    fn empty_buffer_is_client_error() {
        let decoder = AudioDecoder::new(16_000, 300);
        let err = decoder.decode(&[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAudio);
        assert!(err.code.is_client_error());
    }

    #[test]
    fn garbage_bytes_are_client_error() {
        let decoder = AudioDecoder::new(16_000, 300);
        let err = decoder.decode(b"definitely not audio data").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAudio);
    }

    #[test]
    fn over_duration_clip_is_rejected() {
        let decoder = AudioDecoder::new(16_000, 1);
        let bytes = wav_fixture(2.0, 16_000, 1);
        let err = decoder.decode(&bytes).unwrap_err();
        assert_eq!(err.code, ErrorCode::AudioTooLong);
        assert!(err.code.is_client_error());
    }

    #[test]
    fn codec_tags() {
        assert_eq!(codec_tag(CODEC_TYPE_MP3), "mp3");
        assert_eq!(codec_tag(CODEC_TYPE_PCM_S16LE), "pcm");
        assert_eq!(codec_tag(CODEC_TYPE_NULL), "unknown");
    }
}
