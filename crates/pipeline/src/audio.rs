//! PCM conditioning and WAV wrapping
//!
//! Raw provider PCM is normalized here so the client never needs
//! provider-specific decoding: optional signal cleanup (DC offset removal,
//! short Hanning fades, leading silence pad) followed by a minimal RIFF/WAVE
//! wrap.

use std::io::Cursor;

use bytes::Bytes;

use crate::PipelineError;

/// Fade window applied to the head and tail of conditioned buffers.
const FADE_MS: u32 = 12;
/// Silence prepended to absorb the leading click some providers produce.
const PAD_MS: u32 = 40;

/// Decode little-endian PCM16 bytes into samples. A trailing odd byte is
/// dropped.
pub fn pcm_to_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Subtract the buffer's mean sample value from every sample, clamped to the
/// 16-bit signed range.
pub fn remove_dc_offset(samples: &mut [i16]) {
    if samples.is_empty() {
        return;
    }

    let sum: i64 = samples.iter().map(|&s| s as i64).sum();
    let mean = (sum as f64 / samples.len() as f64).round() as i64;

    for sample in samples.iter_mut() {
        let v = (*sample as i64 - mean).clamp(i16::MIN as i64, i16::MAX as i64);
        *sample = v as i16;
    }
}

/// Apply a Hanning-window fade-in at the start and fade-out at the end.
/// The window is clamped to a quarter of the buffer for very short clips.
pub fn hanning_fade(samples: &mut [i16], sample_rate: u32) {
    let total = samples.len();
    let fade = ((sample_rate * FADE_MS / 1000) as usize).min(total / 4);
    if fade == 0 {
        return;
    }

    for i in 0..fade {
        // 0 at the edge, rising to ~1 at the inner end of the window
        let w = 0.5 * (1.0 - (std::f64::consts::PI * i as f64 / fade as f64).cos());

        let head = samples[i] as f64 * w;
        samples[i] = head.round() as i16;

        let idx = total - 1 - i;
        let tail = samples[idx] as f64 * w;
        samples[idx] = tail.round() as i16;
    }
}

/// Prepend `PAD_MS` of silence.
pub fn prepend_silence(samples: Vec<i16>, sample_rate: u32) -> Vec<i16> {
    let pad = ((sample_rate * PAD_MS / 1000) as usize).max(1);
    let mut out = vec![0i16; pad];
    out.extend_from_slice(&samples);
    out
}

/// Full cleanup chain for providers with a leading click artifact.
pub fn condition(samples: Vec<i16>, sample_rate: u32) -> Vec<i16> {
    let mut samples = samples;
    remove_dc_offset(&mut samples);
    hanning_fade(&mut samples, sample_rate);
    prepend_silence(samples, sample_rate)
}

/// Wrap mono PCM16 samples in a minimal WAV container.
pub fn wrap_wav(samples: &[i16], sample_rate: u32) -> Result<Bytes, PipelineError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| PipelineError::Audio(e.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| PipelineError::Audio(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| PipelineError::Audio(e.to_string()))?;
    }

    Ok(Bytes::from(cursor.into_inner()))
}
