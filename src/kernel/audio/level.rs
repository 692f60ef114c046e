//! Loudness on a 0-100 scale.
//!
//! The scale is the mean absolute deviation of 8-bit time-domain samples from
//! their silence baseline (128), amplified by `SENSITIVITY` and clamped.

pub const SILENCE_BASELINE: f32 = 128.0;
pub const SENSITIVITY: f32 = 5.0;
pub const MAX_LOUDNESS: f32 = 100.0;

/// Loudness of unsigned 8-bit samples centred on 128.
pub fn loudness_from_bytes(samples: &[u8]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples
        .iter()
        .map(|&b| (b as f32 - SILENCE_BASELINE).abs())
        .sum();
    scale(sum / samples.len() as f32)
}

/// Loudness of f32 PCM in [-1, 1], mapped onto the same 8-bit scale.
pub fn loudness_from_pcm(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples
        .iter()
        // Corrupt samples count as silence.
        .map(|&x| if x.is_finite() { x.clamp(-1.0, 1.0).abs() * SILENCE_BASELINE } else { 0.0 })
        .sum();
    scale(sum / samples.len() as f32)
}

fn scale(mean_deviation: f32) -> f32 {
    (mean_deviation * SENSITIVITY).min(MAX_LOUDNESS)
}
