//! Tunables for the turn-taking kernel.
//!
//! Every struct defaults to the production constants and deserializes with
//! `#[serde(default)]`, so a JSON override only needs the fields it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{InterviewError, InterviewResult};
use crate::kernel::time::Millis;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Loudness (0-100) above which a frame counts as speech while listening.
    pub capture_threshold: f32,
    /// Loudness above which a frame counts as barge-in while the AI speaks.
    pub interrupt_threshold: f32,
    /// Uninterrupted silence that ends an utterance.
    pub silence_duration_ms: Millis,
    /// Window after the AI starts speaking in which barge-in is ignored.
    pub interrupt_grace_ms: Millis,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            capture_threshold: 8.0,
            interrupt_threshold: 30.0,
            silence_duration_ms: 2000,
            interrupt_grace_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub word_interval_ms: Millis,
    pub max_line_words: usize,
    pub clear_delay_ms: Millis,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            word_interval_ms: 270,
            max_line_words: 5,
            clear_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Anti-echo dwell between the end of a clip and resuming capture.
    pub dwell_ms: Millis,
    /// Pause in CANDIDATE_INTERRUPTING before listening resumes.
    pub interrupt_resume_ms: Millis,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            dwell_ms: 800,
            interrupt_resume_ms: 150,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureFormat {
    pub sample_rate: u32,
    pub frame_ms: Millis,
}

impl Default for CaptureFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            frame_ms: crate::kernel::time::TICK_MS,
        }
    }
}

impl CaptureFormat {
    pub fn samples_per_frame(&self) -> usize {
        ((self.sample_rate as u64 * self.frame_ms) / 1000).max(1) as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorConfig {
    pub vad: VadConfig,
    pub caption: CaptionConfig,
    pub playback: PlaybackConfig,
    pub capture: CaptureFormat,
}

impl ReactorConfig {
    pub fn from_json(text: &str) -> InterviewResult<Self> {
        serde_json::from_str(text).map_err(|e| InterviewError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> InterviewResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
