use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

use crate::error::InterviewResult;
use crate::kernel::time::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentStatus {
    /// Speech onset seen, still accumulating.
    Buffering,
    /// Silence timeout (or manual send) closed it; ready to hand upstream.
    Flushed,
    /// Capture abandoned because the turn moved on.
    Discarded,
}

/// Samples accumulated between speech onset and the end of the utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedSegment {
    pub id: String,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub started_at: Millis,
    pub ended_at: Option<Millis>,
    pub status: SegmentStatus,
}

impl CapturedSegment {
    pub fn new(started_at: Millis, sample_rate: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            samples: Vec::new(),
            sample_rate,
            started_at,
            ended_at: None,
            status: SegmentStatus::Buffering,
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    pub fn close(&mut self, at: Millis) {
        self.ended_at = Some(at);
        self.status = SegmentStatus::Flushed;
    }

    pub fn discard(&mut self) {
        self.samples.clear();
        self.status = SegmentStatus::Discarded;
    }

    /// Wall span from onset to close (includes the trailing silence window).
    pub fn span_ms(&self) -> Millis {
        self.ended_at
            .map(|end| end.saturating_sub(self.started_at))
            .unwrap_or(0)
    }

    /// Duration of the audio actually buffered.
    pub fn audio_ms(&self) -> Millis {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.samples.len() as u64 * 1000) / self.sample_rate as u64
    }

    /// 16-bit mono WAV.
    pub fn to_wav(&self) -> InterviewResult<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                let pcm = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer.write_sample(pcm)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    /// Wire form for the `audio_data` message.
    pub fn to_base64_wav(&self) -> InterviewResult<String> {
        Ok(BASE64_STANDARD.encode(self.to_wav()?))
    }
}
