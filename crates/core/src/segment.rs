//! Segment and audio chunk types
//!
//! A `Segment` is one finalized slice of reply text; an `AudioChunk` is the
//! synthesized audio for exactly one segment, correlated by id.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Per-request segment identifier. Assigned sequentially starting at 1.
pub type SegmentId = u64;

/// A finalized slice of reply text, immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Sequence number, strictly increasing per request, no gaps
    pub id: SegmentId,
    /// Trimmed segment text
    pub text: String,
    /// True only for the end-of-stream flush
    #[serde(rename = "final")]
    pub is_final: bool,
    /// SHA-1 hex digest of the trimmed text, compared against the
    /// immediately preceding segment only
    #[serde(skip)]
    pub hash: String,
}

/// Declared encoding of an emitted audio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// RIFF/WAVE container, PCM16 inside
    Wav,
    /// Raw 16-bit little-endian PCM samples
    Pcm16le,
    /// Provider container passed through untouched
    Native,
}

impl AudioFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm16le => "pcm16le",
            AudioFormat::Native => "native",
        }
    }

    /// File extension used by the client-side audio cache.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm16le => "pcm",
            AudioFormat::Native => "bin",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthesized audio for one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    /// Segment id this audio belongs to
    pub id: SegmentId,
    /// Declared payload encoding
    pub format: AudioFormat,
    /// Audio payload
    pub bytes: Bytes,
}
