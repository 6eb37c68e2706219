//! Client-side stream consumption
//!
//! Reads a framed reply stream, renders text in emission order, and
//! reassembles out-of-order audio completions into strict sequential
//! playback:
//! - EventReader: framed bytes → stream events
//! - PlaybackQueue: id-cursor ordering state machine
//! - TranscriptView: emission-order text rendering
//! - AudioCache: write-once per-id audio files
//! - TurnRunner: drives one request/response turn end to end

pub mod cache;
pub mod playback;
pub mod reader;
pub mod transcript;
pub mod turn;

pub use cache::AudioCache;
pub use playback::{AudioPlayer, PlaybackQueue, PlaybackState};
pub use reader::EventReader;
pub use transcript::TranscriptView;
pub use turn::{run_turn, TurnGuard, TurnOutcome};

use thiserror::Error;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] talkstream_transport::TransportError),

    #[error("malformed event: {0}")]
    Parse(String),

    #[error("playback error: {0}")]
    Playback(String),

    #[error("cache error: {0}")]
    Cache(#[from] std::io::Error),
}

impl From<ClientError> for talkstream_core::Error {
    fn from(err: ClientError) -> Self {
        talkstream_core::Error::Client(err.to_string())
    }
}
