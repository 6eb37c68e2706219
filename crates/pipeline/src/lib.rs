//! Reply-to-speech pipeline
//!
//! This crate turns an incremental text stream into ordered segment and
//! audio events:
//! - Segmenter: deltas → finalized text segments
//! - Sequencer: monotonic ids + adjacent duplicate suppression
//! - Synthesis worker pool: bounded fan-out to interchangeable providers
//! - Completion barrier: gates the terminal event on outstanding work
//! - Session: per-request orchestration of all of the above

pub mod audio;
pub mod barrier;
pub mod pool;
pub mod segmenter;
pub mod sequencer;
pub mod session;
pub mod synth;

pub use barrier::CompletionBarrier;
pub use pool::{SynthesisJob, WorkerPool};
pub use segmenter::{Segmenter, SegmenterConfig};
pub use sequencer::Sequencer;
pub use session::{ReplySession, SessionConfig, SessionMeta};
pub use synth::{ProviderKind, ProviderRegistry, SourceEncoding, SynthAudio, Synthesizer};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("provider {provider} error: {message}")]
    Provider { provider: String, message: String },

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("audio error: {0}")]
    Audio(String),

    #[error("channel closed")]
    ChannelClosed,
}

impl From<PipelineError> for talkstream_core::Error {
    fn from(err: PipelineError) -> Self {
        talkstream_core::Error::Pipeline(err.to_string())
    }
}
