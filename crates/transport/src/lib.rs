//! Wire protocol
//!
//! Two interchangeable framings carry the same event catalogue:
//! - text framing: SSE-style records, audio as base64 inside the payload
//! - binary framing: 5-byte header units, audio bytes unencoded
//!
//! In both, a reader can always separate metadata from binary payload
//! without scanning inside the payload, and segment metadata is observable
//! at or before its audio.

pub mod binary;
pub mod sink;
pub mod sse;
mod wire;

pub use sink::{ChannelSink, Framing};

use thiserror::Error;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("malformed frame: {0}")]
    Frame(String),

    #[error("malformed payload: {0}")]
    Payload(String),
}

impl From<TransportError> for talkstream_core::Error {
    fn from(err: TransportError) -> Self {
        talkstream_core::Error::Transport(err.to_string())
    }
}
