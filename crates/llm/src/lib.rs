//! Upstream generation sources
//!
//! A [`ReplySource`] turns a conversation into a stream of text deltas that
//! terminates with an explicit end. The pipeline never looks inside a
//! source's wire format; it only consumes the deltas.

mod openai;
mod scripted;

pub use openai::{OpenAiChat, OpenAiChatConfig};
pub use scripted::ScriptedSource;

use async_trait::async_trait;
use thiserror::Error;

use talkstream_core::{DeltaStream, Turn};

/// Generation source errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("malformed stream: {0}")]
    Stream(String),
}

impl From<LlmError> for talkstream_core::Error {
    fn from(err: LlmError) -> Self {
        talkstream_core::Error::Generation(err.to_string())
    }
}

/// An async source of reply deltas for one conversation.
#[async_trait]
pub trait ReplySource: Send + Sync {
    /// Start generating a reply. The returned stream yields text fragments
    /// and ends when generation is complete; a mid-stream failure surfaces
    /// as an `Err` item and terminates the stream.
    async fn stream_reply(&self, turns: &[Turn], model: &str) -> Result<DeltaStream, LlmError>;
}
