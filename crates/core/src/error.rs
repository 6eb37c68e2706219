//! Common error type shared across crates

use std::pin::Pin;

use futures::Stream;
use thiserror::Error;

/// Top-level error aggregating the per-crate error kinds.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("generation error: {0}")]
    Generation(String),

    #[error("pipeline error: {0}")]
    Pipeline(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("client error: {0}")]
    Client(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// An upstream generation source: text deltas arriving over time, terminated
/// by the end of the stream. The pipeline treats it as an opaque iterator and
/// never inspects provider framing.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;
