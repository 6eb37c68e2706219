//! Stream event catalogue and the emitter seam
//!
//! Every unit that crosses the wire is one of these events. Transports decide
//! how an event is framed; producers only talk to an [`EventSink`].

use async_trait::async_trait;
use thiserror::Error;

use crate::segment::{AudioChunk, Segment, SegmentId};

/// One unit of the reply stream, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Diagnostic key/value mark (resolved model, vendors)
    Mark { key: String, value: String },
    /// Diagnostic timing mark, milliseconds since the epoch
    MarkTime { key: String, t: i64 },
    /// Server clock sample for client-side correlation
    Ping { t: i64 },
    /// Finalized text segment
    Segment(Segment),
    /// Synthesized audio for one segment
    Audio(AudioChunk),
    /// Synthesis failure scoped to one segment; the stream continues
    SegmentError { id: SegmentId, message: String },
    /// Stream-fatal failure; no further events follow
    Fatal { message: String },
    /// Terminal event; no further events follow
    Done,
}

/// The receiving side went away (client disconnect, closed channel).
#[derive(Debug, Clone, Copy, Error)]
#[error("event sink closed")]
pub struct SinkClosed;

/// Where produced events go. Implementations frame and write; a closed sink
/// tells producers to stop spending.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, event: StreamEvent) -> Result<(), SinkClosed>;
}
