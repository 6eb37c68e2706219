//! One request/response turn
//!
//! Drives the event-reader loop and the ordered playback state machine for
//! a single streamed reply, and guards against overlapping submissions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;

use talkstream_core::{AudioChunk, SegmentId, StreamEvent};
use talkstream_transport::Framing;

use crate::cache::AudioCache;
use crate::playback::{AudioPlayer, PlaybackQueue};
use crate::reader::EventReader;
use crate::transcript::TranscriptView;
use crate::ClientError;

/// What one turn produced.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Segments in emission order
    pub transcript: TranscriptView,
    /// True when the stream ended with `done`
    pub completed: bool,
    /// Error messages observed along the way
    pub errors: Vec<String>,
}

/// Request-in-flight guard. Holding it blocks further submissions; dropping
/// it (on any exit path, including errors and panics) releases the slot so
/// the next user turn can be sent.
pub struct TurnGuard {
    flag: Arc<AtomicBool>,
}

impl TurnGuard {
    pub fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Consume one framed reply stream: render segments as they arrive, cache
/// audio, and play chunks in strict ascending-id order with at most one
/// playback active.
///
/// A transport failure is local-only: it ends the turn cleanly with the
/// partial transcript instead of propagating.
pub async fn run_turn<S>(
    bytes: S,
    framing: Framing,
    player: Arc<dyn AudioPlayer>,
    cache: Option<AudioCache>,
) -> Result<TurnOutcome, ClientError>
where
    S: Stream<Item = Result<Bytes, ClientError>> + Send,
{
    let mut reader = EventReader::new(framing);
    let mut queue = PlaybackQueue::new();
    let mut transcript = TranscriptView::new();
    let mut errors = Vec::new();
    let mut completed = false;
    let mut stream_open = true;

    let (done_tx, mut done_rx) = mpsc::channel::<SegmentId>(4);
    let mut bytes = std::pin::pin!(bytes);

    loop {
        tokio::select! {
            item = bytes.next(), if stream_open => {
                match item {
                    Some(Ok(chunk)) => {
                        for event in reader.feed(&chunk)? {
                            match event {
                                StreamEvent::Segment(segment) => transcript.push(segment),
                                StreamEvent::Audio(chunk) => {
                                    if let Some(cache) = &cache {
                                        if let Err(e) = cache.store(&chunk).await {
                                            tracing::warn!(id = chunk.id, error = %e, "cache write failed");
                                        }
                                    }
                                    if let Some(next) = queue.on_chunk(chunk) {
                                        start_playback(next, player.clone(), done_tx.clone());
                                    }
                                }
                                StreamEvent::SegmentError { id, message } => {
                                    tracing::warn!(id, message = %message, "segment failed");
                                    errors.push(message);
                                    if let Some(next) = queue.on_missing(id) {
                                        start_playback(next, player.clone(), done_tx.clone());
                                    }
                                }
                                StreamEvent::Fatal { message } => {
                                    errors.push(message);
                                    stream_open = false;
                                }
                                StreamEvent::Done => {
                                    completed = true;
                                    stream_open = false;
                                }
                                StreamEvent::Mark { .. }
                                | StreamEvent::MarkTime { .. }
                                | StreamEvent::Ping { .. } => {}
                            }
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "transport failed mid-stream");
                        errors.push(e.to_string());
                        stream_open = false;
                    }
                    None => stream_open = false,
                }

                if !stream_open {
                    if let Some(next) = queue.on_stream_end() {
                        start_playback(next, player.clone(), done_tx.clone());
                    }
                }
            }
            Some(_) = done_rx.recv() => {
                let next = match queue.on_complete() {
                    Some(next) => Some(next),
                    None if !stream_open => queue.on_stream_end(),
                    None => None,
                };
                if let Some(next) = next {
                    start_playback(next, player.clone(), done_tx.clone());
                }
            }
        }

        if !stream_open && queue.is_drained() {
            break;
        }
    }

    Ok(TurnOutcome {
        transcript,
        completed,
        errors,
    })
}

fn start_playback(chunk: AudioChunk, player: Arc<dyn AudioPlayer>, done: mpsc::Sender<SegmentId>) {
    tokio::spawn(async move {
        let id = chunk.id;
        if let Err(e) = player.play(&chunk).await {
            tracing::warn!(id, error = %e, "playback failed");
        }
        // completion must be reported on every path or the cursor stalls
        let _ = done.send(id).await;
    });
}
