//! Server-side event sink
//!
//! Frames events and pushes the bytes into a channel feeding the HTTP
//! response body. After a terminal event (`done` or a fatal `error`) the
//! sink refuses further writes, so late synthesis completions can never
//! trail the end of the stream.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use talkstream_core::{EventSink, SinkClosed, StreamEvent};

use crate::{binary, sse};

/// Which wire framing a stream uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// SSE-style records, audio as base64
    Text,
    /// 5-byte-header units, audio unencoded
    Binary,
}

impl Framing {
    pub fn content_type(&self) -> &'static str {
        match self {
            Framing::Text => "text/event-stream; charset=utf-8",
            Framing::Binary => "application/octet-stream",
        }
    }
}

/// Event sink writing framed bytes into an `mpsc` channel.
pub struct ChannelSink {
    framing: Framing,
    tx: mpsc::Sender<Bytes>,
    terminated: AtomicBool,
}

impl ChannelSink {
    pub fn new(framing: Framing, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            framing,
            tx,
            terminated: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn send(&self, event: StreamEvent) -> Result<(), SinkClosed> {
        if self.terminated.load(Ordering::Acquire) {
            return Err(SinkClosed);
        }

        let terminal = matches!(event, StreamEvent::Done | StreamEvent::Fatal { .. });

        let bytes = match self.framing {
            Framing::Text => sse::encode_event(&event),
            Framing::Binary => binary::encode_event(&event),
        };

        self.tx.send(bytes).await.map_err(|_| SinkClosed)?;

        if terminal {
            self.terminated.store(true, Ordering::Release);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use talkstream_core::{AudioChunk, AudioFormat};

    #[tokio::test]
    async fn test_sink_writes_framed_events() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ChannelSink::new(Framing::Text, tx);

        sink.send(StreamEvent::Done).await.unwrap();
        let bytes = rx.recv().await.unwrap();
        assert_eq!(&bytes[..], b"event: done\ndata: {}\n\n");
    }

    #[tokio::test]
    async fn test_nothing_follows_terminal_event() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = ChannelSink::new(Framing::Binary, tx);

        sink.send(StreamEvent::Done).await.unwrap();
        let late = sink
            .send(StreamEvent::Audio(AudioChunk {
                id: 9,
                format: AudioFormat::Wav,
                bytes: Bytes::from_static(b"late"),
            }))
            .await;
        assert!(late.is_err());

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dropped_receiver_closes_sink() {
        let (tx, rx) = mpsc::channel(8);
        let sink = ChannelSink::new(Framing::Text, tx);
        drop(rx);

        let result = sink
            .send(StreamEvent::Mark {
                key: "model".to_string(),
                value: "m".to_string(),
            })
            .await;
        assert!(result.is_err());
    }
}
