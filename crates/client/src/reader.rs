//! Framed bytes → stream events
//!
//! One reader handles either framing variant. In the binary variant an
//! audio payload is correlated with the `tts_start` metadata unit that
//! precedes it; the text variant carries audio as base64 inside the `tts`
//! payload.

use base64::Engine;
use bytes::Bytes;
use serde_json::Value;

use talkstream_core::{AudioChunk, AudioFormat, Segment, StreamEvent};
use talkstream_transport::binary::{Frame, FrameDecoder};
use talkstream_transport::sse::SseParser;
use talkstream_transport::Framing;

use crate::ClientError;

struct PendingAudio {
    id: u64,
    format: AudioFormat,
}

/// Incremental event reader for one stream.
pub struct EventReader {
    framing: Framing,
    sse: SseParser,
    frames: FrameDecoder,
    pending_audio: Option<PendingAudio>,
}

impl EventReader {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            sse: SseParser::new(),
            frames: FrameDecoder::new(),
            pending_audio: None,
        }
    }

    /// Feed received bytes; returns every event they completed, in wire
    /// order. Unknown event names are skipped.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, ClientError> {
        match self.framing {
            Framing::Text => self.feed_text(chunk),
            Framing::Binary => self.feed_binary(chunk),
        }
    }

    fn feed_text(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, ClientError> {
        let mut events = Vec::new();
        for record in self.sse.feed(chunk)? {
            let data: Value = if record.data.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&record.data)
                    .map_err(|e| ClientError::Parse(format!("{}: {}", record.event, e)))?
            };

            match record.event.as_str() {
                "tts" => {
                    let id = expect_id(&data, "tts")?;
                    let b64 = data["b64"].as_str().unwrap_or_default();
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(b64)
                        .map_err(|e| ClientError::Parse(format!("tts b64: {}", e)))?;
                    events.push(StreamEvent::Audio(AudioChunk {
                        id,
                        format: parse_format(&data),
                        bytes: Bytes::from(bytes),
                    }));
                }
                name => {
                    if let Some(event) = parse_meta_event(name, &data)? {
                        events.push(event);
                    }
                }
            }
        }
        Ok(events)
    }

    fn feed_binary(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, ClientError> {
        let mut events = Vec::new();
        for frame in self.frames.feed(chunk)? {
            match frame {
                Frame::Meta(data) => {
                    let name = data["event"].as_str().unwrap_or_default().to_string();
                    if name == "tts_start" {
                        self.pending_audio = Some(PendingAudio {
                            id: expect_id(&data, "tts_start")?,
                            format: parse_format(&data),
                        });
                    } else if let Some(event) = parse_meta_event(&name, &data)? {
                        events.push(event);
                    }
                }
                Frame::Audio(bytes) => {
                    let pending = self
                        .pending_audio
                        .take()
                        .ok_or_else(|| ClientError::Parse("audio without tts_start".to_string()))?;
                    events.push(StreamEvent::Audio(AudioChunk {
                        id: pending.id,
                        format: pending.format,
                        bytes,
                    }));
                }
            }
        }
        Ok(events)
    }
}

fn expect_id(data: &Value, context: &str) -> Result<u64, ClientError> {
    data["id"]
        .as_u64()
        .ok_or_else(|| ClientError::Parse(format!("{} without id", context)))
}

fn parse_format(data: &Value) -> AudioFormat {
    match data["format"].as_str().unwrap_or_default() {
        "wav" => AudioFormat::Wav,
        "pcm16le" | "pcm" => AudioFormat::Pcm16le,
        _ => AudioFormat::Native,
    }
}

fn parse_meta_event(name: &str, data: &Value) -> Result<Option<StreamEvent>, ClientError> {
    let event = match name {
        "segment" => Some(StreamEvent::Segment(Segment {
            id: expect_id(data, "segment")?,
            text: data["text"].as_str().unwrap_or_default().to_string(),
            is_final: data["final"].as_bool().unwrap_or(false),
            hash: String::new(),
        })),
        "error" => {
            let message = data["message"].as_str().unwrap_or("unknown error").to_string();
            match data["id"].as_u64() {
                Some(id) => Some(StreamEvent::SegmentError { id, message }),
                None => Some(StreamEvent::Fatal { message }),
            }
        }
        "done" => Some(StreamEvent::Done),
        "mark" => {
            let key = data["k"].as_str().unwrap_or_default().to_string();
            match data["t"].as_i64() {
                Some(t) => Some(StreamEvent::MarkTime { key, t }),
                None => Some(StreamEvent::Mark {
                    key,
                    value: data["v"].as_str().unwrap_or_default().to_string(),
                }),
            }
        }
        "ping" => Some(StreamEvent::Ping {
            t: data["t"].as_i64().unwrap_or_default(),
        }),
        other => {
            tracing::debug!(event = other, "skipping unknown event");
            None
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    use talkstream_transport::{binary, sse};

    fn segment(id: u64, text: &str) -> StreamEvent {
        StreamEvent::Segment(Segment {
            id,
            text: text.to_string(),
            is_final: false,
            hash: String::new(),
        })
    }

    fn audio(id: u64) -> StreamEvent {
        StreamEvent::Audio(AudioChunk {
            id,
            format: AudioFormat::Wav,
            bytes: Bytes::from(vec![id as u8; 16]),
        })
    }

    #[test]
    fn test_text_framing_roundtrip() {
        let mut reader = EventReader::new(Framing::Text);

        let mut wire = Vec::new();
        wire.extend_from_slice(&sse::encode_event(&segment(1, "こんにちは！")));
        wire.extend_from_slice(&sse::encode_event(&audio(1)));
        wire.extend_from_slice(&sse::encode_event(&StreamEvent::Done));

        let events = reader.feed(&wire).unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], StreamEvent::Segment(s) if s.id == 1));
        assert!(matches!(&events[1], StreamEvent::Audio(c) if c.id == 1 && c.bytes.len() == 16));
        assert!(matches!(events[2], StreamEvent::Done));
    }

    #[test]
    fn test_binary_framing_roundtrip() {
        let mut reader = EventReader::new(Framing::Binary);

        let mut wire = Vec::new();
        wire.extend_from_slice(&binary::encode_event(&segment(2, "テスト。")));
        wire.extend_from_slice(&binary::encode_event(&audio(2)));

        // feed byte by byte: correlation survives any chunking
        let mut events = Vec::new();
        for byte in wire {
            events.extend(reader.feed(&[byte]).unwrap());
        }

        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], StreamEvent::Segment(s) if s.text == "テスト。"));
        assert!(matches!(&events[1], StreamEvent::Audio(c) if c.id == 2));
    }

    #[test]
    fn test_audio_without_announcement_rejected() {
        let mut reader = EventReader::new(Framing::Binary);
        // a bare audio frame with no preceding tts_start
        let err = reader.feed(&[0x02, 2, 0, 0, 0, 0xAB, 0xCD]);
        assert!(err.is_err());
    }

    #[test]
    fn test_error_event_scoping() {
        let mut reader = EventReader::new(Framing::Text);

        let scoped = reader
            .feed(b"event: error\ndata: {\"message\":\"TTS failed\",\"id\":4}\n\n")
            .unwrap();
        assert!(matches!(
            &scoped[0],
            StreamEvent::SegmentError { id: 4, .. }
        ));

        let fatal = reader
            .feed(b"event: error\ndata: {\"message\":\"bad request\"}\n\n")
            .unwrap();
        assert!(matches!(&fatal[0], StreamEvent::Fatal { .. }));
    }

    #[test]
    fn test_unknown_events_skipped() {
        let mut reader = EventReader::new(Framing::Text);
        let events = reader
            .feed(b"event: llm_token\ndata: {\"token\":\"x\"}\n\nevent: done\ndata: {}\n\n")
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], StreamEvent::Done));
    }
}
