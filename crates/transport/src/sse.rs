//! Text framing
//!
//! Blank-line separated records; each record carries an `event:` line and
//! one or more `data:` lines whose concatenation is the JSON payload.
//! Audio travels as base64 text inside the `tts` payload.

use base64::Engine;
use bytes::Bytes;
use serde_json::json;

use talkstream_core::StreamEvent;

use crate::wire::meta_payload;
use crate::TransportError;

/// Encode one event as an SSE record.
pub fn encode_event(event: &StreamEvent) -> Bytes {
    let (name, payload) = match event {
        StreamEvent::Audio(chunk) => (
            "tts",
            json!({
                "id": chunk.id,
                "format": chunk.format.as_str(),
                "b64": base64::engine::general_purpose::STANDARD.encode(&chunk.bytes),
            }),
        ),
        other => meta_payload(other).expect("non-audio event has a payload"),
    };

    Bytes::from(format!("event: {}\ndata: {}\n\n", name, payload))
}

/// One parsed record: event name plus the joined data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseRecord {
    pub event: String,
    pub data: String,
}

/// Incremental record parser. Chunk boundaries may fall anywhere, including
/// inside a multi-byte character; bytes are buffered until a full record is
/// available.
#[derive(Default)]
pub struct SseParser {
    buf: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes; returns every record they completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseRecord>, TransportError> {
        self.buf.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(pos) = self.buf.windows(2).position(|w| w == b"\n\n") {
            let record: Vec<u8> = self.buf.drain(..pos + 2).collect();
            let record = std::str::from_utf8(&record[..pos])
                .map_err(|e| TransportError::Payload(format!("invalid utf-8: {}", e)))?;
            if let Some(parsed) = parse_record(record) {
                records.push(parsed);
            }
        }

        Ok(records)
    }
}

fn parse_record(record: &str) -> Option<SseRecord> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in record.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = Some(name.trim().to_string());
        } else if let Some(payload) = line.strip_prefix("data:") {
            data.push(payload.strip_prefix(' ').unwrap_or(payload));
        }
        // comment and unknown lines are ignored
    }

    if event.is_none() && data.is_empty() {
        return None;
    }

    Some(SseRecord {
        event: event.unwrap_or_else(|| "message".to_string()),
        data: data.join("\n"),
    })
}
