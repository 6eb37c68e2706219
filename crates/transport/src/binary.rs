//! Binary framing
//!
//! Every unit is `[type:u8][len:u32 LE][payload]`. Type 0x01 payloads are
//! UTF-8 JSON metadata tagged with an `event` field; type 0x02 payloads are
//! raw audio bytes, announced by the `tts_start` metadata unit that
//! immediately precedes them.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde_json::{json, Value};

use talkstream_core::StreamEvent;

use crate::wire::meta_payload;
use crate::TransportError;

/// Metadata JSON unit
pub const FRAME_META: u8 = 0x01;
/// Raw audio unit
pub const FRAME_AUDIO: u8 = 0x02;

const HEADER_LEN: usize = 5;

fn put_frame(buf: &mut BytesMut, frame_type: u8, payload: &[u8]) {
    buf.put_u8(frame_type);
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
}

fn meta_bytes(name: &str, payload: &Value) -> Vec<u8> {
    // {"event": name, ...payload}, matching the reader's expectations
    let mut object = json!({ "event": name });
    if let (Some(dst), Some(src)) = (object.as_object_mut(), payload.as_object()) {
        for (key, value) in src {
            dst.insert(key.clone(), value.clone());
        }
    }
    object.to_string().into_bytes()
}

/// Encode one event. An audio event becomes its `tts_start` metadata unit
/// and the audio unit in a single buffer so concurrent writers can never
/// interleave between the pair.
pub fn encode_event(event: &StreamEvent) -> Bytes {
    let mut buf = BytesMut::new();

    match event {
        StreamEvent::Audio(chunk) => {
            let meta = meta_bytes(
                "tts_start",
                &json!({
                    "id": chunk.id,
                    "format": chunk.format.as_str(),
                    "size": chunk.bytes.len(),
                }),
            );
            put_frame(&mut buf, FRAME_META, &meta);
            put_frame(&mut buf, FRAME_AUDIO, &chunk.bytes);
        }
        other => {
            let (name, payload) = meta_payload(other).expect("non-audio event has a payload");
            put_frame(&mut buf, FRAME_META, &meta_bytes(name, &payload));
        }
    }

    buf.freeze()
}

/// One decoded unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Metadata JSON, `event` field included
    Meta(Value),
    /// Raw audio payload
    Audio(Bytes),
}

/// Incremental frame decoder; tolerates arbitrary chunk boundaries.
#[derive(Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed received bytes; returns every frame they completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Frame>, TransportError> {
        self.buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        loop {
            if self.buf.len() < HEADER_LEN {
                break;
            }

            let frame_type = self.buf[0];
            let len = u32::from_le_bytes([self.buf[1], self.buf[2], self.buf[3], self.buf[4]])
                as usize;

            if self.buf.len() < HEADER_LEN + len {
                break;
            }

            self.buf.advance(HEADER_LEN);
            let payload = self.buf.split_to(len).freeze();

            match frame_type {
                FRAME_META => {
                    let value: Value = serde_json::from_slice(&payload)
                        .map_err(|e| TransportError::Payload(format!("bad metadata: {}", e)))?;
                    frames.push(Frame::Meta(value));
                }
                FRAME_AUDIO => frames.push(Frame::Audio(payload)),
                other => {
                    return Err(TransportError::Frame(format!(
                        "unknown frame type 0x{:02x}",
                        other
                    )));
                }
            }
        }

        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use talkstream_core::{AudioChunk, AudioFormat, Segment};

    #[test]
    fn test_meta_frame_roundtrip() {
        let event = StreamEvent::Segment(Segment {
            id: 2,
            text: "テスト。".to_string(),
            is_final: false,
            hash: String::new(),
        });
        let encoded = encode_event(&event);

        assert_eq!(encoded[0], FRAME_META);
        let len = u32::from_le_bytes([encoded[1], encoded[2], encoded[3], encoded[4]]) as usize;
        assert_eq!(encoded.len(), HEADER_LEN + len);

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&encoded).unwrap();
        assert_eq!(frames.len(), 1);
        match &frames[0] {
            Frame::Meta(value) => {
                assert_eq!(value["event"], "segment");
                assert_eq!(value["id"], 2);
                assert_eq!(value["final"], false);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_audio_event_is_one_atomic_buffer() {
        let event = StreamEvent::Audio(AudioChunk {
            id: 5,
            format: AudioFormat::Wav,
            bytes: Bytes::from_static(&[9, 8, 7, 6]),
        });
        let encoded = encode_event(&event);

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&encoded).unwrap();
        assert_eq!(frames.len(), 2);

        match &frames[0] {
            Frame::Meta(value) => {
                assert_eq!(value["event"], "tts_start");
                assert_eq!(value["id"], 5);
                assert_eq!(value["format"], "wav");
                assert_eq!(value["size"], 4);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
        assert_eq!(frames[1], Frame::Audio(Bytes::from_static(&[9, 8, 7, 6])));
    }

    #[test]
    fn test_decoder_survives_split_feeds() {
        let event = StreamEvent::Audio(AudioChunk {
            id: 1,
            format: AudioFormat::Pcm16le,
            bytes: Bytes::from(vec![0u8; 64]),
        });
        let encoded = encode_event(&event);

        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        // feed three bytes at a time
        for chunk in encoded.chunks(3) {
            frames.extend(decoder.feed(chunk).unwrap());
        }

        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], Frame::Meta(_)));
        assert!(matches!(&frames[1], Frame::Audio(bytes) if bytes.len() == 64));
    }

    #[test]
    fn test_unknown_frame_type_rejected() {
        let mut decoder = FrameDecoder::new();
        let err = decoder.feed(&[0x07, 1, 0, 0, 0, 0xAA]);
        assert!(err.is_err());
    }
}
