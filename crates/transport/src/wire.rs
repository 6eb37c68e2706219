//! Event-name and payload mapping shared by both framings

use serde_json::{json, Value};

use talkstream_core::StreamEvent;

/// Metadata payload for every event except audio, which each framing
/// handles its own way.
pub(crate) fn meta_payload(event: &StreamEvent) -> Option<(&'static str, Value)> {
    match event {
        StreamEvent::Mark { key, value } => Some(("mark", json!({ "k": key, "v": value }))),
        StreamEvent::MarkTime { key, t } => Some(("mark", json!({ "k": key, "t": t }))),
        StreamEvent::Ping { t } => Some(("ping", json!({ "t": t }))),
        StreamEvent::Segment(segment) => Some((
            "segment",
            json!({ "id": segment.id, "text": segment.text, "final": segment.is_final }),
        )),
        StreamEvent::SegmentError { id, message } => {
            Some(("error", json!({ "message": message, "id": id })))
        }
        StreamEvent::Fatal { message } => Some(("error", json!({ "message": message }))),
        StreamEvent::Done => Some(("done", json!({}))),
        StreamEvent::Audio(_) => None,
    }
}
