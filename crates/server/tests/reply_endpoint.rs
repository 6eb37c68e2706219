//! Endpoint-level flow: request in, framed event stream out.
//!
//! No provider credentials are configured here, so every synthesis job
//! fails fast with a segment-scoped error; the stream structure (segments,
//! per-segment errors, gated done) is what these tests pin down.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use futures::StreamExt;

use talkstream_client::EventReader;
use talkstream_config::Settings;
use talkstream_core::StreamEvent;
use talkstream_llm::ScriptedSource;
use talkstream_server::stream::reply_stream;
use talkstream_server::AppState;
use talkstream_transport::Framing;

async fn collect_events(
    state: AppState,
    headers: HeaderMap,
    body: &str,
    framing: Framing,
) -> Vec<StreamEvent> {
    let response = reply_stream(State(state), headers, Bytes::copy_from_slice(body.as_bytes())).await;

    let mut reader = EventReader::new(framing);
    let mut events = Vec::new();
    let mut body = response.into_body().into_data_stream();
    while let Some(chunk) = body.next().await {
        events.extend(reader.feed(&chunk.unwrap()).unwrap());
    }
    events
}

fn state_with_reply(deltas: &[&str]) -> AppState {
    AppState::with_source(
        Settings::default(),
        Arc::new(ScriptedSource::new(deltas.to_vec())),
    )
}

#[tokio::test]
async fn reply_stream_emits_segments_then_done() {
    let state = state_with_reply(&["第一文はこれです。", "第二文はこれです。"]);
    let body = r#"{"conversationTurns":[{"role":"user","text":"こんにちは"}]}"#;

    let events = collect_events(state, HeaderMap::new(), body, Framing::Text).await;

    let segment_ids: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Segment(s) => Some(s.id),
            _ => None,
        })
        .collect();
    assert_eq!(segment_ids, vec![1, 2]);

    // no credentials: each job fails in isolation, scoped to its id
    let mut error_ids: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::SegmentError { id, .. } => Some(*id),
            _ => None,
        })
        .collect();
    error_ids.sort_unstable();
    assert_eq!(error_ids, vec![1, 2]);

    assert!(matches!(events.last(), Some(StreamEvent::Done)));
}

#[tokio::test]
async fn reply_stream_announces_resolved_vendors() {
    let state = state_with_reply(&["はい。"]);
    let body = r#"{"conversationTurns":[{"role":"user","text":"やあ"}],"voiceSelector":{"providerKey":"Gemini"}}"#;

    let events = collect_events(state, HeaderMap::new(), body, Framing::Text).await;

    let marks: Vec<(String, String)> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Mark { key, value } => Some((key.clone(), value.clone())),
            _ => None,
        })
        .collect();

    assert!(marks.contains(&("llm_vendor".to_string(), "openai".to_string())));
    assert!(marks.contains(&("tts_vendor".to_string(), "gemini".to_string())));
}

#[tokio::test]
async fn unmatched_provider_key_falls_back_silently() {
    let state = state_with_reply(&["はい。"]);
    let body = r#"{"conversationTurns":[{"role":"user","text":"やあ"}],"voiceSelector":{"providerKey":"nijivoice"}}"#;

    let events = collect_events(state, HeaderMap::new(), body, Framing::Text).await;

    let marks: Vec<(String, String)> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Mark { key, value } => Some((key.clone(), value.clone())),
            _ => None,
        })
        .collect();

    // default provider, no fatal error about the unknown key
    assert!(marks.contains(&("tts_vendor".to_string(), "openai".to_string())));
    assert!(!events
        .iter()
        .any(|e| matches!(e, StreamEvent::Fatal { .. })));
}

#[tokio::test]
async fn malformed_body_is_one_error_and_nothing_else() {
    let state = state_with_reply(&["使われない文。"]);

    let events = collect_events(state, HeaderMap::new(), "{not json", Framing::Text).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], StreamEvent::Fatal { .. }));
}

#[tokio::test]
async fn binary_framing_negotiated_via_accept() {
    let state = state_with_reply(&["短い返事です。"]);
    let body = r#"{"conversationTurns":[{"role":"user","text":"やあ"}]}"#;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/octet-stream"),
    );

    let events = collect_events(state, headers, body, Framing::Binary).await;

    assert!(events
        .iter()
        .any(|e| matches!(e, StreamEvent::Segment(s) if s.id == 1)));
    assert!(matches!(events.last(), Some(StreamEvent::Done)));
}
