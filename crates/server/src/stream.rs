//! Streaming reply endpoint
//!
//! One POST starts one reply stream. The response body carries the event
//! stream in the framing negotiated via the `Accept` header; the session
//! runs in its own task and stops admitting synthesis work the moment the
//! client goes away (the body channel closes).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::Response;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use talkstream_core::{EventSink, ReplyRequest, StreamEvent};
use talkstream_pipeline::{ReplySession, SessionConfig, SessionMeta};
use talkstream_transport::{ChannelSink, Framing};

use crate::state::AppState;

/// POST /api/reply
pub async fn reply_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let framing = negotiate_framing(&headers);
    let request_id = uuid::Uuid::new_v4();

    let (tx, rx) = mpsc::channel::<Bytes>(32);
    let sink = Arc::new(ChannelSink::new(framing, tx));

    match serde_json::from_slice::<ReplyRequest>(&body) {
        Ok(request) => {
            tracing::info!(
                %request_id,
                turns = request.conversation_turns.len(),
                provider = %request.voice_selector.provider_key,
                "reply stream started"
            );
            tokio::spawn(run_reply(state, request, sink));
        }
        Err(e) => {
            // malformed body: one error event, stream terminated, nothing
            // segmented or synthesized
            tracing::warn!(%request_id, error = %e, "malformed request body");
            tokio::spawn(async move {
                let _ = sink
                    .send(StreamEvent::Fatal {
                        message: format!("invalid request body: {}", e),
                    })
                    .await;
            });
        }
    }

    stream_response(rx, framing)
}

async fn run_reply(state: AppState, request: ReplyRequest, sink: Arc<ChannelSink>) {
    let synth = state.registry.select(&request.voice_selector.provider_key);

    let model = if request.model.is_empty() {
        state.config.llm.model.clone()
    } else {
        request.model
    };

    let deltas = match state.llm.stream_reply(&request.conversation_turns, &model).await {
        Ok(deltas) => deltas,
        Err(e) => {
            tracing::error!(error = %e, "generation source unavailable");
            let _ = sink
                .send(StreamEvent::Fatal {
                    message: e.to_string(),
                })
                .await;
            return;
        }
    };

    let meta = SessionMeta {
        model,
        llm_vendor: "openai".to_string(),
        tts_vendor: synth.kind().to_string(),
    };

    let config = SessionConfig {
        segmenter: state.config.segmenter.clone(),
        concurrency: state.config.synth.concurrency,
        barrier_timeout: Duration::from_millis(state.config.synth.barrier_timeout_ms),
        debug_time: state.config.debug_time,
    };

    let session = ReplySession::new(
        config,
        meta,
        synth,
        request.voice_selector.voice_key,
        sink,
    );
    session.run(deltas).await;
}

/// `Accept: application/octet-stream` selects the binary framing; anything
/// else gets the text framing.
pub(crate) fn negotiate_framing(headers: &HeaderMap) -> Framing {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if accept.contains("application/octet-stream") {
        Framing::Binary
    } else {
        Framing::Text
    }
}

fn stream_response(rx: mpsc::Receiver<Bytes>, framing: Framing) -> Response {
    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));

    Response::builder()
        .header(header::CONTENT_TYPE, framing.content_type())
        .header(header::CACHE_CONTROL, "no-cache, no-transform")
        .body(body)
        .expect("static response parts are valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::HeaderValue;

    #[test]
    fn test_framing_negotiation() {
        let mut headers = HeaderMap::new();
        assert_eq!(negotiate_framing(&headers), Framing::Text);

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        assert_eq!(negotiate_framing(&headers), Framing::Text);

        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/octet-stream"),
        );
        assert_eq!(negotiate_framing(&headers), Framing::Binary);
    }
}
