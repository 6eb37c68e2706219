//! Per-request orchestration
//!
//! One [`ReplySession`] owns one segmenter, sequencer and worker pool for
//! the lifetime of a single streamed reply. Nothing here is shared across
//! requests.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use talkstream_core::{DeltaStream, EventSink, StreamEvent};

use crate::pool::{SynthesisJob, WorkerPool};
use crate::segmenter::{Segmenter, SegmenterConfig};
use crate::sequencer::Sequencer;
use crate::synth::Synthesizer;

/// Resolved identity marks announced at stream start.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub model: String,
    pub llm_vendor: String,
    pub tts_vendor: String,
}

/// Per-session tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub segmenter: SegmenterConfig,
    pub concurrency: usize,
    pub barrier_timeout: Duration,
    pub debug_time: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            concurrency: 2,
            barrier_timeout: Duration::from_millis(20_000),
            debug_time: false,
        }
    }
}

/// Drives one reply: deltas in, ordered events out.
pub struct ReplySession {
    config: SessionConfig,
    meta: SessionMeta,
    synth: Arc<dyn Synthesizer>,
    voice: String,
    sink: Arc<dyn EventSink>,
}

impl ReplySession {
    pub fn new(
        config: SessionConfig,
        meta: SessionMeta,
        synth: Arc<dyn Synthesizer>,
        voice: String,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let voice = if voice.is_empty() || voice == "default" {
            synth.default_voice().to_string()
        } else {
            voice
        };

        Self {
            config,
            meta,
            synth,
            voice,
            sink,
        }
    }

    /// Consume the delta stream to completion. Every outcome is reported
    /// through the sink; a closed sink (client gone) stops all further
    /// admission.
    pub async fn run(self, mut deltas: DeltaStream) {
        if !self.announce().await {
            return;
        }

        let pool = WorkerPool::spawn(
            self.synth.clone(),
            self.config.concurrency,
            self.sink.clone(),
        );
        let mut segmenter = Segmenter::new(self.config.segmenter.clone());
        let mut sequencer = Sequencer::new();
        let mut first_tts_marked = false;

        while let Some(item) = deltas.next().await {
            match item {
                Ok(delta) => {
                    for text in segmenter.push(&delta) {
                        if !self
                            .emit_segment(&pool, &mut sequencer, text, false, &mut first_tts_marked)
                            .await
                        {
                            return;
                        }
                    }
                }
                Err(e) => {
                    // fatal: already-segmented text is abandoned, no done
                    tracing::error!(error = %e, "generation source failed");
                    let _ = self
                        .sink
                        .send(StreamEvent::Fatal {
                            message: e.to_string(),
                        })
                        .await;
                    return;
                }
            }
        }

        if let Some(tail) = segmenter.finish() {
            if !self
                .emit_segment(&pool, &mut sequencer, tail, true, &mut first_tts_marked)
                .await
            {
                return;
            }
        }

        let barrier = pool.barrier().clone();
        drop(pool); // no further admissions

        if !barrier.wait(self.config.barrier_timeout).await {
            tracing::warn!(
                outstanding = barrier.outstanding(),
                "closing stream with synthesis still outstanding"
            );
        }

        let _ = self.sink.send(StreamEvent::Done).await;
    }

    /// Emit the identity marks and, when enabled, the timing baseline.
    async fn announce(&self) -> bool {
        let marks = [
            ("model", self.meta.model.as_str()),
            ("llm_vendor", self.meta.llm_vendor.as_str()),
            ("tts_vendor", self.meta.tts_vendor.as_str()),
        ];
        for (key, value) in marks {
            let event = StreamEvent::Mark {
                key: key.to_string(),
                value: value.to_string(),
            };
            if self.sink.send(event).await.is_err() {
                return false;
            }
        }

        if self.config.debug_time {
            let t = chrono::Utc::now().timestamp_millis();
            let _ = self.sink.send(StreamEvent::Ping { t }).await;
            let _ = self
                .sink
                .send(StreamEvent::MarkTime {
                    key: "llm_start".to_string(),
                    t,
                })
                .await;
        }

        true
    }

    /// Sequence one flushed text and hand it to the pool. Returns false when
    /// the client is gone and the session should stop.
    async fn emit_segment(
        &self,
        pool: &WorkerPool,
        sequencer: &mut Sequencer,
        text: String,
        is_final: bool,
        first_tts_marked: &mut bool,
    ) -> bool {
        let Some(segment) = sequencer.admit(&text, is_final) else {
            return true;
        };

        let job = SynthesisJob {
            segment_id: segment.id,
            text: segment.text.clone(),
            voice: self.voice.clone(),
        };

        // metadata always precedes its audio
        if self.sink.send(StreamEvent::Segment(segment)).await.is_err() {
            tracing::info!("client disconnected, stopping admission");
            return false;
        }

        if self.config.debug_time && !*first_tts_marked {
            *first_tts_marked = true;
            let _ = self
                .sink
                .send(StreamEvent::MarkTime {
                    key: "tts_first_byte".to_string(),
                    t: chrono::Utc::now().timestamp_millis(),
                })
                .await;
        }

        pool.admit(job).is_ok()
    }
}
