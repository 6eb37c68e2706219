//! Synthesis worker pool
//!
//! Bounded fan-out: admitted jobs queue FIFO and at most `concurrency` run
//! at once. A finishing job immediately frees its slot for the next queued
//! one. Admission never blocks the producer path.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use talkstream_core::{EventSink, SegmentId, StreamEvent};

use crate::barrier::CompletionBarrier;
use crate::synth::{normalize, Synthesizer};
use crate::PipelineError;

/// One synthesis job: exactly one per admitted segment, no retries.
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    pub segment_id: SegmentId,
    pub text: String,
    pub voice: String,
}

/// Per-request worker pool. Dropping it stops admission; jobs already
/// admitted run to completion.
pub struct WorkerPool {
    jobs: mpsc::UnboundedSender<SynthesisJob>,
    barrier: CompletionBarrier,
}

impl WorkerPool {
    /// Spawn the dispatcher. Completed audio (or a segment-scoped error) is
    /// written straight to `sink`; the write always happens before the job
    /// is counted done, so a drained barrier means every result is at least
    /// in flight to the client.
    pub fn spawn(
        synth: Arc<dyn Synthesizer>,
        concurrency: usize,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let (jobs, mut queue) = mpsc::unbounded_channel::<SynthesisJob>();
        let barrier = CompletionBarrier::new();
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        let pool_barrier = barrier.clone();
        tokio::spawn(async move {
            while let Some(job) = queue.recv().await {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };

                let synth = synth.clone();
                let sink = sink.clone();
                let barrier = pool_barrier.clone();

                tokio::spawn(async move {
                    let _permit = permit; // held for the lifetime of the job
                    let id = job.segment_id;
                    tracing::debug!(id, text = %job.text, "synthesis started");

                    let result = synth
                        .synthesize(&job.text, &job.voice)
                        .await
                        .and_then(|raw| normalize(raw, id));

                    let event = match result {
                        Ok(chunk) => {
                            tracing::debug!(id, bytes = chunk.bytes.len(), "synthesis completed");
                            StreamEvent::Audio(chunk)
                        }
                        Err(e) => {
                            tracing::warn!(id, error = %e, "synthesis failed");
                            StreamEvent::SegmentError {
                                id,
                                message: format!("TTS failed: {}", e),
                            }
                        }
                    };

                    let _ = sink.send(event).await;
                    barrier.done();
                });
            }
        });

        Self { jobs, barrier }
    }

    /// Queue a job. Registers it with the barrier before it is visible to
    /// the dispatcher.
    pub fn admit(&self, job: SynthesisJob) -> Result<(), PipelineError> {
        self.barrier.add();
        self.jobs.send(job).map_err(|_| {
            self.barrier.done();
            PipelineError::ChannelClosed
        })
    }

    pub fn barrier(&self) -> &CompletionBarrier {
        &self.barrier
    }
}
