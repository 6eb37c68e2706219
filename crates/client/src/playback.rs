//! Ordered playback queue
//!
//! Audio chunks complete out of order; playback must be strict ascending-id,
//! gapless, and never overlapping. A cursor tracks the next id eligible to
//! play; everything else waits in an id-keyed buffer. At most one playback
//! is active at any time.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;

use talkstream_core::{AudioChunk, SegmentId};

use crate::ClientError;

/// The exclusive playback resource. `play` resolves when the chunk has
/// finished playing; implementations must release the device on error paths
/// as well.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, chunk: &AudioChunk) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

/// Cursor-gated ordering state machine. Pure state: the caller owns the
/// actual playback resource and reports completions back.
pub struct PlaybackQueue {
    next_expected: SegmentId,
    state: PlaybackState,
    buffered: BTreeMap<SegmentId, AudioChunk>,
    /// Ids announced as failed; the cursor steps over them
    missing: HashSet<SegmentId>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self {
            next_expected: 1,
            state: PlaybackState::Idle,
            buffered: BTreeMap::new(),
            missing: HashSet::new(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn next_expected(&self) -> SegmentId {
        self.next_expected
    }

    pub fn is_drained(&self) -> bool {
        self.state == PlaybackState::Idle && self.buffered.is_empty()
    }

    /// A chunk arrived. Returns the chunk to start playing now, if any.
    pub fn on_chunk(&mut self, chunk: AudioChunk) -> Option<AudioChunk> {
        self.buffered.insert(chunk.id, chunk);
        if self.state == PlaybackState::Idle {
            self.advance()
        } else {
            None
        }
    }

    /// The active playback finished (or failed). Advances the cursor by one
    /// and returns the next chunk to play if it has already arrived.
    pub fn on_complete(&mut self) -> Option<AudioChunk> {
        self.state = PlaybackState::Idle;
        self.next_expected += 1;
        self.advance()
    }

    /// Synthesis for `id` failed server-side: no audio will ever arrive for
    /// it, so the cursor must not wait on it.
    pub fn on_missing(&mut self, id: SegmentId) -> Option<AudioChunk> {
        self.missing.insert(id);
        if self.state == PlaybackState::Idle {
            self.advance()
        } else {
            None
        }
    }

    /// The stream is over; nothing new will arrive. Jumps the cursor over
    /// any remaining gap so buffered trailing audio still drains in order.
    pub fn on_stream_end(&mut self) -> Option<AudioChunk> {
        if self.state != PlaybackState::Idle {
            return None;
        }
        if let Some((&first, _)) = self.buffered.iter().next() {
            if first > self.next_expected {
                self.next_expected = first;
            }
        }
        self.advance()
    }

    fn advance(&mut self) -> Option<AudioChunk> {
        loop {
            if self.missing.remove(&self.next_expected) {
                self.next_expected += 1;
                continue;
            }
            if let Some(chunk) = self.buffered.remove(&self.next_expected) {
                self.state = PlaybackState::Playing;
                return Some(chunk);
            }
            return None;
        }
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bytes::Bytes;
    use talkstream_core::AudioFormat;

    fn chunk(id: SegmentId) -> AudioChunk {
        AudioChunk {
            id,
            format: AudioFormat::Wav,
            bytes: Bytes::from(vec![id as u8]),
        }
    }

    #[test]
    fn test_out_of_order_arrival_plays_in_order() {
        let mut queue = PlaybackQueue::new();

        // arrival order 3, 1, 2; playback must be 1, 2, 3
        assert!(queue.on_chunk(chunk(3)).is_none());
        let first = queue.on_chunk(chunk(1)).unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(queue.state(), PlaybackState::Playing);

        // 2 arrives while 1 is playing: buffered, no overlap
        assert!(queue.on_chunk(chunk(2)).is_none());

        assert_eq!(queue.on_complete().unwrap().id, 2);
        assert_eq!(queue.on_complete().unwrap().id, 3);
        assert!(queue.on_complete().is_none());
        assert!(queue.is_drained());
    }

    #[test]
    fn test_gap_keeps_queue_idle() {
        let mut queue = PlaybackQueue::new();

        assert!(queue.on_chunk(chunk(2)).is_none());
        assert_eq!(queue.state(), PlaybackState::Idle);

        // 1 finally arrives and playback starts
        assert_eq!(queue.on_chunk(chunk(1)).unwrap().id, 1);
    }

    #[test]
    fn test_missing_id_is_stepped_over() {
        let mut queue = PlaybackQueue::new();

        assert_eq!(queue.on_chunk(chunk(1)).unwrap().id, 1);
        assert!(queue.on_chunk(chunk(3)).is_none());

        // synthesis of 2 failed; completing 1 moves straight to 3
        queue.on_missing(2);
        assert_eq!(queue.on_complete().unwrap().id, 3);
    }

    #[test]
    fn test_missing_cursor_while_idle() {
        let mut queue = PlaybackQueue::new();

        assert!(queue.on_chunk(chunk(2)).is_none());
        // 1 will never arrive
        assert_eq!(queue.on_missing(1).unwrap().id, 2);
    }

    #[test]
    fn test_stream_end_drains_trailing_buffer() {
        let mut queue = PlaybackQueue::new();

        assert_eq!(queue.on_chunk(chunk(1)).unwrap().id, 1);
        assert!(queue.on_chunk(chunk(4)).is_none());
        assert!(queue.on_complete().is_none()); // waiting on 2

        // stream closed without 2 or 3 ever arriving
        assert_eq!(queue.on_stream_end().unwrap().id, 4);
        assert!(queue.on_complete().is_none());
        assert!(queue.is_drained());
    }

    #[test]
    fn test_single_active_playback() {
        let mut queue = PlaybackQueue::new();

        assert_eq!(queue.on_chunk(chunk(1)).unwrap().id, 1);
        // while playing, an eligible successor never starts a second playback
        assert!(queue.on_chunk(chunk(2)).is_none());
        assert!(queue.on_missing(99).is_none());
        assert_eq!(queue.state(), PlaybackState::Playing);
    }
}
