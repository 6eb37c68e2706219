//! Core types for the talkstream reply pipeline
//!
//! This crate provides foundational types used across all other crates:
//! - Segment and audio chunk types
//! - Stream event catalogue and the emitter seam
//! - Conversation/request types
//! - Error types

pub mod conversation;
pub mod error;
pub mod event;
pub mod segment;

pub use conversation::{ReplyRequest, Turn, TurnRole, VoiceSelector};
pub use error::{DeltaStream, Error, Result};
pub use event::{EventSink, SinkClosed, StreamEvent};
pub use segment::{AudioChunk, AudioFormat, Segment, SegmentId};
