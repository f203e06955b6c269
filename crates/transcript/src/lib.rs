//! Transcription aggregator.

pub mod aggregator;
pub mod sink;

pub use aggregator::{AggregatorStats, HandleOutcome, TranscriptionAggregator};
pub use sink::{InMemoryTranscriptSink, JsonlTranscriptSink, TranscriptSink};
