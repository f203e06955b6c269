//! `UpstreamConnection` — per-session state machine bookkeeping owned by
//! `vsg-upstream::client::UpstreamClient` and mirrored here as plain data so
//! the orchestrator can inspect it without depending on the client crate.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Ready,
    Reconnecting,
    Closed,
    Error,
}

#[derive(Debug, Clone)]
pub struct PendingAudioChunk {
    pub sequence: u64,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PendingOutputChunk {
    pub sequence: u64,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UpstreamConnection {
    pub state: UpstreamConnectionState,
    pub retry_count: u32,
    pub pending_audio: VecDeque<PendingAudioChunk>,
    pub input_sequence: u64,
    pub output_sequence: u64,
    pub pending_output: VecDeque<PendingOutputChunk>,
}

impl Default for UpstreamConnection {
    fn default() -> Self {
        UpstreamConnection {
            state: UpstreamConnectionState::Disconnected,
            retry_count: 0,
            pending_audio: VecDeque::new(),
            input_sequence: 0,
            output_sequence: 0,
            pending_output: VecDeque::new(),
        }
    }
}

impl UpstreamConnection {
    pub fn next_input_sequence(&mut self) -> u64 {
        let seq = self.input_sequence;
        self.input_sequence += 1;
        seq
    }

    pub fn next_output_sequence(&mut self) -> u64 {
        let seq = self.output_sequence;
        self.output_sequence += 1;
        seq
    }

    pub fn enqueue_pending_audio(&mut self, sequence: u64, payload: Vec<u8>) {
        self.pending_audio
            .push_back(PendingAudioChunk { sequence, payload });
    }

    pub fn drain_pending_audio(&mut self) -> Vec<PendingAudioChunk> {
        self.pending_audio.drain(..).collect()
    }

    /// Idempotent regardless of prior buffer/turn state.
    pub fn clear_pending_output(&mut self) {
        self.pending_output.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_counters_are_monotonic() {
        let mut conn = UpstreamConnection::default();
        assert_eq!(conn.next_input_sequence(), 0);
        assert_eq!(conn.next_input_sequence(), 1);
        assert_eq!(conn.next_output_sequence(), 0);
        assert_eq!(conn.next_output_sequence(), 1);
    }

    #[test]
    fn pending_audio_flushes_in_fifo_order() {
        let mut conn = UpstreamConnection::default();
        conn.enqueue_pending_audio(0, vec![1]);
        conn.enqueue_pending_audio(1, vec![2]);
        let flushed = conn.drain_pending_audio();
        assert_eq!(flushed[0].sequence, 0);
        assert_eq!(flushed[1].sequence, 1);
        assert!(conn.pending_audio.is_empty());
    }

    #[test]
    fn clear_pending_output_is_idempotent() {
        let mut conn = UpstreamConnection::default();
        conn.clear_pending_output();
        conn.pending_output.push_back(PendingOutputChunk {
            sequence: 0,
            payload: vec![],
        });
        conn.clear_pending_output();
        conn.clear_pending_output();
        assert!(conn.pending_output.is_empty());
    }
}
