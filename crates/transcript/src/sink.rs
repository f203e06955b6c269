//! `TranscriptSink`: persistence seam for the (out-of-scope) persistence
//! layer's transcript records, plus a JSONL file-backed default
//! implementation grounded on the donor's append-only transcript writer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use vsg_domain::error::{Error, Result};
use vsg_domain::session::{ConversationTurn, Speaker};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TranscriptLine {
    timestamp: chrono::DateTime<chrono::Utc>,
    speaker: Speaker,
    text: String,
    is_final: bool,
}

/// Fire-and-forget on the hot path: a failed write is logged, never
/// propagated back into the audio/transcript relay.
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    async fn append(&self, session_id: &str, turn: &ConversationTurn) -> Result<()>;
    fn read(&self, session_id: &str) -> Result<Vec<ConversationTurn>>;
}

pub struct JsonlTranscriptSink {
    root: PathBuf,
}

impl JsonlTranscriptSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonlTranscriptSink { root: root.into() }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.root.join(format!("{session_id}.jsonl"))
    }
}

#[async_trait]
impl TranscriptSink for JsonlTranscriptSink {
    async fn append(&self, session_id: &str, turn: &ConversationTurn) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Error::DbWriteFailed(e.to_string()))?;
        let line = TranscriptLine {
            timestamp: turn.timestamp,
            speaker: turn.speaker,
            text: turn.text.clone(),
            is_final: turn.is_final,
        };
        let mut serialized = serde_json::to_string(&line).map_err(|e| Error::DbWriteFailed(e.to_string()))?;
        serialized.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(session_id))
            .await
            .map_err(|e| Error::DbWriteFailed(e.to_string()))?;
        file.write_all(serialized.as_bytes())
            .await
            .map_err(|e| Error::DbWriteFailed(e.to_string()))?;
        Ok(())
    }

    fn read(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let path = self.path_for(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_lines(&path)
    }
}

fn read_lines(path: &Path) -> Result<Vec<ConversationTurn>> {
    let file = std::fs::File::open(path).map_err(|e| Error::Internal(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut turns = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(line = lineno, error = %e, "skipping unreadable transcript line");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TranscriptLine>(&line) {
            Ok(parsed) => turns.push(ConversationTurn {
                speaker: parsed.speaker,
                text: parsed.text,
                timestamp: parsed.timestamp,
                is_final: parsed.is_final,
            }),
            Err(e) => {
                tracing::warn!(line = lineno, error = %e, "skipping malformed transcript line");
            }
        }
    }
    Ok(turns)
}

/// In-memory sink for tests that should not touch the filesystem.
pub struct InMemoryTranscriptSink {
    lines: parking_lot::Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

impl InMemoryTranscriptSink {
    pub fn new() -> Self {
        InMemoryTranscriptSink {
            lines: parking_lot::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryTranscriptSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptSink for InMemoryTranscriptSink {
    async fn append(&self, session_id: &str, turn: &ConversationTurn) -> Result<()> {
        let line = TranscriptLine {
            timestamp: turn.timestamp,
            speaker: turn.speaker,
            text: turn.text.clone(),
            is_final: turn.is_final,
        };
        let mut serialized = serde_json::to_vec(&line).map_err(|e| Error::DbWriteFailed(e.to_string()))?;
        serialized.push(b'\n');
        let mut guard = self.lines.lock();
        std::io::Write::write_all(guard.entry(session_id.to_string()).or_default(), &serialized).ok();
        Ok(())
    }

    fn read(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let guard = self.lines.lock();
        let Some(bytes) = guard.get(session_id) else {
            return Ok(Vec::new());
        };
        let mut turns = Vec::new();
        for line in bytes.split(|b| *b == b'\n') {
            if line.is_empty() {
                continue;
            }
            if let Ok(parsed) = serde_json::from_slice::<TranscriptLine>(line) {
                turns.push(ConversationTurn {
                    speaker: parsed.speaker,
                    text: parsed.text,
                    timestamp: parsed.timestamp,
                    is_final: parsed.is_final,
                });
            }
        }
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use vsg_domain::session::Speaker;

    fn turn(text: &str) -> ConversationTurn {
        ConversationTurn {
            speaker: Speaker::User,
            text: text.to_string(),
            timestamp: chrono::Utc::now(),
            is_final: true,
        }
    }

    #[tokio::test]
    async fn jsonl_sink_round_trips_a_turn() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlTranscriptSink::new(dir.path());
        sink.append("s1", &turn("hello")).await.unwrap();
        let turns = sink.read("s1").unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "hello");
    }

    #[tokio::test]
    async fn jsonl_sink_skips_malformed_lines_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlTranscriptSink::new(dir.path());
        sink.append("s1", &turn("hello")).await.unwrap();
        let path = dir.path().join("s1.jsonl");
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json").unwrap();
        sink.append("s1", &turn("world")).await.unwrap();

        let turns = sink.read("s1").unwrap();
        assert_eq!(turns.len(), 2);
    }

    #[tokio::test]
    async fn in_memory_sink_round_trips() {
        let sink = InMemoryTranscriptSink::new();
        sink.append("s1", &turn("hi")).await.unwrap();
        let turns = sink.read("s1").unwrap();
        assert_eq!(turns[0].text, "hi");
    }
}
