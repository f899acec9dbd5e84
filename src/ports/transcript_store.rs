//! Transcript Store Port - Interface for recording utterance/reply pairs.
//!
//! Entries accumulate per conversation and are only persisted when the
//! caller explicitly flushes.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, TurnId};

/// One request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub turn_id: TurnId,
    pub received: String,
    pub sent: String,
    pub at: NaiveDateTime,
}

/// Errors that can occur while recording transcripts
#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("Failed to serialize transcript: {0}")]
    SerializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Transcript lock poisoned")]
    LockPoisoned,
}

/// Port for the conversation transcript
pub trait TranscriptStore: Send + Sync {
    /// Buffer one exchange for a conversation
    fn append(
        &self,
        conversation_id: &ConversationId,
        entry: TranscriptEntry,
    ) -> Result<(), TranscriptError>;

    /// Persist and clear everything buffered for a conversation
    ///
    /// Flushing a conversation with nothing buffered is a no-op.
    fn flush(&self, conversation_id: &ConversationId) -> Result<(), TranscriptError>;

    /// Entries buffered since the last flush
    fn pending(&self, conversation_id: &ConversationId) -> Result<Vec<TranscriptEntry>, TranscriptError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_entry_serializes_to_json() {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let entry = TranscriptEntry {
            turn_id: TurnId::new(),
            received: "上海".to_string(),
            sent: "好的".to_string(),
            at,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"received\":\"上海\""));
        assert!(json.contains("2024-05-01T09:30:00"));
    }
}
