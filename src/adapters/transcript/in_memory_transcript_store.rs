//! In-Memory Transcript Store Adapter
//!
//! Buffers entries per conversation and moves them to an in-memory
//! archive on flush.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::foundation::ConversationId;
use crate::ports::{TranscriptEntry, TranscriptError, TranscriptStore};

#[derive(Debug, Default)]
struct Transcripts {
    pending: HashMap<ConversationId, Vec<TranscriptEntry>>,
    flushed: HashMap<ConversationId, Vec<TranscriptEntry>>,
}

/// In-memory transcript store
#[derive(Debug, Clone, Default)]
pub struct InMemoryTranscriptStore {
    inner: Arc<Mutex<Transcripts>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries persisted by earlier flushes
    pub fn flushed(&self, conversation_id: &ConversationId) -> Vec<TranscriptEntry> {
        self.inner
            .lock()
            .map(|t| t.flushed.get(conversation_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

impl TranscriptStore for InMemoryTranscriptStore {
    fn append(
        &self,
        conversation_id: &ConversationId,
        entry: TranscriptEntry,
    ) -> Result<(), TranscriptError> {
        let mut inner = self.inner.lock().map_err(|_| TranscriptError::LockPoisoned)?;
        inner
            .pending
            .entry(conversation_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    fn flush(&self, conversation_id: &ConversationId) -> Result<(), TranscriptError> {
        let mut inner = self.inner.lock().map_err(|_| TranscriptError::LockPoisoned)?;
        if let Some(entries) = inner.pending.remove(conversation_id) {
            inner
                .flushed
                .entry(conversation_id.clone())
                .or_default()
                .extend(entries);
        }
        Ok(())
    }

    fn pending(&self, conversation_id: &ConversationId) -> Result<Vec<TranscriptEntry>, TranscriptError> {
        let inner = self.inner.lock().map_err(|_| TranscriptError::LockPoisoned)?;
        Ok(inner.pending.get(conversation_id).cloned().unwrap_or_default())
    }
}
