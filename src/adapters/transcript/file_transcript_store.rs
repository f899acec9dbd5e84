//! File-based Transcript Store Adapter
//!
//! Buffers entries in memory and, on flush, appends them to one JSON
//! document per conversation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::adapters::storage::file_stem;
use crate::domain::foundation::ConversationId;
use crate::ports::{TranscriptEntry, TranscriptError, TranscriptStore};

/// File-based transcript store
#[derive(Debug, Clone)]
pub struct FileTranscriptStore {
    base_path: PathBuf,
    pending: Arc<Mutex<HashMap<ConversationId, Vec<TranscriptEntry>>>>,
}

impl FileTranscriptStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn transcript_file_path(&self, conversation_id: &ConversationId) -> PathBuf {
        self.base_path
            .join(format!("{}.json", file_stem(conversation_id)))
    }

    /// Everything flushed so far for a conversation
    pub fn load(&self, conversation_id: &ConversationId) -> Result<Vec<TranscriptEntry>, TranscriptError> {
        let file_path = self.transcript_file_path(conversation_id);
        if !file_path.exists() {
            return Ok(Vec::new());
        }
        let json =
            fs::read_to_string(&file_path).map_err(|e| TranscriptError::IoError(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| TranscriptError::SerializationFailed(e.to_string()))
    }
}

impl TranscriptStore for FileTranscriptStore {
    fn append(
        &self,
        conversation_id: &ConversationId,
        entry: TranscriptEntry,
    ) -> Result<(), TranscriptError> {
        let mut pending = self.pending.lock().map_err(|_| TranscriptError::LockPoisoned)?;
        pending.entry(conversation_id.clone()).or_default().push(entry);
        Ok(())
    }

    fn flush(&self, conversation_id: &ConversationId) -> Result<(), TranscriptError> {
        let entries = {
            let mut pending = self.pending.lock().map_err(|_| TranscriptError::LockPoisoned)?;
            match pending.remove(conversation_id) {
                Some(entries) if !entries.is_empty() => entries,
                _ => return Ok(()),
            }
        };

        let mut document = self.load(conversation_id)?;
        document.extend(entries);

        fs::create_dir_all(&self.base_path).map_err(|e| TranscriptError::IoError(e.to_string()))?;
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| TranscriptError::SerializationFailed(e.to_string()))?;
        fs::write(self.transcript_file_path(conversation_id), json)
            .map_err(|e| TranscriptError::IoError(e.to_string()))?;

        debug!(
            conversation_id = %conversation_id,
            entries = document.len(),
            "Transcript flushed"
        );
        Ok(())
    }

    fn pending(&self, conversation_id: &ConversationId) -> Result<Vec<TranscriptEntry>, TranscriptError> {
        let pending = self.pending.lock().map_err(|_| TranscriptError::LockPoisoned)?;
        Ok(pending.get(conversation_id).cloned().unwrap_or_default())
    }
}
