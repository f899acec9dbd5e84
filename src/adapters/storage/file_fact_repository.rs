//! File-based Fact Repository Adapter
//!
//! Stores each conversation's facts as one YAML file on disk.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::foundation::{ConversationId, Facts};
use crate::ports::{FactRepository, RepositoryError};

/// File-based storage for conversation facts
#[derive(Debug, Clone)]
pub struct FileFactRepository {
    base_path: PathBuf,
}

impl FileFactRepository {
    /// Create a new repository rooted at `base_path`
    ///
    /// # Example
    /// ```ignore
    /// let repo = FileFactRepository::new("./data/facts");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    /// Get the facts file path for a conversation
    fn facts_file_path(&self, conversation_id: &ConversationId) -> PathBuf {
        self.base_path
            .join(format!("{}.yaml", file_stem(conversation_id)))
    }
}

/// Conversation ids are free text. ASCII letters, digits and `-` are kept;
/// every other byte becomes `_xx` (lowercase hex), so distinct ids never
/// share a file.
pub(crate) fn file_stem(conversation_id: &ConversationId) -> String {
    let mut stem = String::with_capacity(conversation_id.as_str().len());
    for byte in conversation_id.as_str().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            let _ = write!(stem, "_{:02x}", byte);
        }
    }
    stem
}

impl FactRepository for FileFactRepository {
    fn fetch_facts(&self, conversation_id: &ConversationId) -> Result<Facts, RepositoryError> {
        let file_path = self.facts_file_path(conversation_id);
        if !file_path.exists() {
            return Ok(Facts::new());
        }

        let yaml =
            fs::read_to_string(&file_path).map_err(|e| RepositoryError::IoError(e.to_string()))?;

        serde_yaml::from_str(&yaml).map_err(|e| RepositoryError::DeserializationFailed(e.to_string()))
    }

    fn write_facts(
        &self,
        conversation_id: &ConversationId,
        facts: &Facts,
    ) -> Result<(), RepositoryError> {
        fs::create_dir_all(&self.base_path).map_err(|e| RepositoryError::IoError(e.to_string()))?;

        let yaml = serde_yaml::to_string(facts)
            .map_err(|e| RepositoryError::SerializationFailed(e.to_string()))?;

        fs::write(self.facts_file_path(conversation_id), yaml)
            .map_err(|e| RepositoryError::IoError(e.to_string()))
    }
}
