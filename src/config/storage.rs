//! Storage configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Where facts and transcripts are kept
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps, lost on exit
    #[default]
    Memory,
    /// YAML facts and JSON transcripts on disk
    File,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory for per-conversation fact files
    #[serde(default = "default_facts_dir")]
    pub facts_dir: PathBuf,

    /// Directory for per-conversation transcript files
    #[serde(default = "default_transcripts_dir")]
    pub transcripts_dir: PathBuf,
}

fn default_facts_dir() -> PathBuf {
    PathBuf::from("data/facts")
}

fn default_transcripts_dir() -> PathBuf {
    PathBuf::from("data/transcripts")
}

impl StorageConfig {
    pub fn is_file_backed(&self) -> bool {
        self.backend == StorageBackend::File
    }

    /// Validate storage configuration
    ///
    /// Directories only matter for the file backend.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.is_file_backed() {
            return Ok(());
        }
        if self.facts_dir.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("storage.facts_dir"));
        }
        if self.transcripts_dir.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("storage.transcripts_dir"));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            facts_dir: default_facts_dir(),
            transcripts_dir: default_transcripts_dir(),
        }
    }
}
