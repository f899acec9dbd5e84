//! Fact Repository Port - Interface for persisting what a customer told us.
//!
//! The engine fetches persisted facts when a conversation starts and writes
//! the user-relevant subset back after every fact-store mutation.
//! Implementations must guarantee at most one writer per conversation id.

use crate::domain::foundation::{ConversationId, Facts};

/// Errors that can occur during fact persistence
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Failed to serialize facts: {0}")]
    SerializationFailed(String),

    #[error("Failed to deserialize facts: {0}")]
    DeserializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Repository lock poisoned")]
    LockPoisoned,
}

/// Port for loading and saving per-conversation facts
pub trait FactRepository: Send + Sync {
    /// Fetch the persisted facts for a conversation
    ///
    /// # Returns
    /// The stored facts, or an empty map for a conversation never seen before
    ///
    /// # Errors
    /// Returns `RepositoryError` if the backing store cannot be read
    fn fetch_facts(&self, conversation_id: &ConversationId) -> Result<Facts, RepositoryError>;

    /// Replace the persisted facts for a conversation
    ///
    /// # Errors
    /// Returns `RepositoryError` if the facts cannot be written
    fn write_facts(
        &self,
        conversation_id: &ConversationId,
        facts: &Facts,
    ) -> Result<(), RepositoryError>;
}
