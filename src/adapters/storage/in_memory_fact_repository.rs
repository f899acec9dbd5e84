//! In-Memory Fact Repository Adapter
//!
//! Keeps persisted facts in a process-local map.
//! Useful for testing and the console driver.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::foundation::{ConversationId, Facts};
use crate::ports::{FactRepository, RepositoryError};

/// In-memory storage for conversation facts
#[derive(Debug, Clone, Default)]
pub struct InMemoryFactRepository {
    facts: Arc<RwLock<HashMap<ConversationId, Facts>>>,
}

impl InMemoryFactRepository {
    /// Create a new, empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a conversation with previously known facts
    pub fn with_facts(self, conversation_id: ConversationId, facts: Facts) -> Self {
        if let Ok(mut map) = self.facts.write() {
            map.insert(conversation_id, facts);
        }
        self
    }

    /// Number of conversations with stored facts
    pub fn conversation_count(&self) -> usize {
        self.facts.read().map(|map| map.len()).unwrap_or(0)
    }
}

impl FactRepository for InMemoryFactRepository {
    fn fetch_facts(&self, conversation_id: &ConversationId) -> Result<Facts, RepositoryError> {
        let map = self.facts.read().map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(map.get(conversation_id).cloned().unwrap_or_default())
    }

    fn write_facts(
        &self,
        conversation_id: &ConversationId,
        facts: &Facts,
    ) -> Result<(), RepositoryError> {
        let mut map = self.facts.write().map_err(|_| RepositoryError::LockPoisoned)?;
        map.insert(conversation_id.clone(), facts.clone());
        Ok(())
    }
}
