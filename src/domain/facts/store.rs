//! Per-conversation fact store.

use chrono::{Datelike, Timelike};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::catalog::Catalog;
use crate::domain::foundation::{ConversationId, Facts};
use crate::ports::{Clock, FactRepository, RepositoryError};

/// Server-observed facts stamped after every merge.
pub const SERVER_HOUR: &str = "state_curr_hour";
pub const SERVER_MONTH: &str = "state_month";
pub const SERVER_DAY: &str = "state_curr_day";

/// Everything known about one conversation.
///
/// The store holds explicit customer facts, server-stamped facts and
/// derived secondary slots. Vault enrichment only ever appears in
/// [`FactStore::snapshot`]; the stored facts are never enriched in place.
pub struct FactStore {
    conversation_id: ConversationId,
    facts: Facts,
    catalog: Arc<Catalog>,
    repository: Arc<dyn FactRepository>,
    clock: Arc<dyn Clock>,
}

impl FactStore {
    /// Creates an empty store without touching the repository.
    pub fn new(
        conversation_id: ConversationId,
        catalog: Arc<Catalog>,
        repository: Arc<dyn FactRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conversation_id,
            facts: Facts::new(),
            catalog,
            repository,
            clock,
        }
    }

    /// Creates a store seeded with the facts persisted for `conversation_id`.
    pub fn for_conversation(
        conversation_id: ConversationId,
        catalog: Arc<Catalog>,
        repository: Arc<dyn FactRepository>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RepositoryError> {
        let previous = repository.fetch_facts(&conversation_id)?;
        debug!(
            conversation_id = %conversation_id,
            known_facts = previous.len(),
            "Seeding fact store from repository"
        );
        let mut store = Self::new(conversation_id, catalog, repository, clock);
        store.log(previous, true)?;
        Ok(store)
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Stored facts without vault enrichment.
    pub fn facts(&self) -> &Facts {
        &self.facts
    }

    /// Merges `new_facts` into the store.
    ///
    /// Empty-string values are skipped. Without `overwrite`, keys that are
    /// already known are kept. After merging, secondary slots are
    /// re-derived, server facts stamped and the user facts persisted.
    pub fn log(&mut self, new_facts: Facts, overwrite: bool) -> Result<(), RepositoryError> {
        for (key, value) in new_facts {
            if value.is_blank() {
                continue;
            }
            if !overwrite && self.facts.contains(&key) {
                continue;
            }
            self.facts.insert(key, value);
        }

        self.derive_secondary_slots();
        self.stamp_server_facts();
        self.persist()
    }

    /// Removes the given keys and persists the result.
    pub fn clear(&mut self, keys: &[String]) -> Result<(), RepositoryError> {
        if keys.is_empty() {
            return Ok(());
        }
        for key in keys {
            self.facts.remove(key);
        }
        debug!(cleared = ?keys, "Facts cleared");
        self.persist()
    }

    /// Current facts plus vault-derived facts.
    pub fn snapshot(&self) -> Facts {
        self.catalog.vault().enrich(&self.facts)
    }

    /// Facts worth persisting: everything except configured non-user keys.
    pub fn user_facts(&self) -> Facts {
        let excluded = self.catalog.non_user_facts();
        self.facts
            .iter()
            .filter(|(key, _)| !excluded.iter().any(|x| x == *key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn derive_secondary_slots(&mut self) {
        let current = self.snapshot();
        let derived: Vec<_> = self
            .catalog
            .secondary_slots()
            .iter()
            .filter_map(|rule| rule.derive(&current).map(|v| (rule.writeto().to_string(), v)))
            .collect();
        for (key, value) in derived {
            self.facts.insert(key, value);
        }
    }

    fn stamp_server_facts(&mut self) {
        let now = self.clock.now();
        self.facts.insert(SERVER_HOUR, now.hour());
        self.facts.insert(SERVER_MONTH, now.month());
        self.facts.insert(SERVER_DAY, now.day());
    }

    fn persist(&self) -> Result<(), RepositoryError> {
        self.repository
            .write_facts(&self.conversation_id, &self.user_facts())
            .map_err(|e| {
                warn!(conversation_id = %self.conversation_id, error = %e, "Failed to persist facts");
                e
            })
    }
}

impl std::fmt::Debug for FactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactStore")
            .field("conversation_id", &self.conversation_id)
            .field("facts", &self.facts)
            .finish()
    }
}
