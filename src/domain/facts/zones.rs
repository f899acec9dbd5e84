//! Zone cache used for crossroad routing.

use std::collections::BTreeMap;

use crate::domain::foundation::{FactValue, Facts};

/// Mirrors the configured zone facts (e.g. `city`) out of the fact store so
/// routing can read them without holding the store itself.
///
/// A zone keeps its last known value even if the fact is later cleared.
#[derive(Debug, Clone, Default)]
pub struct ZoneTracker {
    keys: Vec<String>,
    zones: BTreeMap<String, FactValue>,
}

impl ZoneTracker {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            zones: BTreeMap::new(),
        }
    }

    pub fn update_from(&mut self, snapshot: &Facts) {
        for key in &self.keys {
            if let Some(value) = snapshot.get(key) {
                self.zones.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn zones(&self) -> &BTreeMap<String, FactValue> {
        &self.zones
    }

    pub fn zone(&self, key: &str) -> Option<&FactValue> {
        self.zones.get(key)
    }
}
