//! Intent -> transition tables.

use std::collections::BTreeMap;

use super::Transition;

/// Per-state policy: intent key -> transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyTable {
    rules: BTreeMap<String, Transition>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, intent: impl Into<String>, transition: Transition) {
        self.rules.insert(intent.into(), transition);
    }

    pub fn get(&self, intent: &str) -> Option<&Transition> {
        self.rules.get(intent)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Layers `over` on top of this table; entries in `over` win.
    pub fn overlaid_with(&self, over: &PolicyTable) -> PolicyTable {
        let mut rules = self.rules.clone();
        rules.extend(over.rules.iter().map(|(k, v)| (k.clone(), v.clone())));
        PolicyTable { rules }
    }
}
