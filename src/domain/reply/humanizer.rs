//! Contextual phrasing wrapped around rendered replies.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::catalog::HumanizerSpec;
use crate::domain::foundation::Facts;

/// Adds prefixes and suffixes chosen from the conversation's contextual
/// slots, e.g. a friendlier opener when `contextual.mood` is `upset`.
#[derive(Debug, Clone)]
pub struct Humanizer {
    spec: HumanizerSpec,
}

impl Humanizer {
    pub fn new(spec: HumanizerSpec) -> Self {
        Self { spec }
    }

    pub fn list_separator(&self) -> &str {
        &self.spec.list_separator
    }

    pub fn humanify<R: Rng + ?Sized>(&self, text: &str, facts: &Facts, rng: &mut R) -> String {
        let Some(contextual) = facts.get(&self.spec.contextual_slots).and_then(|v| v.as_map()) else {
            return text.to_string();
        };

        let mut prefix = String::new();
        let mut suffix = String::new();
        for (slot, value) in contextual {
            let key = value.as_key();
            if let Some(phrase) = self
                .spec
                .prefixes
                .get(slot)
                .and_then(|by_value| by_value.get(&key))
                .and_then(|phrases| phrases.choose(rng))
            {
                prefix.push_str(phrase);
            }
            if let Some(phrase) = self
                .spec
                .suffixes
                .get(slot)
                .and_then(|by_value| by_value.get(&key))
                .and_then(|phrases| phrases.choose(rng))
            {
                suffix.push_str(phrase);
            }
        }
        format!("{}{}{}", prefix, text, suffix)
    }
}
