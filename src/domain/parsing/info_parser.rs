//! Slot extraction from raw utterances.

use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::catalog::{CategorySpec, ConfigurationError, InfoParserSpec, Intent, Slot};
use crate::domain::foundation::Facts;

#[derive(Debug, Clone)]
struct Category {
    keywords: Option<Regex>,
    pattern: Option<Regex>,
}

impl Category {
    fn compile(name: &str, spec: &CategorySpec) -> Result<Self, ConfigurationError> {
        let context = || format!("info_parser '{}'", name);

        let keywords = if spec.values.is_empty() {
            None
        } else {
            // longest first so "北京市" beats "北京" at the same position
            let mut values: Vec<&String> = spec.values.iter().collect();
            values.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
            let alternation = values
                .iter()
                .map(|v| regex::escape(v))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                Regex::new(&alternation)
                    .map_err(|e| ConfigurationError::invalid_pattern(context(), &e))?,
            )
        };

        let pattern = spec
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ConfigurationError::invalid_pattern(context(), &e))?;

        Ok(Self { keywords, pattern })
    }

    fn extract(&self, text: &str) -> Option<String> {
        if let Some(found) = self.keywords.as_ref().and_then(|re| re.find(text)) {
            return Some(found.as_str().to_string());
        }
        let captures = self.pattern.as_ref()?.captures(text)?;
        captures
            .get(1)
            .or_else(|| captures.get(0))
            .map(|m| m.as_str().to_string())
    }
}

/// Pulls slot values out of text by category.
#[derive(Debug, Clone, Default)]
pub struct InfoParser {
    categories: BTreeMap<String, Category>,
}

impl InfoParser {
    pub fn from_spec(spec: &InfoParserSpec) -> Result<Self, ConfigurationError> {
        let categories = spec
            .categories
            .iter()
            .map(|(name, category)| Ok((name.clone(), Category::compile(name, category)?)))
            .collect::<Result<BTreeMap<_, _>, ConfigurationError>>()?;
        Ok(Self { categories })
    }

    /// Extracts a value for each slot from `text`, then applies the
    /// intent's slot fills on top.
    pub fn parse(&self, text: &str, slots: &[Slot], intent: Option<&Intent>) -> Facts {
        let mut facts = Facts::new();
        for slot in slots {
            match self.categories.get(&slot.category) {
                Some(category) => {
                    if let Some(value) = category.extract(text) {
                        facts.insert(slot.name.clone(), value);
                    }
                }
                None => debug!(slot = %slot.name, category = %slot.category, "No parser for slot category"),
            }
        }
        if let Some(intent) = intent {
            facts.extend(intent.slot_fills.clone());
        }
        debug!(extracted = facts.len(), "Utterance parsed");
        facts
    }
}
