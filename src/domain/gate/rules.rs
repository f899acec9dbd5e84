//! Conditional requirements and default slot values.

use std::collections::BTreeMap;

use crate::domain::catalog::{GatingSpec, Slot};
use crate::domain::foundation::{FactValue, Facts};

/// "If fact `if_slot` equals `equals`, also require `require`."
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalRequirement {
    pub if_slot: String,
    pub equals: FactValue,
    pub require: Vec<Slot>,
}

impl ConditionalRequirement {
    /// Values are compared by canonical key, so `5` and `"5"` match.
    pub fn applies(&self, facts: &Facts) -> bool {
        facts
            .get(&self.if_slot)
            .map(|value| value.as_key() == self.equals.as_key())
            .unwrap_or(false)
    }
}

/// Gating configuration shared by every conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateRules {
    conditional: Vec<ConditionalRequirement>,
    defaults: BTreeMap<String, FactValue>,
}

impl GateRules {
    pub fn new(
        conditional: Vec<ConditionalRequirement>,
        defaults: BTreeMap<String, FactValue>,
    ) -> Self {
        Self {
            conditional,
            defaults,
        }
    }

    pub fn from_spec(spec: &GatingSpec) -> Self {
        let conditional = spec
            .conditional_reqs
            .iter()
            .map(|req| ConditionalRequirement {
                if_slot: req.if_slot.clone(),
                equals: req.equals.clone(),
                require: req.require.clone(),
            })
            .collect();
        Self::new(conditional, spec.default_slot_vals.clone())
    }

    /// Extra slots required by every rule that applies to `facts`.
    pub fn conditional_slots(&self, facts: &Facts) -> Vec<Slot> {
        self.conditional
            .iter()
            .filter(|rule| rule.applies(facts))
            .flat_map(|rule| rule.require.iter().cloned())
            .collect()
    }

    pub fn default_for(&self, slot: &str) -> Option<&FactValue> {
        self.defaults.get(slot)
    }
}
