//! Policy keeper: maps (state, intent) to a transition.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{PolicyTable, Transition, Understanding};
use crate::domain::catalog::{
    Catalog, ConfigurationError, RuleSpec, Slot, State, DEFAULT_BRANCH, SAME_STATE,
};
use crate::domain::foundation::FactValue;
use crate::ports::{IntentClassifier, Prediction};

#[derive(Debug, Clone)]
struct Crossroad {
    zone: String,
    branches: BTreeMap<String, String>,
}

/// Resolves utterances into [`Understanding`]s.
///
/// Built once per catalog. Every state's table is the default set, then
/// the rules of each class the state carries, then its own rules; later
/// layers win on conflicting intents.
pub struct PolicyKeeper {
    catalog: Arc<Catalog>,
    classifier: Arc<dyn IntentClassifier>,
    defaults: PolicyTable,
    policies: HashMap<String, PolicyTable>,
    crossroads: HashMap<String, Crossroad>,
}

impl PolicyKeeper {
    pub fn new(
        catalog: Arc<Catalog>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Result<Self, ConfigurationError> {
        let mut defaults = PolicyTable::new();
        for intent in catalog.intents().filter(|i| i.default_set) {
            let destination = intent.default_target.as_deref().unwrap_or(SAME_STATE);
            let context = format!("default target of '{}'", intent.key);
            defaults.insert(
                intent.key.clone(),
                Self::build_transition(&catalog, &context, destination)?,
            );
        }

        let mut class_tables = BTreeMap::new();
        for (class, rules) in &catalog.policy().class_policy_rules {
            let context = format!("class_policy_rules '{}'", class);
            class_tables.insert(class.clone(), Self::build_table(&catalog, &context, rules)?);
        }

        let mut policies = HashMap::new();
        for state in catalog.states() {
            let mut table = defaults.clone();
            for class in &state.classes {
                if let Some(class_table) = class_tables.get(class) {
                    table = table.overlaid_with(class_table);
                }
            }
            if let Some(rules) = catalog.policy().policy_rules.get(&state.key) {
                let context = format!("policy_rules '{}'", state.key);
                table = table.overlaid_with(&Self::build_table(&catalog, &context, rules)?);
            }
            policies.insert(state.key.clone(), table);
        }

        let mut crossroads = HashMap::new();
        // Crossroad states and branch targets were checked when the catalog loaded
        for (state_key, spec) in &catalog.policy().crossroad_policies {
            crossroads.insert(
                state_key.clone(),
                Crossroad {
                    zone: spec.zone.clone(),
                    branches: spec.branches.clone(),
                },
            );
        }

        debug!(
            defaults = defaults.len(),
            states = policies.len(),
            crossroads = crossroads.len(),
            "Policies built"
        );

        Ok(Self {
            catalog,
            classifier,
            defaults,
            policies,
            crossroads,
        })
    }

    fn build_table(
        catalog: &Catalog,
        context: &str,
        rules: &[RuleSpec],
    ) -> Result<PolicyTable, ConfigurationError> {
        let mut table = PolicyTable::new();
        for (intent, destination) in rules {
            if catalog.intent(intent).is_none() {
                return Err(ConfigurationError::unknown_intent(context, intent));
            }
            table.insert(intent.clone(), Self::build_transition(catalog, context, destination)?);
        }
        Ok(table)
    }

    fn build_transition(
        catalog: &Catalog,
        context: &str,
        destination: &str,
    ) -> Result<Transition, ConfigurationError> {
        if destination == SAME_STATE {
            return Ok(Transition::Stay);
        }
        catalog
            .state(destination)
            .map(Transition::to)
            .ok_or_else(|| ConfigurationError::unknown_state(context, destination))
    }

    /// Classifies `text` and resolves it against the current state.
    pub fn understand(&self, current_state: &str, text: &str) -> (Understanding, Prediction) {
        let prediction = self.classifier.predict(text);
        let understanding = self.resolve(current_state, &prediction.label);
        (understanding, prediction)
    }

    /// Looks up `label` in the policy of `current_state`.
    ///
    /// Unknown labels and unmatched intents resolve to a stay with no intent.
    pub fn resolve(&self, current_state: &str, label: &str) -> Understanding {
        let Some(intent) = self.catalog.intent(label) else {
            debug!(label, state = current_state, "Unresolved intent label");
            return Understanding::unresolved(label, None);
        };

        let table = self.policies.get(current_state).unwrap_or(&self.defaults);
        match table.get(label) {
            Some(transition) => Understanding {
                raw_label: label.to_string(),
                catalog_intent: Some(intent.clone()),
                intent: Some(intent.clone()),
                transition: transition.clone(),
            },
            None => {
                debug!(label, state = current_state, "No policy rule for intent");
                Understanding::unresolved(label, Some(intent.clone()))
            }
        }
    }

    /// Transition to a state by key; unknown keys degrade to a stay.
    pub fn transition_to(&self, state_key: &str) -> Transition {
        match self.catalog.state(state_key) {
            Some(state) => Transition::to(state),
            None => {
                warn!(state = state_key, "Illegal state reference, staying");
                Transition::Stay
            }
        }
    }

    /// Routing override for `state_key` from the cached zones.
    ///
    /// Applies only when the state has a crossroad and its zone has a
    /// known value; that value's branch is used, else `DEFAULT`.
    pub fn zone_override(
        &self,
        state_key: &str,
        zones: &BTreeMap<String, FactValue>,
    ) -> Option<Transition> {
        let crossroad = self.crossroads.get(state_key)?;
        let value = zones.get(&crossroad.zone)?;
        let target = crossroad
            .branches
            .get(&value.as_key())
            .or_else(|| crossroad.branches.get(DEFAULT_BRANCH))?;
        debug!(
            state = state_key,
            zone = %crossroad.zone,
            value = %value,
            target = %target,
            "Zone override"
        );
        Some(self.transition_to(target))
    }

    /// Copy of the info-request hold state gated on the outstanding slots.
    pub fn info_request_state(&self, outstanding: &[Slot]) -> State {
        let mut state = self.catalog.info_request_state().clone();
        state.gated = true;
        state.req_info = outstanding.to_vec();
        state
    }
}

impl std::fmt::Debug for PolicyKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyKeeper")
            .field("defaults", &self.defaults)
            .field("states", &self.policies.len())
            .field("crossroads", &self.crossroads.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ScriptedIntentClassifier;
    use crate::domain::catalog::fixtures::{crossroad_catalog, scenario_catalog, SCENARIO_YAML};

    fn keeper(catalog: Catalog) -> PolicyKeeper {
        PolicyKeeper::new(Arc::new(catalog), Arc::new(ScriptedIntentClassifier::new("unknown")))
            .unwrap()
    }

    fn target_key(understanding: &Understanding) -> Option<&str> {
        understanding.transition.target().map(|s| s.key.as_str())
    }

    mod resolving {
        use super::*;

        #[test]
        fn default_set_applies_to_every_state() {
            let keeper = keeper(scenario_catalog());
            let understanding = keeper.resolve("S0", "give_city");
            assert_eq!(target_key(&understanding), Some("S1"));
            assert_eq!(understanding.intent_key(), Some("give_city"));

            let from_s2 = keeper.resolve("S2", "give_city");
            assert_eq!(target_key(&from_s2), Some("S1"));
        }

        #[test]
        fn same_state_rule_is_a_stay_with_intent() {
            let keeper = keeper(scenario_catalog());
            let understanding = keeper.resolve("S0", "greet");
            assert!(understanding.transition.is_stay());
            assert_eq!(understanding.intent_key(), Some("greet"));
        }

        #[test]
        fn known_intent_without_rule_is_null_intent() {
            let keeper = keeper(scenario_catalog());
            let understanding = keeper.resolve("S1", "greet");
            assert!(understanding.transition.is_stay());
            assert_eq!(understanding.intent_key(), None);
            assert_eq!(understanding.catalog_intent.unwrap().key, "greet");
        }

        #[test]
        fn unknown_label_is_null_intent() {
            let keeper = keeper(scenario_catalog());
            let understanding = keeper.resolve("S0", "something_else");
            assert!(understanding.transition.is_stay());
            assert!(understanding.catalog_intent.is_none());
            assert_eq!(understanding.raw_label, "something_else");
        }

        #[test]
        fn state_rules_override_defaults() {
            let yaml = SCENARIO_YAML.replace(
                "- [greet, SAME_STATE]",
                "- [greet, SAME_STATE]\n      - [give_city, S2]",
            );
            let keeper = keeper(Catalog::from_yaml_str(&yaml).unwrap());
            assert_eq!(target_key(&keeper.resolve("S0", "give_city")), Some("S2"));
            assert_eq!(target_key(&keeper.resolve("S3", "give_city")), Some("S1"));
        }

        #[test]
        fn class_rules_apply_to_flagged_states() {
            let yaml = SCENARIO_YAML
                .replace(
                    "  S3:\n    replies:",
                    "  S3:\n    classes: [closing]\n    replies:",
                )
                .replace(
                    "policy:\n  policy_rules:",
                    "policy:\n  class_policy_rules:\n    closing:\n      - [greet, S0]\n  policy_rules:",
                );
            let keeper = keeper(Catalog::from_yaml_str(&yaml).unwrap());
            assert_eq!(target_key(&keeper.resolve("S3", "greet")), Some("S0"));
            assert_eq!(keeper.resolve("S2", "greet").intent_key(), None);
        }

        #[test]
        fn understand_uses_classifier_label() {
            let classifier = ScriptedIntentClassifier::new("unknown").with_label("give_city");
            let keeper =
                PolicyKeeper::new(Arc::new(scenario_catalog()), Arc::new(classifier.clone())).unwrap();
            let (understanding, prediction) = keeper.understand("S0", "上海");
            assert_eq!(prediction.label, "give_city");
            assert_eq!(target_key(&understanding), Some("S1"));
            assert_eq!(classifier.get_calls(), vec!["上海".to_string()]);
        }
    }

    mod zones {
        use super::*;

        fn zones(city: &str) -> BTreeMap<String, FactValue> {
            BTreeMap::from([("city".to_string(), FactValue::from(city))])
        }

        #[test]
        fn matching_branch_wins() {
            let keeper = keeper(crossroad_catalog());
            let transition = keeper.zone_override("S1", &zones("北京")).unwrap();
            assert_eq!(transition.target().unwrap().key, "S2");
        }

        #[test]
        fn unmatched_value_takes_default_branch() {
            let keeper = keeper(crossroad_catalog());
            let transition = keeper.zone_override("S1", &zones("上海")).unwrap();
            assert_eq!(transition.target().unwrap().key, "S3");
        }

        #[test]
        fn absent_zone_means_no_override() {
            let keeper = keeper(crossroad_catalog());
            assert!(keeper.zone_override("S1", &BTreeMap::new()).is_none());
        }

        #[test]
        fn state_without_crossroad_has_no_override() {
            let keeper = keeper(crossroad_catalog());
            assert!(keeper.zone_override("S0", &zones("北京")).is_none());
        }
    }

    mod transitions {
        use super::*;

        #[test]
        fn unknown_state_key_degrades_to_stay() {
            let keeper = keeper(scenario_catalog());
            assert!(keeper.transition_to("nowhere").is_stay());
            assert_eq!(keeper.transition_to("S2").target().unwrap().key, "S2");
        }

        #[test]
        fn info_request_state_is_a_gated_copy() {
            let catalog = Arc::new(scenario_catalog());
            let keeper = PolicyKeeper::new(
                catalog.clone(),
                Arc::new(ScriptedIntentClassifier::new("unknown")),
            )
            .unwrap();
            let hold = keeper.info_request_state(&[Slot::new("city", "city")]);
            assert_eq!(hold.key, "need_info");
            assert_eq!(hold.gating_slots(), &[Slot::new("city", "city")]);
            assert!(catalog.info_request_state().req_info.is_empty());
        }
    }
}
