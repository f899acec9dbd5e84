//! Catalog - the validated, immutable engine configuration.
//!
//! A [`Catalog`] is built once at startup from the declarative resource
//! document and shared read-only by every conversation. Building it checks
//! every cross reference (states, intents, formulas, patterns) so that a
//! broken document fails at startup instead of on some later turn.

mod error;
mod intent;
mod resource;
mod state;

pub use error::{ConfigurationError, ResourceError};
pub use intent::Intent;
pub use resource::{
    CategorySpec, ClassifierRule, ClassifierSpec, ConditionSpec, ConditionalReqSpec,
    CrossroadSpec, FactsSpec, FormulaSpec, GatingSpec, HumanizerSpec, InfoParserSpec, MsgFormat,
    PolicySpec, Position, ReplyFormattingSpec, ResourceDocument, RuleSpec, SecondarySlotSpec,
};
pub use state::{Slot, State, CURRENT_THREAD};

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::domain::facts::{SecondarySlotRule, Vault};
use crate::domain::reply::Formula;

/// Policy destination meaning "no real state change".
pub const SAME_STATE: &str = "SAME_STATE";

/// Crossroad branch used when the zone value has no branch of its own.
pub const DEFAULT_BRANCH: &str = "DEFAULT";

#[derive(Debug, Clone)]
pub struct Catalog {
    initial_state: String,
    info_request_state: String,
    confused_replies: Vec<String>,
    non_user_facts: Vec<String>,
    intents: BTreeMap<String, Intent>,
    states: BTreeMap<String, State>,
    policy: PolicySpec,
    gating: GatingSpec,
    zones: Vec<String>,
    vault: Vault,
    secondary_slots: Vec<SecondarySlotRule>,
    formulae: BTreeMap<String, Formula>,
    msg_formats: Vec<MsgFormat>,
    humanizer: HumanizerSpec,
    info_parser: InfoParserSpec,
    classifier: ClassifierSpec,
}

impl Catalog {
    /// Loads and validates a resource document.
    ///
    /// Files ending in `.json` are parsed as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ResourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let document: ResourceDocument = if is_json {
            serde_json::from_str(&raw)?
        } else {
            serde_yaml::from_str(&raw)?
        };

        let catalog = Self::from_document(document)?;
        info!(
            path = %path.display(),
            states = catalog.states.len(),
            intents = catalog.intents.len(),
            "Resource catalog loaded"
        );
        Ok(catalog)
    }

    /// Parses a YAML document held in memory.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ResourceError> {
        let document: ResourceDocument = serde_yaml::from_str(yaml)?;
        Ok(Self::from_document(document)?)
    }

    /// Validates a parsed document and builds the catalog.
    pub fn from_document(document: ResourceDocument) -> Result<Self, ConfigurationError> {
        let ResourceDocument {
            initial_state,
            info_request_state,
            confused_replies,
            non_user_facts,
            mut intents,
            mut states,
            policy,
            gating,
            facts,
            formulae,
            reply_formatting,
            humanizer,
            info_parser,
            classifier,
        } = document;

        for (key, intent) in intents.iter_mut() {
            intent.key = key.clone();
        }
        for (key, state) in states.iter_mut() {
            state.key = key.clone();
        }

        let formulae = formulae
            .into_iter()
            .map(|(name, spec)| Formula::from_spec(&name, &spec).map(|f| (name, f)))
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let secondary_slots = facts
            .secondary_slots
            .iter()
            .map(SecondarySlotRule::from_spec)
            .collect::<Result<Vec<_>, _>>()?;

        let catalog = Self {
            initial_state,
            info_request_state,
            confused_replies,
            non_user_facts,
            intents,
            states,
            policy,
            gating,
            zones: facts.zones,
            vault: Vault::new(facts.vault),
            secondary_slots,
            formulae,
            msg_formats: reply_formatting.msg_formats,
            humanizer,
            info_parser,
            classifier,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        self.require_state("initial_state", &self.initial_state)?;
        let hold = self.require_state("info_request_state", &self.info_request_state)?;
        if !hold.gated {
            return Err(ConfigurationError::InfoRequestStateNotGated(
                self.info_request_state.clone(),
            ));
        }

        for (state_key, rules) in &self.policy.policy_rules {
            self.require_state("policy_rules", state_key)?;
            self.validate_rules(&format!("policy_rules '{}'", state_key), rules)?;
        }
        for (class, rules) in &self.policy.class_policy_rules {
            self.validate_rules(&format!("class_policy_rules '{}'", class), rules)?;
        }
        for intent in self.intents.values().filter(|i| i.default_set) {
            if let Some(target) = &intent.default_target {
                self.require_destination(&format!("default target of '{}'", intent.key), target)?;
            }
        }

        for (state_key, crossroad) in &self.policy.crossroad_policies {
            self.require_state("crossroad_policies", state_key)?;
            for (value, target) in &crossroad.branches {
                let context = format!("crossroad '{}' branch '{}'", state_key, value);
                self.require_state(&context, target)?;
            }
        }

        for state in self.states.values() {
            for formula in &state.calcs {
                if !self.formulae.contains_key(formula) {
                    return Err(ConfigurationError::UnknownFormula {
                        state: state.key.clone(),
                        formula: formula.clone(),
                    });
                }
            }
        }

        for (index, format) in self.msg_formats.iter().enumerate() {
            for state_key in &format.states {
                self.require_state(&format!("msg_formats[{}]", index), state_key)?;
            }
        }

        for (category, spec) in &self.info_parser.categories {
            if let Some(pattern) = &spec.pattern {
                Regex::new(pattern).map_err(|e| {
                    ConfigurationError::invalid_pattern(format!("info_parser '{}'", category), &e)
                })?;
            }
        }
        for rule in &self.classifier.intents {
            for pattern in &rule.patterns {
                Regex::new(pattern).map_err(|e| {
                    ConfigurationError::invalid_pattern(format!("classifier '{}'", rule.label), &e)
                })?;
            }
        }

        Ok(())
    }

    fn validate_rules(&self, context: &str, rules: &[RuleSpec]) -> Result<(), ConfigurationError> {
        for (intent, destination) in rules {
            if !self.intents.contains_key(intent) {
                return Err(ConfigurationError::unknown_intent(context, intent));
            }
            self.require_destination(context, destination)?;
        }
        Ok(())
    }

    fn require_destination(&self, context: &str, destination: &str) -> Result<(), ConfigurationError> {
        if destination == SAME_STATE {
            return Ok(());
        }
        self.require_state(context, destination).map(|_| ())
    }

    fn require_state(&self, context: &str, key: &str) -> Result<&State, ConfigurationError> {
        self.states
            .get(key)
            .ok_or_else(|| ConfigurationError::unknown_state(context, key))
    }

    pub fn initial_state(&self) -> &State {
        &self.states[&self.initial_state]
    }

    pub fn info_request_state(&self) -> &State {
        &self.states[&self.info_request_state]
    }

    pub fn state(&self, key: &str) -> Option<&State> {
        self.states.get(key)
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    pub fn intent(&self, key: &str) -> Option<&Intent> {
        self.intents.get(key)
    }

    pub fn intents(&self) -> impl Iterator<Item = &Intent> {
        self.intents.values()
    }

    pub fn confused_replies(&self) -> &[String] {
        &self.confused_replies
    }

    pub fn non_user_facts(&self) -> &[String] {
        &self.non_user_facts
    }

    pub fn policy(&self) -> &PolicySpec {
        &self.policy
    }

    pub fn gating(&self) -> &GatingSpec {
        &self.gating
    }

    pub fn zones(&self) -> &[String] {
        &self.zones
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn secondary_slots(&self) -> &[SecondarySlotRule] {
        &self.secondary_slots
    }

    pub fn formula(&self, name: &str) -> Option<&Formula> {
        self.formulae.get(name)
    }

    pub fn msg_formats(&self) -> &[MsgFormat] {
        &self.msg_formats
    }

    pub fn humanizer(&self) -> &HumanizerSpec {
        &self.humanizer
    }

    pub fn info_parser(&self) -> &InfoParserSpec {
        &self.info_parser
    }

    pub fn classifier(&self) -> &ClassifierSpec {
        &self.classifier
    }
}
