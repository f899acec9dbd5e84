//! Serde model of the declarative resource document.
//!
//! These types mirror the document layout one-to-one. [`super::Catalog`]
//! turns them into validated, typed engine configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Intent, Slot, State};
use crate::domain::foundation::{FactValue, Facts};

/// The whole resource document as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDocument {
    #[serde(default = "default_initial_state")]
    pub initial_state: String,

    #[serde(default = "default_info_request_state")]
    pub info_request_state: String,

    #[serde(default)]
    pub confused_replies: Vec<String>,

    #[serde(default = "default_non_user_facts")]
    pub non_user_facts: Vec<String>,

    pub intents: BTreeMap<String, Intent>,

    pub states: BTreeMap<String, State>,

    #[serde(default)]
    pub policy: PolicySpec,

    #[serde(default)]
    pub gating: GatingSpec,

    #[serde(default)]
    pub facts: FactsSpec,

    #[serde(default)]
    pub formulae: BTreeMap<String, FormulaSpec>,

    #[serde(default)]
    pub reply_formatting: ReplyFormattingSpec,

    #[serde(default)]
    pub humanizer: HumanizerSpec,

    #[serde(default)]
    pub info_parser: InfoParserSpec,

    #[serde(default)]
    pub classifier: ClassifierSpec,
}

fn default_initial_state() -> String {
    "init".to_string()
}

fn default_info_request_state() -> String {
    "TMP_recv_info".to_string()
}

fn default_non_user_facts() -> Vec<String> {
    vec!["requested_info".to_string()]
}

/// `[intent, destination]` pair; destination `SAME_STATE` means stay.
pub type RuleSpec = (String, String);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicySpec {
    #[serde(default)]
    pub policy_rules: BTreeMap<String, Vec<RuleSpec>>,

    #[serde(default)]
    pub class_policy_rules: BTreeMap<String, Vec<RuleSpec>>,

    #[serde(default)]
    pub crossroad_policies: BTreeMap<String, CrossroadSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrossroadSpec {
    /// Zone whose value picks the branch.
    pub zone: String,
    /// Zone value -> destination state, with an optional `DEFAULT` entry.
    pub branches: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatingSpec {
    #[serde(default)]
    pub conditional_reqs: Vec<ConditionalReqSpec>,

    #[serde(default)]
    pub default_slot_vals: BTreeMap<String, FactValue>,
}

/// "If fact `if_slot` equals `equals`, also require `require`."
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionalReqSpec {
    pub if_slot: String,
    pub equals: FactValue,
    pub require: Vec<Slot>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactsSpec {
    #[serde(default)]
    pub zones: Vec<String>,

    /// Fact key -> fact value -> associated facts.
    #[serde(default)]
    pub vault: BTreeMap<String, BTreeMap<String, Facts>>,

    #[serde(default)]
    pub secondary_slots: Vec<SecondarySlotSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecondarySlotSpec {
    pub writeto: String,
    /// `{root_slot: {value: leaf | {slot: {...}}}}`
    pub search_tree: BTreeMap<String, FactValue>,
    #[serde(default, alias = "DEFAULT")]
    pub default: Option<FactValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormulaSpec {
    #[serde(default)]
    pub req_vars: Vec<String>,

    #[serde(default)]
    pub optional_vars: Vec<String>,

    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,

    /// `"<order>,<op>"` -> `[operands, target]`
    pub steps: BTreeMap<String, (Vec<FactValue>, String)>,

    pub writeto: String,

    #[serde(default)]
    pub persist_value: bool,
}

/// Sets `set` to `then` when fact `var` equals `equals`, else `otherwise`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionSpec {
    pub var: String,
    pub equals: FactValue,
    pub set: String,
    #[serde(default = "one")]
    pub then: f64,
    #[serde(default)]
    pub otherwise: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyFormattingSpec {
    #[serde(default)]
    pub msg_formats: Vec<MsgFormat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Append,
    Prepend,
}

/// Text enhancement rule written into the `rep_ext` sub-map.
#[derive(Debug, Clone, Deserialize)]
pub struct MsgFormat {
    pub states: Vec<String>,
    pub writeto: String,
    #[serde(default)]
    pub lookfor: Vec<String>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub if_present: BTreeMap<String, String>,
    #[serde(default)]
    pub if_value: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HumanizerSpec {
    #[serde(default = "default_contextual_slots")]
    pub contextual_slots: String,
    /// Slot -> value -> phrases.
    #[serde(default)]
    pub prefixes: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub suffixes: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    #[serde(default = "default_list_separator")]
    pub list_separator: String,
}

impl Default for HumanizerSpec {
    fn default() -> Self {
        Self {
            contextual_slots: default_contextual_slots(),
            prefixes: BTreeMap::new(),
            suffixes: BTreeMap::new(),
            list_separator: default_list_separator(),
        }
    }
}

fn default_contextual_slots() -> String {
    "contextual".to_string()
}

fn default_list_separator() -> String {
    "、".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoParserSpec {
    #[serde(default)]
    pub categories: BTreeMap<String, CategorySpec>,
}

/// Extraction rule for one slot category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategorySpec {
    #[serde(default)]
    pub values: Vec<String>,
    /// Regex; capture group 1 is used when present.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSpec {
    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,
    /// Checked in order; the first matching label wins.
    #[serde(default)]
    pub intents: Vec<ClassifierRule>,
}

impl Default for ClassifierSpec {
    fn default() -> Self {
        Self {
            fallback_label: default_fallback_label(),
            intents: Vec::new(),
        }
    }
}

fn default_fallback_label() -> String {
    "unknown".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierRule {
    pub label: String,
    pub patterns: Vec<String>,
}
