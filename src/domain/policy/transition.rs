//! Transitions and the understanding of one utterance.

use crate::domain::catalog::{Intent, Slot, State};

/// Outcome of matching an intent in a given state.
///
/// `Change` holds a value copy of the target so per-conversation edits never
/// reach the shared catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// No real state change; the reply comes from the intent's templates.
    Stay,
    Change(State),
}

impl Transition {
    pub fn to(state: &State) -> Self {
        Transition::Change(state.clone())
    }

    pub fn is_stay(&self) -> bool {
        matches!(self, Transition::Stay)
    }

    pub fn target(&self) -> Option<&State> {
        match self {
            Transition::Stay => None,
            Transition::Change(state) => Some(state),
        }
    }

    pub fn gating_slots(&self) -> &[Slot] {
        self.target().map(State::gating_slots).unwrap_or(&[])
    }
}

/// What the engine made of one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Understanding {
    /// Label exactly as the classifier returned it.
    pub raw_label: String,
    /// Catalog intent for the label, if the catalog knows it.
    pub catalog_intent: Option<Intent>,
    /// Intent chosen by the policy; `None` means nothing was recognized.
    pub intent: Option<Intent>,
    pub transition: Transition,
}

impl Understanding {
    /// "Nothing recognized, remain where you are."
    pub fn unresolved(raw_label: impl Into<String>, catalog_intent: Option<Intent>) -> Self {
        Self {
            raw_label: raw_label.into(),
            catalog_intent,
            intent: None,
            transition: Transition::Stay,
        }
    }

    pub fn intent_key(&self) -> Option<&str> {
        self.intent.as_ref().map(|i| i.key.as_str())
    }
}
