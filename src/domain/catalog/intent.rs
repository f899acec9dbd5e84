//! Intents: named categories of customer meaning.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Facts;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default)]
    pub key: String,

    /// Facts injected whenever this intent is recognized.
    #[serde(default)]
    pub slot_fills: Facts,

    #[serde(default)]
    pub replies: Vec<String>,

    #[serde(default = "default_humanify")]
    pub humanify: bool,

    /// Member of the default policy set applied to every state.
    #[serde(default)]
    pub default_set: bool,

    /// Destination used by the default policy set.
    #[serde(default)]
    pub default_target: Option<String>,
}

fn default_humanify() -> bool {
    true
}

impl Intent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slot_fills: Facts::new(),
            replies: Vec::new(),
            humanify: true,
            default_set: false,
            default_target: None,
        }
    }

    pub fn with_replies(mut self, replies: &[&str]) -> Self {
        self.replies = replies.iter().map(|r| r.to_string()).collect();
        self
    }
}
