//! Conversation states and the slots that gate them.

use serde::{Deserialize, Serialize};

/// Thread id meaning "stay on whichever thread is active".
pub const CURRENT_THREAD: &str = "NONE";

/// A piece of information a gated state needs before it can be left.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Slot {
    /// Fact key the value is stored under.
    pub name: String,
    /// Parser category used to extract the value from text.
    pub category: String,
}

impl Slot {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

impl From<(String, String)> for Slot {
    fn from((name, category): (String, String)) -> Self {
        Self { name, category }
    }
}

impl From<Slot> for (String, String) {
    fn from(slot: Slot) -> Self {
        (slot.name, slot.category)
    }
}

/// A node in the conversation graph.
///
/// States are loaded once and never mutated afterwards; transitions and
/// threads hold value copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Unique key, filled from the catalog map key.
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub gated: bool,

    /// Slots required before leaving; only meaningful when `gated`.
    #[serde(default)]
    pub req_info: Vec<Slot>,

    /// Fact keys removed when the conversation enters this state.
    #[serde(default)]
    pub clear: Vec<String>,

    #[serde(default, rename = "terminal_state")]
    pub terminal: bool,

    /// Marks states that only exist to request missing information.
    #[serde(default)]
    pub transition_state: bool,

    #[serde(default = "default_thread")]
    pub thread: String,

    /// Formula names evaluated when rendering from this state.
    #[serde(default)]
    pub calcs: Vec<String>,

    #[serde(default)]
    pub replies: Vec<String>,

    #[serde(default = "default_humanify")]
    pub humanify: bool,

    /// Class flags that pull in class policy rules.
    #[serde(default)]
    pub classes: Vec<String>,
}

fn default_thread() -> String {
    CURRENT_THREAD.to_string()
}

fn default_humanify() -> bool {
    true
}

impl State {
    /// Creates an ungated state on the current thread.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            gated: false,
            req_info: Vec::new(),
            clear: Vec::new(),
            terminal: false,
            transition_state: false,
            thread: default_thread(),
            calcs: Vec::new(),
            replies: Vec::new(),
            humanify: true,
            classes: Vec::new(),
        }
    }

    /// Builder: gate the state on the given slots.
    pub fn gated_on(mut self, slots: Vec<Slot>) -> Self {
        self.gated = true;
        self.req_info = slots;
        self
    }

    /// Builder: set the reply templates.
    pub fn with_replies(mut self, replies: &[&str]) -> Self {
        self.replies = replies.iter().map(|r| r.to_string()).collect();
        self
    }

    /// Builder: mark terminal.
    pub fn as_terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Builder: place the state on a named thread.
    pub fn on_thread(mut self, thread: impl Into<String>) -> Self {
        self.thread = thread.into();
        self
    }

    /// Named thread this state belongs to, or `None` for the active thread.
    pub fn thread_id(&self) -> Option<&str> {
        if self.thread == CURRENT_THREAD || self.thread.is_empty() {
            None
        } else {
            Some(&self.thread)
        }
    }

    /// Gating slots, empty when the state is not gated.
    pub fn gating_slots(&self) -> &[Slot] {
        if self.gated {
            &self.req_info
        } else {
            &[]
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}
