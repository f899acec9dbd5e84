//! Gate - decides whether enough facts are known to leave a state.

mod gatekeeper;
mod rules;

pub use gatekeeper::{GateOutcome, Gatekeeper};
pub use rules::{ConditionalRequirement, GateRules};
