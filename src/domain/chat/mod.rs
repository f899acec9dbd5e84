//! Chat - drives one request/response cycle per utterance.
//!
//! `EngineBlueprint` holds the parts every conversation shares;
//! `ChatManager` owns the per-conversation state and runs turns.

mod blueprint;
mod error;
mod manager;

pub use blueprint::EngineBlueprint;
pub use error::EngineError;
pub use manager::{ChatManager, TurnOutcome, GIVEN_AMOUNT, MAX_OVERRIDE_ITERATIONS, REQUESTED_INFO};
