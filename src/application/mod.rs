//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer owns the live conversations and coordinates the engine with
//! the configured adapters.

pub mod handlers;

pub use handlers::{ConversationService, RespondCommand, RespondError, RespondResult};
