//! Application handlers.
//!
//! ## Commands
//! - `Respond` - Run one turn, starting the conversation on first contact
//! - `EndConversation` - Flush the transcript and drop the live conversation
//!
//! ## Queries
//! - `current_state` / `active_conversations` - Inspect live conversations

mod conversation_service;

pub use conversation_service::{ConversationService, RespondCommand, RespondError, RespondResult};
