//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, the loosely typed fact map and the error
//! vocabulary used by every engine component.

mod errors;
mod facts;
mod ids;

pub use errors::{ErrorCode, ValidationError};
pub use facts::{FactValue, Facts};
pub use ids::{ConversationId, TurnId};
