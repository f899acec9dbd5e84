//! Reply rendering errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    /// An `if_value` rule has neither a branch for the value nor a `DEFAULT`.
    #[error("Message format rule '{rule}' has no branch for '{value}' and no DEFAULT")]
    TemplateResolution { rule: String, value: String },
}
