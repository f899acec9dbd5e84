//! Turn-level errors.

use thiserror::Error;

use crate::domain::catalog::ConfigurationError;
use crate::domain::foundation::ErrorCode;
use crate::domain::reply::ReplyError;
use crate::ports::{RepositoryError, TranscriptError};

/// Errors that abort a turn or a conversation start.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Message format rule '{rule}' has no branch for '{value}' and no DEFAULT")]
    TemplateResolution { rule: String, value: String },

    #[error("Fact persistence failed: {0}")]
    Persistence(#[from] RepositoryError),

    #[error("Transcript recording failed: {0}")]
    Transcript(#[from] TranscriptError),

    #[error("Invalid engine configuration: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::TemplateResolution { .. } => ErrorCode::TemplateResolution,
            EngineError::Persistence(_) => ErrorCode::PersistenceFailed,
            EngineError::Transcript(_) => ErrorCode::TranscriptFailed,
            EngineError::Configuration(_) => ErrorCode::ConfigurationInvalid,
        }
    }
}

impl From<ReplyError> for EngineError {
    fn from(err: ReplyError) -> Self {
        match err {
            ReplyError::TemplateResolution { rule, value } => {
                EngineError::TemplateResolution { rule, value }
            }
        }
    }
}
