//! Startup errors raised while building the catalog.

use std::path::PathBuf;
use thiserror::Error;

/// A resource document that parsed but does not describe a usable engine.
///
/// Every variant is fatal: the engine refuses to start rather than fail
/// on a later turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Unknown state '{state}' referenced by {context}")]
    UnknownState { context: String, state: String },

    #[error("Unknown intent '{intent}' referenced by {context}")]
    UnknownIntent { context: String, intent: String },

    #[error("State '{state}' references unknown formula '{formula}'")]
    UnknownFormula { state: String, formula: String },

    #[error("Formula '{formula}' has malformed step key '{key}'")]
    MalformedStepKey { formula: String, key: String },

    #[error("Invalid pattern in {context}: {reason}")]
    InvalidPattern { context: String, reason: String },

    #[error("Secondary slot '{writeto}' has an invalid search tree: {reason}")]
    InvalidSearchTree { writeto: String, reason: String },

    #[error("Info request state '{0}' must be gated")]
    InfoRequestStateNotGated(String),
}

impl ConfigurationError {
    pub fn unknown_state(context: impl Into<String>, state: impl Into<String>) -> Self {
        ConfigurationError::UnknownState {
            context: context.into(),
            state: state.into(),
        }
    }

    pub fn unknown_intent(context: impl Into<String>, intent: impl Into<String>) -> Self {
        ConfigurationError::UnknownIntent {
            context: context.into(),
            intent: intent.into(),
        }
    }

    pub fn invalid_pattern(context: impl Into<String>, err: &regex::Error) -> Self {
        ConfigurationError::InvalidPattern {
            context: context.into(),
            reason: err.to_string(),
        }
    }
}

/// Errors loading the resource document from disk.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Failed to read resource {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML resource: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON resource: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid resource: {0}")]
    Configuration(#[from] ConfigurationError),
}
