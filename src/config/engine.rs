//! Engine configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Dialogue engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Resource document with intents, states, policies and templates
    #[serde(default = "default_resource_path")]
    pub resource_path: PathBuf,

    /// Fixed seed for reply template choice; random when unset
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_resource_path() -> PathBuf {
    PathBuf::from("resources/chatbot_resource.yaml")
}

impl EngineConfig {
    /// Validate engine configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.resource_path.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("engine.resource_path"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            resource_path: default_resource_path(),
            rng_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_bundled_resource() {
        let config = EngineConfig::default();
        assert_eq!(config.resource_path, PathBuf::from("resources/chatbot_resource.yaml"));
        assert!(config.rng_seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_resource_path_fails() {
        let config = EngineConfig {
            resource_path: PathBuf::new(),
            rng_seed: None,
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("engine.resource_path"))
        );
    }
}
