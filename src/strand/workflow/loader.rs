//! Settings loader - YAML file loading and parsing
//!
//! This module handles loading agent settings and state schemas from YAML.

use super::state::StateSchema;
use super::types::AgentSettings;
use crate::adk::error::ConfigError;
use std::fs;
use std::path::Path;

/// Loads agent settings and state schemas from YAML files
pub struct SettingsLoader;

impl SettingsLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load agent settings from a YAML file
    pub fn load_settings<P: AsRef<Path>>(&self, path: P) -> Result<AgentSettings, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse agent settings from a YAML string
    pub fn parse_yaml(content: &str) -> Result<AgentSettings, ConfigError> {
        let settings: AgentSettings = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Load a state schema from a YAML file
    pub fn load_state_schema<P: AsRef<Path>>(&self, path: P) -> Result<StateSchema, ConfigError> {
        let content = fs::read_to_string(path)?;
        let schema: StateSchema = serde_yaml::from_str(&content)?;
        Ok(schema)
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}
