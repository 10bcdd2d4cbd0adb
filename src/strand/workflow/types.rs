// SPDX-License-Identifier: MIT

//! YAML schema types for agent settings
//!
//! Settings configure an [`AgentExecutor`](crate::adk::agent::AgentExecutor):
//! its role prompt, mandatory tools and retry budgets.

use serde::{Deserialize, Serialize};

pub const DEFAULT_VALIDATION_ATTEMPTS: u32 = 3;
pub const DEFAULT_CORRECTION_DEPTH: u32 = 3;
pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 10;

/// Agent settings, usually loaded from a YAML file
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentSettings {
    #[serde(default = "default_name")]
    pub name: String,
    /// Role definition placed at the top of every prompt
    pub system: Option<String>,
    /// Tools the model must call at least once per exchange
    #[serde(default)]
    pub tool_choices: Vec<String>,
    /// Total structured-output validation attempts, the first one included
    #[serde(default = "default_validation_attempts")]
    pub validation_attempts: u32,
    /// Corrective turns sent when mandatory tools were not called
    #[serde(default = "default_correction_depth")]
    pub correction_depth: u32,
    /// Consecutive tool-call rounds before the last reply is accepted as is
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Example replies shown to the model
    #[serde(default)]
    pub examples: Vec<serde_json::Value>,
}

fn default_name() -> String {
    "AgentExecutor".to_string()
}

fn default_validation_attempts() -> u32 {
    DEFAULT_VALIDATION_ATTEMPTS
}

fn default_correction_depth() -> u32 {
    DEFAULT_CORRECTION_DEPTH
}

fn default_max_tool_rounds() -> u32 {
    DEFAULT_MAX_TOOL_ROUNDS
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: default_name(),
            system: None,
            tool_choices: Vec::new(),
            validation_attempts: DEFAULT_VALIDATION_ATTEMPTS,
            correction_depth: DEFAULT_CORRECTION_DEPTH,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            examples: Vec::new(),
        }
    }
}
