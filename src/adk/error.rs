// SPDX-License-Identifier: MIT

//! Typed error handling for strand-rs
//!
//! Construction and routing problems in a workflow are programmer errors and
//! surface as [`ExecutionError`]. Tool and parse failures have their own types
//! because the agent loop converts them into visible output instead of
//! propagating them.

use thiserror::Error;

/// Error returned by [`Runnable::invoke`](crate::adk::runnable::Runnable::invoke)
/// and by graph construction.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Invalid topology or missing graph configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A discriminator produced a value with no matching transition
    #[error("Routing error: node '{node}' has no transition for '{value}'")]
    Routing { node: String, value: String },

    /// A step (lambda, node action) failed
    #[error("Step '{step}' failed: {message}")]
    Step { step: String, message: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ExecutionError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a step failure
    pub fn step(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Step {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// Tool dispatch errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// No bound tool carries this name
    #[error("Tool '{0}' not found")]
    UnknownTool(String),

    /// The argument map does not match the tool's declared parameters
    #[error("invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// The tool ran and reported a failure
    #[error("{tool} failed: {message}")]
    Execution { tool: String, message: String },
}

/// Model collaborator errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// A scripted model ran out of replies
    #[error("Model has no replies left")]
    Exhausted,

    /// The backing service rejected or failed the request
    #[error("Model request failed: {0}")]
    Request(String),
}

/// Raised when model text is not valid JSON after fence stripping.
///
/// `raw` is the untouched input so callers can fall back to it.
#[derive(Debug, Error)]
#[error("could not parse model reply as JSON: {source}")]
pub struct ParseError {
    pub raw: String,
    #[source]
    pub source: serde_json::Error,
}

/// Settings loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failure reported by an instrumentation handler
#[derive(Debug, Error)]
#[error("callback handler failed: {0}")]
pub struct CallbackError(pub String);

impl From<&str> for CallbackError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CallbackError {
    fn from(s: String) -> Self {
        Self(s)
    }
}
