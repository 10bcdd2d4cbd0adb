// SPDX-License-Identifier: MIT

//! Model module - the text-generation collaborator
//!
//! The agent loop only needs `prompt in, text out`; provider bindings live
//! outside this crate and implement [`Model`]. [`replay::ReplayModel`] replays
//! scripted replies for tests and offline transcript reproduction.

pub mod replay;

use crate::adk::error::ModelError;
use async_trait::async_trait;

pub use replay::ReplayModel;

/// Core trait for text-generation backends
#[async_trait]
pub trait Model: Send + Sync {
    /// Generate a completion for a fully rendered prompt
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}
