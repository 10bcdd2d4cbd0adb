// SPDX-License-Identifier: MIT

//! Replay model - serves scripted replies in order

use super::Model;
use crate::adk::error::{ConfigError, ModelError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Model that returns pre-recorded replies one by one.
///
/// Once the script is used up it either repeats a fallback reply or fails with
/// [`ModelError::Exhausted`]. Every prompt it receives is kept for inspection.
pub struct ReplayModel {
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ReplayModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            fallback: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply served after the script is exhausted
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Load replies from a JSON file holding an array of strings
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let replies: Vec<String> = serde_json::from_str(&content)?;
        Ok(Self::new(replies))
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl Model for ReplayModel {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());

        let next = self
            .replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        match (next, &self.fallback) {
            (Some(reply), _) => Ok(reply),
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(ModelError::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_exhausts() {
        let model = ReplayModel::new(["first", "second"]);

        assert_eq!(model.generate("p1").await.unwrap(), "first");
        assert_eq!(model.generate("p2").await.unwrap(), "second");
        assert!(matches!(
            model.generate("p3").await,
            Err(ModelError::Exhausted)
        ));
        assert_eq!(model.prompts(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_fallback_repeats() {
        let model = ReplayModel::new(Vec::<String>::new()).with_fallback("again");

        assert_eq!(model.generate("a").await.unwrap(), "again");
        assert_eq!(model.generate("b").await.unwrap(), "again");
        assert_eq!(model.call_count(), 2);
    }
}
