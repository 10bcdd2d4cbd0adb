// SPDX-License-Identifier: MIT

//! Tools callable by the agent loop
//!
//! - [`Tool`] - the trait every tool implements
//! - [`schema`] - derives the model-facing [`ToolSchema`] from typed arguments
//! - [`FunctionTool`] - binds a plain closure with typed arguments
//! - [`ToolSet`] - an ordered, name-indexed set of bound tools

mod function;
pub mod schema;

pub use function::FunctionTool;
pub use schema::ToolSchema;

use crate::adk::error::ToolError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for tools that can be called by agents.
///
/// `name()` and `schema()` return references; implementations store the
/// schema once at construction.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name (must be unique within an agent's tool set)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Returns the schema shown to the model
    fn schema(&self) -> &ToolSchema;

    /// Execute the tool with the given argument object and return the result
    async fn execute(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// Ordered set of tools with O(1) lookup by name
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolSet {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let mut set = Self::default();
        for tool in tools {
            set.insert(tool);
        }
        set
    }

    /// Add a tool; a tool with the same name is replaced in place
    pub fn insert(&mut self, tool: Arc<dyn Tool>) {
        match self.index.get(tool.name()) {
            Some(&i) => self.tools[i] = tool,
            None => {
                self.index.insert(tool.name().to_string(), self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Tools in binding order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    /// Schemas of all tools in binding order
    pub fn schemas(&self) -> Vec<&ToolSchema> {
        self.tools.iter().map(|t| t.schema()).collect()
    }
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| t.name()))
            .finish()
    }
}
