// SPDX-License-Identifier: MIT

//! Graph vertices

use crate::adk::runnable::Runnable;
use crate::strand::workflow::state::WorkflowState;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Index of a node in its graph's arena
pub type NodeId = usize;

/// Discriminator of a conditional node: maps the state to a transition key
pub type Resolver = Arc<dyn Fn(&WorkflowState) -> String + Send + Sync>;

pub enum NodeKind {
    /// Transforms the state into a partial update
    Action(Arc<dyn Runnable>),
    /// Picks the next node; synthesized by `Graph::add_conditional_edges`
    Conditional {
        resolver: Resolver,
        transitions: HashMap<String, NodeId>,
    },
}

/// A named vertex with at most one unconditional successor
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub next: Option<NodeId>,
}

impl Node {
    pub fn action(name: impl Into<String>, runnable: Arc<dyn Runnable>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Action(runnable),
            next: None,
        }
    }

    pub fn conditional(
        name: impl Into<String>,
        resolver: Resolver,
        transitions: HashMap<String, NodeId>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Conditional {
                resolver,
                transitions,
            },
            next: None,
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self.kind, NodeKind::Conditional { .. })
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            NodeKind::Action(r) => format!("Action({})", r.name()),
            NodeKind::Conditional { transitions, .. } => {
                let mut keys: Vec<&str> = transitions.keys().map(String::as_str).collect();
                keys.sort_unstable();
                format!("Conditional({})", keys.join(", "))
            }
        };
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &kind)
            .field("next", &self.next)
            .finish()
    }
}
