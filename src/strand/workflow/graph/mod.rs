// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! This module provides the state-machine interpreter that walks named
//! nodes, routing through conditional edges and merging partial updates
//! into shared state.

pub mod executor;
pub mod node;

pub use executor::Graph;
pub use node::{Node, NodeId, NodeKind, Resolver};
