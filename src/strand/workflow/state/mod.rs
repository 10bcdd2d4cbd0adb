// SPDX-License-Identifier: MIT

//! State management for graph workflows
//!
//! This module provides:
//! - `StateSchema` - declares the keys, types and defaults of workflow state
//! - `WorkflowState` - runtime state storage with reducer support
//! - `Reducer` - strategies for merging values into state

mod schema;
mod store;

pub use schema::{FieldType, ReducerType, StateFieldDef, StateSchema};
pub use store::{MergeFn, Reducer, WorkflowState};
