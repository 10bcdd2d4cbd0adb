// SPDX-License-Identifier: MIT

//! Workflow layer: graph interpreter, state store and agent settings

pub mod workflow;
