// SPDX-License-Identifier: MIT

//! Agent development kit: runnables, instrumentation, tools, models and the
//! agent loop

pub mod agent;
pub mod callbacks;
pub mod error;
pub mod message;
pub mod model;
pub mod runnable;
pub mod tool;
