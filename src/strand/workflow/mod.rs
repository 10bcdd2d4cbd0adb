// SPDX-License-Identifier: MIT

pub mod graph;
pub mod loader;
pub mod state;
pub mod types;
