// SPDX-License-Identifier: MIT

//! strand-rs - composable runnables, a graph workflow interpreter and a
//! tool-calling agent loop

pub mod adk;
pub mod strand;
