// SPDX-License-Identifier: MIT

//! Agent module - the tool-calling agent loop
//!
//! - `AgentExecutor` - asks the model, answers its tool calls and enforces
//!   mandatory tools and structured output
//! - `PromptTemplate` - default prompt layout behind the `PromptRenderer` seam
//! - `StructuredOutput` - schema and validator for the final reply content

mod executor;
mod output;
mod prompt;

pub use executor::{AgentExecutor, AgentOutcome, AgentTurn};
pub use output::StructuredOutput;
pub use prompt::{PromptRenderer, PromptTemplate};
