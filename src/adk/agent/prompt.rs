// SPDX-License-Identifier: MIT

//! Prompt rendering for the agent loop
//!
//! A prompt is assembled from up to five sections, separated by blank lines:
//! role, tool catalog, examples, message history and the output contract.

use crate::adk::message::Message;
use crate::adk::tool::ToolSchema;
use serde_json::Value;

const DEFAULT_SYSTEM: &str = "You are a helpful AI assistant.";

const NO_TOOLS: &str = "You CANNOT use any tools in this task.";

const TOOL_GUIDELINES: &str = "**Tool Use Guidelines:**
- Use tools only when necessary
- Explain in the \"content\" field which tools you use and why, what their outputs mean and what you conclude
- Call tools in separate messages, one round at a time
- Follow the exact argument types from the schema:
  - numbers as integers or floats, not strings
  - arrays with the correct element types
  - booleans as true/false
  - literal values only, no expressions
- If a tool reports a type error, fix the arguments and call it again";

/// Turns the conversation history into the prompt sent to the model
pub trait PromptRenderer: Send + Sync {
    fn render(&self, history: &[Message]) -> String;
}

/// Default prompt layout
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: String,
    tools: Vec<ToolSchema>,
    tool_choices: Vec<String>,
    output_schema: Option<Value>,
    examples: Vec<Value>,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM.to_string(),
            tools: Vec::new(),
            tool_choices: Vec::new(),
            output_schema: None,
            examples: Vec::new(),
        }
    }
}

impl PromptTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>, tool_choices: Vec<String>) -> Self {
        self.tools = tools;
        self.tool_choices = tool_choices;
        self
    }

    pub fn with_output_schema(mut self, schema: Option<Value>) -> Self {
        self.output_schema = schema;
        self
    }

    pub fn with_examples(mut self, examples: Vec<Value>) -> Self {
        self.examples = examples;
        self
    }

    fn role_section(&self) -> String {
        format!(
            "Your role definition, NEVER switch your role:\n{}",
            self.system
        )
    }

    fn tools_section(&self) -> String {
        if self.tools.is_empty() {
            return NO_TOOLS.to_string();
        }

        let mut out = String::from("**You have access to the following tools:**\n");
        for tool in &self.tools {
            let arguments = serde_json::to_string_pretty(&tool.arguments).unwrap_or_default();
            out.push_str(&format!(
                "- **{}**: {}\n  Arguments:\n{}\n",
                tool.name, tool.description, arguments
            ));
        }
        out.push('\n');
        out.push_str(TOOL_GUIDELINES);
        if !self.tool_choices.is_empty() {
            out.push_str(&format!(
                "\n\nYou MUST use the following tools: {}",
                self.tool_choices.join(", ")
            ));
        }
        out
    }

    fn examples_section(&self) -> Option<String> {
        if self.examples.is_empty() {
            return None;
        }
        let examples = serde_json::to_string_pretty(&self.examples).unwrap_or_default();
        Some(format!(
            "**Examples:**\n{}\nDo not copy the examples. Use them as a reference for the structure of your reply.",
            examples
        ))
    }

    fn history_section(history: &[Message]) -> String {
        let history = serde_json::to_string_pretty(history).unwrap_or_default();
        format!("**Current Message History:**\n{}", history)
    }

    fn output_section(&self) -> String {
        let content = match &self.output_schema {
            Some(schema) => format!("<JSON object matching this JSON schema: {}>", schema),
            None => "\"<Your summarizing response or reasoning in Markdown format>\"".to_string(),
        };

        format!(
            r#"Your reply MUST be a single valid JSON object with this structure:
{{
    "role": "AI",
    "reasoning": "<concise reasoning about your \"content\" and your \"tool_calls\">",
    "content": {},
    "tool_calls": [
        {{
            "name": "<tool_name>",
            "arguments": {{
                "arg1": <LITERAL_VALUE>,
                "arg2": <LITERAL_VALUE>
            }}
        }}
    ] OR <null if no tool calls are needed or no tools are available>
}}

Replies in any other format cause errors. Fix them by adjusting the format."#,
            content
        )
    }
}

impl PromptRenderer for PromptTemplate {
    fn render(&self, history: &[Message]) -> String {
        let mut sections = vec![self.role_section(), self.tools_section()];
        sections.extend(self.examples_section());
        sections.push(Self::history_section(history));
        sections.push(self.output_section());
        sections.join("\n\n")
    }
}
