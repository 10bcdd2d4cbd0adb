// SPDX-License-Identifier: MIT

//! Agent executor - tool-calling loop with mandatory tools and validation
//!
//! One exchange appends a human turn, asks the model, and keeps answering
//! tool calls until the model replies without any. Corrective human turns are
//! added when mandatory tools were skipped or when the final content fails the
//! structured output contract. Both corrections are bounded.

use super::output::StructuredOutput;
use super::prompt::{PromptRenderer, PromptTemplate};
use crate::adk::callbacks::CallbackManager;
use crate::adk::error::{ExecutionError, ToolError};
use crate::adk::message::{Message, ToolCall, ToolResponse};
use crate::adk::model::Model;
use crate::adk::runnable::Runnable;
use crate::adk::tool::{Tool, ToolSet};
use crate::strand::workflow::types::{
    AgentSettings, DEFAULT_CORRECTION_DEPTH, DEFAULT_MAX_TOOL_ROUNDS, DEFAULT_VALIDATION_ATTEMPTS,
};
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

const UNKNOWN_TOOL_REPLY: &str = "ERROR: Unknown tool. Try another tool or don't use a tool.";

/// Result of one exchange
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome {
    /// Content of the accepted reply
    Answer(Value),
    /// The exchange aborted; carries the error text
    Failed(String),
}

impl AgentOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, AgentOutcome::Failed(_))
    }

    pub fn content(&self) -> Option<&Value> {
        match self {
            AgentOutcome::Answer(content) => Some(content),
            AgentOutcome::Failed(_) => None,
        }
    }

    /// The answer content, or `{"error": message}`
    pub fn into_value(self) -> Value {
        match self {
            AgentOutcome::Answer(content) => content,
            AgentOutcome::Failed(message) => json!({ "error": message }),
        }
    }
}

/// Outcome of an exchange together with the history it left behind
#[derive(Debug, Clone)]
pub struct AgentTurn {
    pub outcome: AgentOutcome,
    pub history: Vec<Message>,
}

/// Tool-calling agent over a text-generation [`Model`]
pub struct AgentExecutor {
    name: String,
    model: Arc<dyn Model>,
    system: Option<String>,
    tools: ToolSet,
    tool_choices: Vec<String>,
    structured_output: Option<StructuredOutput>,
    examples: Vec<Value>,
    template: PromptTemplate,
    renderer: Option<Arc<dyn PromptRenderer>>,
    callbacks: Option<CallbackManager>,
    validation_attempts: u32,
    correction_depth: u32,
    max_tool_rounds: u32,
}

impl AgentExecutor {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            name: "AgentExecutor".to_string(),
            model,
            system: None,
            tools: ToolSet::default(),
            tool_choices: Vec::new(),
            structured_output: None,
            examples: Vec::new(),
            template: PromptTemplate::default(),
            renderer: None,
            callbacks: None,
            validation_attempts: DEFAULT_VALIDATION_ATTEMPTS,
            correction_depth: DEFAULT_CORRECTION_DEPTH,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self.refresh_template();
        self
    }

    /// Bind the tool set; every name in `tool_choices` must be called at
    /// least once per exchange
    pub fn bind_tools(mut self, tools: Vec<Arc<dyn Tool>>, tool_choices: Vec<String>) -> Self {
        self.tools = ToolSet::new(tools);
        for choice in &tool_choices {
            if !self.tools.contains(choice) {
                log::warn!("Agent {}: mandatory tool {} is not bound", self.name, choice);
            }
        }
        self.tool_choices = tool_choices;
        self.refresh_template();
        self
    }

    pub fn with_structured_output(mut self, output: StructuredOutput) -> Self {
        self.structured_output = Some(output);
        self.refresh_template();
        self
    }

    pub fn with_examples(mut self, examples: Vec<Value>) -> Self {
        self.examples = examples;
        self.refresh_template();
        self
    }

    /// Replace the default prompt layout
    pub fn with_renderer(mut self, renderer: Arc<dyn PromptRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_callbacks(mut self, callbacks: CallbackManager) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    /// Apply name, role, budgets and examples from settings.
    ///
    /// `tool_choices` only take effect for tools bound afterwards or already
    /// bound.
    pub fn with_settings(mut self, settings: &AgentSettings) -> Self {
        self.name = settings.name.clone();
        self.system = settings.system.clone();
        self.tool_choices = settings.tool_choices.clone();
        self.validation_attempts = settings.validation_attempts;
        self.correction_depth = settings.correction_depth;
        self.max_tool_rounds = settings.max_tool_rounds;
        self.examples = settings.examples.clone();
        self.refresh_template();
        self
    }

    pub fn tool_choices(&self) -> &[String] {
        &self.tool_choices
    }

    fn refresh_template(&mut self) {
        let mut template = PromptTemplate::new()
            .with_tools(
                self.tools.schemas().into_iter().cloned().collect(),
                self.tool_choices.clone(),
            )
            .with_output_schema(self.structured_output.as_ref().map(|o| o.schema().clone()))
            .with_examples(self.examples.clone());
        if let Some(system) = &self.system {
            template = template.with_system(system.clone());
        }
        self.template = template;
    }

    fn renderer(&self) -> &dyn PromptRenderer {
        match &self.renderer {
            Some(renderer) => renderer.as_ref(),
            None => &self.template,
        }
    }

    /// Run one exchange on top of `history` and hand the history back
    pub async fn run(&self, query: &str, history: Vec<Message>) -> AgentTurn {
        self.run_with(query, history, self.callbacks.as_ref()).await
    }

    /// Run one exchange from an empty history
    pub async fn run_once(&self, query: &str) -> AgentOutcome {
        self.run(query, Vec::new()).await.outcome
    }

    async fn run_with(
        &self,
        query: &str,
        mut history: Vec<Message>,
        callbacks: Option<&CallbackManager>,
    ) -> AgentTurn {
        if let Some(cb) = callbacks {
            cb.on_invoke_start(&self.name, &json!(query));
        }

        let outcome = match self.exchange(query, &mut history, callbacks).await {
            Ok(reply) => AgentOutcome::Answer(reply.content),
            Err(e) => {
                log::error!("Agent {} failed: {}", self.name, e);
                AgentOutcome::Failed(e.to_string())
            }
        };

        if let Some(cb) = callbacks {
            cb.on_invoke_end(&self.name, &outcome.clone().into_value());
        }
        AgentTurn { outcome, history }
    }

    async fn exchange(
        &self,
        query: &str,
        history: &mut Vec<Message>,
        callbacks: Option<&CallbackManager>,
    ) -> Result<Message, ExecutionError> {
        history.push(Message::human(query));
        let mut called = BTreeSet::new();

        let mut reply = self.ask(history).await?;
        reply = self
            .resolve_tool_calls(reply, history, &mut called, callbacks)
            .await?;

        let mut corrections = 0;
        loop {
            let mut missing: Vec<&str> = self
                .tool_choices
                .iter()
                .filter(|choice| !called.contains(choice.as_str()))
                .map(String::as_str)
                .collect();
            missing.sort_unstable();
            missing.dedup();
            if missing.is_empty() {
                break;
            }
            if corrections >= self.correction_depth {
                log::warn!(
                    "Agent {} accepting reply without mandatory tools: {}",
                    self.name,
                    missing.join(", ")
                );
                break;
            }
            corrections += 1;
            log::info!(
                "Agent {} correction {}/{}: missing tools {}",
                self.name,
                corrections,
                self.correction_depth,
                missing.join(", ")
            );

            history.push(Message::human(format!(
                "The tools [{}] were not used in the conversation.",
                missing.join(", ")
            )));
            reply = self.ask(history).await?;
            reply = self
                .resolve_tool_calls(reply, history, &mut called, callbacks)
                .await?;
        }

        match &self.structured_output {
            Some(output) => self.enforce_output(reply, output, history).await,
            None => Ok(reply),
        }
    }

    /// Render, generate, parse and append the reply
    async fn ask(&self, history: &mut Vec<Message>) -> Result<Message, ExecutionError> {
        let prompt = self.renderer().render(history);
        let raw = self.model.generate(&prompt).await?;
        let reply = Message::from_model_text(&raw);
        log::debug!(
            "Agent {} reply: {} ({} tool calls)",
            self.name,
            reply.content_text(),
            reply.pending_tool_calls().len()
        );
        history.push(reply.clone());
        Ok(reply)
    }

    async fn resolve_tool_calls(
        &self,
        mut reply: Message,
        history: &mut Vec<Message>,
        called: &mut BTreeSet<String>,
        callbacks: Option<&CallbackManager>,
    ) -> Result<Message, ExecutionError> {
        let mut round = 0;
        while !reply.pending_tool_calls().is_empty() {
            if round >= self.max_tool_rounds {
                log::warn!(
                    "Agent {} reached {} tool rounds, accepting last reply",
                    self.name,
                    self.max_tool_rounds
                );
                break;
            }
            round += 1;
            log::info!(
                "Agent {} tool round {}/{}",
                self.name,
                round,
                self.max_tool_rounds
            );

            let mut responses = Vec::with_capacity(reply.pending_tool_calls().len());
            for call in reply.pending_tool_calls() {
                if self.tools.contains(&call.name) {
                    called.insert(call.name.clone());
                }
                responses.push(self.dispatch(call, callbacks).await);
            }
            history.push(Message::tool_results(responses));

            reply = self.ask(history).await?;
        }
        Ok(reply)
    }

    /// Execute one tool call; failures and panics become error responses
    async fn dispatch(&self, call: &ToolCall, callbacks: Option<&CallbackManager>) -> ToolResponse {
        let Some(tool) = self.tools.get(&call.name) else {
            log::error!("Agent {}: {}", self.name, ToolError::UnknownTool(call.name.clone()));
            return ToolResponse::new(&call.name, UNKNOWN_TOOL_REPLY);
        };

        let arguments = Value::Object(call.arguments.clone());
        log::info!("Tool call: {} {}", call.name, arguments);
        if let Some(cb) = callbacks {
            cb.on_invoke_start(tool.name(), &arguments);
        }

        let result = AssertUnwindSafe(tool.execute(arguments))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ToolError::Execution {
                    tool: call.name.clone(),
                    message: format!("panicked: {}", panic_message(panic.as_ref())),
                })
            });
        let content = match result {
            Ok(Value::String(text)) => text,
            Ok(result) => result.to_string(),
            Err(e) => {
                log::error!("Tool {} failed: {}", call.name, e);
                format!("Error: {}", e)
            }
        };

        if let Some(cb) = callbacks {
            cb.on_invoke_end(tool.name(), &json!(content));
        }
        ToolResponse::new(&call.name, content)
    }

    /// Re-ask until the content satisfies the contract or attempts run out.
    ///
    /// After a late success the retry turns are pruned: history is cut back
    /// to just before the first validated reply and the accepted reply is
    /// appended in its place.
    async fn enforce_output(
        &self,
        mut reply: Message,
        output: &StructuredOutput,
        history: &mut Vec<Message>,
    ) -> Result<Message, ExecutionError> {
        let first_reply = history.len().saturating_sub(1);
        let max_attempts = self.validation_attempts.max(1);
        let mut attempt = 1;

        loop {
            match output.validate(&reply.content) {
                Ok(()) => break,
                Err(error) if attempt < max_attempts => {
                    log::warn!(
                        "Agent {} output attempt {}/{} rejected: {}",
                        self.name,
                        attempt,
                        max_attempts,
                        error
                    );
                    attempt += 1;
                    history.push(Message::human(format!(
                        "The reply content did not validate against the {} schema. Validation error: {}. Don't be apologetic! Reply with the corrected \"content\" field directly, nothing else.",
                        output.name(),
                        error
                    )));
                    reply = self.ask(history).await?;
                }
                Err(error) => {
                    log::warn!(
                        "Agent {} accepting invalid output after {} attempts: {}",
                        self.name,
                        attempt,
                        error
                    );
                    return Ok(reply);
                }
            }
        }

        if attempt > 1 {
            history.truncate(first_reply);
            history.push(reply.clone());
        }
        Ok(reply)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[async_trait]
impl Runnable for AgentExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    /// Stateless exchange: a string input is the query, output is the content
    /// or `{"error": message}`
    async fn invoke(
        &self,
        input: Value,
        callbacks: Option<&CallbackManager>,
    ) -> Result<Value, ExecutionError> {
        let query = match input {
            Value::String(query) => query,
            other => other.to_string(),
        };
        let callbacks = callbacks.or(self.callbacks.as_ref());
        let turn = self.run_with(&query, Vec::new(), callbacks).await;
        Ok(turn.outcome.into_value())
    }
}
