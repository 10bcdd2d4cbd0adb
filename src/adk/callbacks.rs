// SPDX-License-Identifier: MIT

//! Instrumentation fan-out
//!
//! A [`CallbackManager`] forwards start/end notifications around every
//! runnable invocation to an ordered list of handlers. Handlers observe only:
//! a failing handler is logged and skipped, it never changes control flow or
//! the value being passed through.

use crate::adk::error::CallbackError;
use serde_json::{json, Value};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Observer of invocation start/end events
pub trait CallbackHandler: Send + Sync {
    /// Called before a runnable executes
    fn on_invoke_start(&self, name: &str, input: &Value) -> Result<(), CallbackError>;

    /// Called after a runnable completed
    fn on_invoke_end(&self, name: &str, output: &Value) -> Result<(), CallbackError>;
}

/// Distributes callbacks to a list of handlers.
///
/// Start events go to handlers in registration order, end events in reverse
/// order, so a handler registered first wraps every other handler's output.
#[derive(Clone, Default)]
pub struct CallbackManager {
    handlers: Vec<Arc<dyn CallbackHandler>>,
}

impl CallbackManager {
    pub fn new(handlers: Vec<Arc<dyn CallbackHandler>>) -> Self {
        Self { handlers }
    }

    /// Add a handler after the existing ones
    pub fn with_handler(mut self, handler: Arc<dyn CallbackHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Notify all handlers that `name` started with `input`
    pub fn on_invoke_start(&self, name: &str, input: &Value) {
        for handler in &self.handlers {
            if let Err(e) = handler.on_invoke_start(name, input) {
                log::warn!("Ignoring callback failure on start of {}: {}", name, e);
            }
        }
    }

    /// Notify all handlers that `name` finished with `output`
    pub fn on_invoke_end(&self, name: &str, output: &Value) {
        for handler in self.handlers.iter().rev() {
            if let Err(e) = handler.on_invoke_end(name, output) {
                log::warn!("Ignoring callback failure on end of {}: {}", name, e);
            }
        }
    }

    /// Close the invocation of `name` whatever its result.
    ///
    /// A failure is reported as `{"error": message}` so every start event
    /// gets its end event.
    pub fn on_invoke_result<E: fmt::Display>(&self, name: &str, result: &Result<Value, E>) {
        match result {
            Ok(output) => self.on_invoke_end(name, output),
            Err(e) => self.on_invoke_end(name, &json!({ "error": e.to_string() })),
        }
    }
}

impl fmt::Debug for CallbackManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackManager")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Shared, clonable list of trace lines
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_log(&self, message: String) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
    }

    /// Snapshot of all stored lines
    pub fn logs(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

/// Records `Starting:` / `Finished:` lines into a [`TraceLog`], indented by
/// nesting depth.
#[derive(Debug)]
pub struct TraceCallbackHandler {
    trace_log: TraceLog,
    indent: AtomicUsize,
    indent_step: usize,
}

impl TraceCallbackHandler {
    pub fn new(trace_log: TraceLog) -> Self {
        Self::with_indent_step(trace_log, 2)
    }

    pub fn with_indent_step(trace_log: TraceLog, indent_step: usize) -> Self {
        Self {
            trace_log,
            indent: AtomicUsize::new(0),
            indent_step,
        }
    }
}

impl CallbackHandler for TraceCallbackHandler {
    fn on_invoke_start(&self, name: &str, input: &Value) -> Result<(), CallbackError> {
        let indent = self.indent.fetch_add(self.indent_step, Ordering::SeqCst);
        self.trace_log.add_log(format!(
            "{}Starting: {} with input: {}",
            " ".repeat(indent),
            name,
            input
        ));
        Ok(())
    }

    fn on_invoke_end(&self, name: &str, output: &Value) -> Result<(), CallbackError> {
        let step = self.indent_step;
        let previous = self
            .indent
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| {
                Some(i.saturating_sub(step))
            })
            .unwrap_or(0);
        self.trace_log.add_log(format!(
            "{}Finished: {} with output: {}",
            " ".repeat(previous.saturating_sub(step)),
            name,
            output
        ));
        Ok(())
    }
}

/// Emits every event through the `log` facade at debug level
#[derive(Debug, Default)]
pub struct LogCallbackHandler;

impl CallbackHandler for LogCallbackHandler {
    fn on_invoke_start(&self, name: &str, input: &Value) -> Result<(), CallbackError> {
        log::debug!("Starting: {} with input: {}", name, input);
        Ok(())
    }

    fn on_invoke_end(&self, name: &str, output: &Value) -> Result<(), CallbackError> {
        log::debug!("Finished: {} with output: {}", name, output);
        Ok(())
    }
}
