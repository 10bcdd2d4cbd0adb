// SPDX-License-Identifier: MIT

//! Runnable components and combinators
//!
//! Every composable unit implements [`Runnable`]: one `invoke` taking a JSON
//! value and returning a JSON value. The combinators in this module build
//! larger runnables out of smaller ones:
//! - [`RunnableLambda`] - wraps a closure
//! - [`Chain`] - feeds the output of one runnable into the next
//! - [`RunnableParallel`] - same input to several named branches
//! - [`RunnableBranch`] - first matching predicate wins
//! - [`RunnablePassthrough`] - identity or key projection

use crate::adk::callbacks::CallbackManager;
use crate::adk::error::ExecutionError;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Core trait for all composable components
#[async_trait]
pub trait Runnable: Send + Sync {
    /// Name reported to instrumentation
    fn name(&self) -> &str;

    /// Execute with the given input
    async fn invoke(
        &self,
        input: Value,
        callbacks: Option<&CallbackManager>,
    ) -> Result<Value, ExecutionError>;
}

type LambdaFn = dyn Fn(Value) -> Result<Value, ExecutionError> + Send + Sync;

/// Wraps a function as a runnable
pub struct RunnableLambda {
    name: String,
    func: Box<LambdaFn>,
}

impl RunnableLambda {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl Runnable for RunnableLambda {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        input: Value,
        callbacks: Option<&CallbackManager>,
    ) -> Result<Value, ExecutionError> {
        if let Some(cb) = callbacks {
            cb.on_invoke_start(&self.name, &input);
        }

        let result = (self.func)(input);

        if let Some(cb) = callbacks {
            cb.on_invoke_result(&self.name, &result);
        }
        result
    }
}

/// Sequential composition of two runnables
pub struct Chain {
    name: String,
    first: Arc<dyn Runnable>,
    second: Arc<dyn Runnable>,
}

impl Chain {
    pub fn new(first: Arc<dyn Runnable>, second: Arc<dyn Runnable>) -> Self {
        Self {
            name: format!("{} | {}", first.name(), second.name()),
            first,
            second,
        }
    }

    /// Append another step, nesting this chain as the first half
    pub fn pipe(self, next: Arc<dyn Runnable>) -> Chain {
        Chain::new(Arc::new(self), next)
    }
}

#[async_trait]
impl Runnable for Chain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        input: Value,
        callbacks: Option<&CallbackManager>,
    ) -> Result<Value, ExecutionError> {
        if let Some(cb) = callbacks {
            cb.on_invoke_start(&self.name, &input);
        }

        let result = match self.first.invoke(input, callbacks).await {
            Ok(intermediate) => self.second.invoke(intermediate, callbacks).await,
            Err(e) => Err(e),
        };

        if let Some(cb) = callbacks {
            cb.on_invoke_result(&self.name, &result);
        }
        result
    }
}

/// Runs several runnables on the same input and collects their outputs into
/// an object keyed by branch name.
///
/// Branches are polled together on the calling task; each one receives its
/// own copy of the input. The first failing branch aborts the whole group.
pub struct RunnableParallel {
    name: String,
    branches: Vec<(String, Arc<dyn Runnable>)>,
}

impl RunnableParallel {
    pub fn new() -> Self {
        Self::named("Parallel")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branches: Vec::new(),
        }
    }

    /// Add a branch; a repeated key replaces the earlier runnable
    pub fn branch(mut self, key: impl Into<String>, runnable: Arc<dyn Runnable>) -> Self {
        let key = key.into();
        match self.branches.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = runnable,
            None => self.branches.push((key, runnable)),
        }
        self
    }
}

impl Default for RunnableParallel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runnable for RunnableParallel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        input: Value,
        callbacks: Option<&CallbackManager>,
    ) -> Result<Value, ExecutionError> {
        if let Some(cb) = callbacks {
            cb.on_invoke_start(&self.name, &input);
        }

        let pending = self.branches.iter().map(|(key, runnable)| {
            let branch_input = input.clone();
            async move {
                let out = runnable.invoke(branch_input, callbacks).await?;
                Ok::<_, ExecutionError>((key.clone(), out))
            }
        });
        let result = try_join_all(pending)
            .await
            .map(|outputs| Value::Object(outputs.into_iter().collect::<Map<String, Value>>()));

        if let Some(cb) = callbacks {
            cb.on_invoke_result(&self.name, &result);
        }
        result
    }
}

type Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Conditional dispatch: runs the handler of the first predicate that holds.
///
/// When nothing matches the result is `Value::Null`; that is a normal outcome,
/// not an error.
pub struct RunnableBranch {
    name: String,
    branches: Vec<(Predicate, Arc<dyn Runnable>)>,
}

impl RunnableBranch {
    pub fn new() -> Self {
        Self::named("Branch")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branches: Vec::new(),
        }
    }

    /// Append a (predicate, handler) pair; pairs are tried in insertion order
    pub fn when<P>(mut self, predicate: P, handler: Arc<dyn Runnable>) -> Self
    where
        P: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.branches.push((Box::new(predicate), handler));
        self
    }
}

impl Default for RunnableBranch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runnable for RunnableBranch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        input: Value,
        callbacks: Option<&CallbackManager>,
    ) -> Result<Value, ExecutionError> {
        if let Some(cb) = callbacks {
            cb.on_invoke_start(&self.name, &input);
        }

        let handler = self
            .branches
            .iter()
            .find(|(predicate, _)| predicate(&input))
            .map(|(_, handler)| handler);

        let result = match handler {
            Some(handler) => handler.invoke(input, callbacks).await,
            None => {
                log::debug!("Branch {} matched no predicate", self.name);
                Ok(Value::Null)
            }
        };

        if let Some(cb) = callbacks {
            cb.on_invoke_result(&self.name, &result);
        }
        result
    }
}

/// Passes the input through, whole or projected to a set of keys.
///
/// With exactly one key the value under that key is returned unwrapped
/// (`Null` when absent); with several keys a sub-object holding only the
/// present keys is returned.
pub struct RunnablePassthrough {
    name: String,
    keys: Option<Vec<String>>,
}

impl RunnablePassthrough {
    pub fn all() -> Self {
        Self {
            name: "Passthrough".to_string(),
            keys: None,
        }
    }

    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: "Passthrough".to_string(),
            keys: Some(keys.into_iter().map(Into::into).collect()),
        }
    }

    fn project(&self, input: Value) -> Value {
        let Some(keys) = &self.keys else {
            return input;
        };

        match keys.as_slice() {
            [single] => input.get(single).cloned().unwrap_or(Value::Null),
            _ => {
                let projected: Map<String, Value> = keys
                    .iter()
                    .filter_map(|k| input.get(k).map(|v| (k.clone(), v.clone())))
                    .collect();
                Value::Object(projected)
            }
        }
    }
}

#[async_trait]
impl Runnable for RunnablePassthrough {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        input: Value,
        callbacks: Option<&CallbackManager>,
    ) -> Result<Value, ExecutionError> {
        if let Some(cb) = callbacks {
            cb.on_invoke_start(&self.name, &input);
        }

        let output = self.project(input);

        if let Some(cb) = callbacks {
            cb.on_invoke_end(&self.name, &output);
        }
        Ok(output)
    }
}
