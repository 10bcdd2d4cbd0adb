// SPDX-License-Identifier: MIT

//! Closure-backed tools with typed arguments

use super::{Tool, ToolSchema};
use crate::adk::error::ToolError;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::marker::PhantomData;

/// A tool backed by a synchronous function of a typed argument struct.
///
/// The schema is reflected from `A` once, at construction. At call time the
/// argument object is deserialized into `A`; a missing or wrong-typed field is
/// reported as [`ToolError::InvalidArguments`].
pub struct FunctionTool<A, F> {
    schema: ToolSchema,
    func: F,
    _args: PhantomData<fn(A)>,
}

impl<A, F, R, E> FunctionTool<A, F>
where
    A: DeserializeOwned + JsonSchema,
    F: Fn(A) -> Result<R, E> + Send + Sync,
    R: Serialize,
    E: Display,
{
    pub fn new(name: impl Into<String>, description: impl Into<String>, func: F) -> Self {
        Self {
            schema: ToolSchema::for_args::<A>(name, description),
            func,
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<A, F, R, E> Tool for FunctionTool<A, F>
where
    A: DeserializeOwned + JsonSchema + 'static,
    F: Fn(A) -> Result<R, E> + Send + Sync + 'static,
    R: Serialize + 'static,
    E: Display + 'static,
{
    fn name(&self) -> &str {
        &self.schema.name
    }

    fn description(&self) -> &str {
        &self.schema.description
    }

    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, arguments: Value) -> Result<Value, ToolError> {
        let args: A =
            serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
                tool: self.schema.name.clone(),
                message: e.to_string(),
            })?;

        let result = (self.func)(args).map_err(|e| ToolError::Execution {
            tool: self.schema.name.clone(),
            message: e.to_string(),
        })?;

        serde_json::to_value(result).map_err(|e| ToolError::Execution {
            tool: self.schema.name.clone(),
            message: e.to_string(),
        })
    }
}
