// SPDX-License-Identifier: MIT

//! Structured output contracts

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type Validator = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

/// A schema the final reply content must satisfy.
///
/// The schema is shown to the model in the output contract; the validator
/// decides whether a reply is accepted.
#[derive(Clone)]
pub struct StructuredOutput {
    name: String,
    schema: Value,
    validator: Arc<Validator>,
}

impl StructuredOutput {
    /// Contract for content deserializable into `T`
    pub fn of<T: JsonSchema + DeserializeOwned + 'static>() -> Self {
        let schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or(Value::Null);
        Self::new(T::schema_name(), schema, |content: &Value| {
            serde_json::from_value::<T>(content.clone())
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
    }

    /// Contract from a raw schema and a custom validator
    pub fn new<F>(name: impl Into<String>, schema: Value, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            schema,
            validator: Arc::new(validator),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    pub fn validate(&self, content: &Value) -> Result<(), String> {
        (self.validator)(content)
    }
}

impl fmt::Debug for StructuredOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredOutput")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish()
    }
}
