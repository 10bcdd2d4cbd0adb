// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::schema::{FieldType, ReducerType, StateSchema};
use crate::adk::error::ExecutionError;

/// Merge function for a custom reducer: `(current, incoming) -> new value`
pub type MergeFn = dyn Fn(Option<&Value>, Value) -> Value + Send + Sync;

/// Strategy used to merge an incoming value into a state key
#[derive(Clone)]
pub enum Reducer {
    Builtin(ReducerType),
    Custom(Arc<MergeFn>),
}

impl Reducer {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, Value) -> Value + Send + Sync + 'static,
    {
        Reducer::Custom(Arc::new(f))
    }
}

impl From<ReducerType> for Reducer {
    fn from(reducer: ReducerType) -> Self {
        Reducer::Builtin(reducer)
    }
}

impl Default for Reducer {
    fn default() -> Self {
        Reducer::Builtin(ReducerType::Overwrite)
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Builtin(r) => write!(f, "{:?}", r),
            Reducer::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Runtime workflow state with reducer support
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    /// Current state values
    fields: HashMap<String, Value>,
    /// Reducers for each field
    reducers: HashMap<String, Reducer>,
    /// Declared type of each schema field
    types: HashMap<String, FieldType>,
    /// Admitted keys when the state follows a non-empty schema
    closed_keys: Option<HashSet<String>>,
}

impl WorkflowState {
    /// Create a new WorkflowState from a schema, seeding defaults
    pub fn new(schema: &StateSchema) -> Self {
        let mut fields = HashMap::new();
        let mut reducers = HashMap::new();
        let mut types = HashMap::new();

        for (name, def) in &schema.fields {
            if let Some(default) = &def.default {
                fields.insert(name.clone(), default.clone());
            }
            reducers.insert(name.clone(), Reducer::from(def.reducer));
            types.insert(name.clone(), def.field_type);
        }

        let closed_keys = if schema.is_empty() {
            None
        } else {
            Some(schema.fields.keys().cloned().collect())
        };

        Self {
            fields,
            reducers,
            types,
            closed_keys,
        }
    }

    /// Create an empty state with an open key set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) the reducer for a key
    pub fn set_reducer(&mut self, key: impl Into<String>, reducer: Reducer) {
        self.reducers.insert(key.into(), reducer);
    }

    fn check_key(&self, key: &str) -> Result<(), ExecutionError> {
        match &self.closed_keys {
            Some(keys) if !keys.contains(key) => Err(ExecutionError::config(format!(
                "State key '{}' is not declared in the schema",
                key
            ))),
            _ => Ok(()),
        }
    }

    fn check_type(&self, key: &str, value: &Value) -> Result<(), ExecutionError> {
        match self.types.get(key) {
            Some(field_type) if !field_type.admits(value) => Err(ExecutionError::config(format!(
                "State key '{}' is declared as {} but got {}",
                key, field_type, value
            ))),
            _ => Ok(()),
        }
    }

    /// Set a field directly, bypassing its reducer
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ExecutionError> {
        self.check_key(key)?;
        self.check_type(key, &value)?;
        self.fields.insert(key.to_string(), value);
        Ok(())
    }

    /// Update a field using the appropriate reducer.
    ///
    /// The merged value must match the field's declared type; on mismatch the
    /// state is left unchanged.
    pub fn update(&mut self, key: &str, value: Value) -> Result<(), ExecutionError> {
        self.check_key(key)?;

        let current = self.fields.get(key);
        let merged = match self.reducers.get(key).cloned().unwrap_or_default() {
            Reducer::Custom(merge) => Some(merge(current, value)),
            Reducer::Builtin(reducer) => reduce(reducer, key, current, value),
        };

        if let Some(merged) = merged {
            self.check_type(key, &merged)?;
            self.fields.insert(key.to_string(), merged);
        }
        Ok(())
    }

    /// Merge a partial update object key by key
    pub fn apply(&mut self, update: Map<String, Value>) -> Result<(), ExecutionError> {
        for (key, value) in update {
            self.update(&key, value)?;
        }
        Ok(())
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// New value for a key under a builtin reducer; `None` keeps the current one
fn reduce(reducer: ReducerType, key: &str, current: Option<&Value>, value: Value) -> Option<Value> {
    match reducer {
        ReducerType::Overwrite => Some(value),
        ReducerType::Append => match current.cloned().unwrap_or(Value::Array(vec![])) {
            Value::Array(mut items) => {
                match value {
                    Value::Array(new_items) => items.extend(new_items),
                    other => items.push(other),
                }
                Some(Value::Array(items))
            }
            _ => {
                log::warn!("Append to non-array state key '{}' ignored", key);
                None
            }
        },
        ReducerType::Max => {
            let new = value.as_f64()?;
            match current.and_then(Value::as_f64) {
                Some(c) if new <= c => None,
                _ => Some(value),
            }
        }
        ReducerType::Min => {
            let new = value.as_f64()?;
            match current.and_then(Value::as_f64) {
                Some(c) if new >= c => None,
                _ => Some(value),
            }
        }
        ReducerType::Merge => match (current.cloned().unwrap_or(Value::Object(Map::new())), value) {
            (Value::Object(mut merged), Value::Object(new_obj)) => {
                merged.extend(new_obj);
                Some(Value::Object(merged))
            }
            _ => None,
        },
    }
}
