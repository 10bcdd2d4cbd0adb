// SPDX-License-Identifier: MIT

//! State schema definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Declared keys of a workflow state.
///
/// An empty schema leaves the key set open; a non-empty one closes it.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct StateSchema {
    /// Field definitions
    #[serde(flatten)]
    pub fields: HashMap<String, StateFieldDef>,
}

impl StateSchema {
    /// Add a field, builder style
    pub fn field(mut self, name: impl Into<String>, def: StateFieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether `key` may be written to a state following this schema
    pub fn admits(&self, key: &str) -> bool {
        self.fields.is_empty() || self.fields.contains_key(key)
    }
}

/// Definition of a single state field
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateFieldDef {
    /// Type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Reducer for merging values
    #[serde(default)]
    pub reducer: ReducerType,
    /// Default value
    pub default: Option<Value>,
}

impl StateFieldDef {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            reducer: ReducerType::default(),
            default: None,
        }
    }

    pub fn with_reducer(mut self, reducer: ReducerType) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Supported field types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl FieldType {
    /// Whether `value` may be stored under a field of this type; `null`
    /// is admitted for every type
    pub fn admits(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Number, Value::Number(_)) => true,
            (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Array, Value::Array(_)) => true,
            (FieldType::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Built-in reducers, as named in YAML schemas
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Append to array
    Append,
    /// Keep maximum value
    Max,
    /// Keep minimum value
    Min,
    /// Shallow merge objects
    Merge,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_schema_deserialize() {
        let yaml = r#"
            messages:
              type: array
              reducer: append
              default: []
            confidence:
              type: number
              default: 0.0
            route:
              type: string
        "#;
        let schema: StateSchema = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields["messages"].reducer, ReducerType::Append);
        assert_eq!(schema.fields["confidence"].field_type, FieldType::Number);
        assert_eq!(schema.fields["confidence"].default, Some(json!(0.0)));
        assert_eq!(schema.fields["route"].reducer, ReducerType::Overwrite);
    }

    #[test]
    fn test_all_reducer_names() {
        let yaml = r#"
            f1: { type: string, reducer: overwrite }
            f2: { type: array, reducer: append }
            f3: { type: number, reducer: max }
            f4: { type: number, reducer: min }
            f5: { type: object, reducer: merge }
        "#;
        let schema: StateSchema = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(schema.fields["f1"].reducer, ReducerType::Overwrite);
        assert_eq!(schema.fields["f2"].reducer, ReducerType::Append);
        assert_eq!(schema.fields["f3"].reducer, ReducerType::Max);
        assert_eq!(schema.fields["f4"].reducer, ReducerType::Min);
        assert_eq!(schema.fields["f5"].reducer, ReducerType::Merge);
    }

    #[test]
    fn test_unknown_reducer_rejected() {
        let yaml = "f: { type: string, reducer: concat }";
        assert!(serde_yaml::from_str::<StateSchema>(yaml).is_err());
    }

    #[test]
    fn test_admits_open_and_closed() {
        let open = StateSchema::default();
        assert!(open.admits("anything"));

        let closed = StateSchema::default().field("messages", StateFieldDef::new(FieldType::Array));
        assert!(closed.admits("messages"));
        assert!(!closed.admits("route"));
    }

    #[test]
    fn test_field_type_admits() {
        assert!(FieldType::Number.admits(&json!(1.5)));
        assert!(!FieldType::Number.admits(&json!("1.5")));
        assert!(FieldType::Boolean.admits(&json!(false)));
        assert!(FieldType::Object.admits(&Value::Null));
        assert!(!FieldType::Array.admits(&json!({})));
        assert_eq!(FieldType::Array.to_string(), "array");
    }
}
