// SPDX-License-Identifier: MIT

//! Tool schema reflection
//!
//! A tool's parameters are declared as a struct deriving `JsonSchema` and
//! `Deserialize`. The schemars output is flattened into the compact catalog
//! format embedded in prompts:
//!
//! ```json
//! {
//!   "name": "add",
//!   "description": "Adds two numbers.",
//!   "arguments": {
//!     "type": "object",
//!     "properties": {"a": {"description": "a", "type": "integer"}},
//!     "required": ["a"]
//!   }
//! }
//! ```
//!
//! Keys are emitted in sorted order, so the same signature always yields the
//! same bytes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Model-facing description of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub arguments: Value,
}

impl ToolSchema {
    /// Derive the schema of a tool whose arguments deserialize into `A`
    pub fn for_args<A: JsonSchema>(name: impl Into<String>, description: impl Into<String>) -> Self {
        let root = serde_json::to_value(schemars::schema_for!(A)).unwrap_or(Value::Null);
        Self {
            name: name.into(),
            description: description.into(),
            arguments: arguments_from_root(&root),
        }
    }

    /// Names of parameters without a default
    pub fn required(&self) -> Vec<&str> {
        self.arguments["required"]
            .as_array()
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Nested `$ref` chains deeper than this are reported as plain objects
const MAX_REF_DEPTH: usize = 8;

/// Flatten a schemars root schema into `{type, properties, required}`
fn arguments_from_root(root: &Value) -> Value {
    let walker = SchemaWalker {
        definitions: root.get("definitions").and_then(Value::as_object),
    };

    let mut properties = Map::new();
    if let Some(props) = root.get("properties").and_then(Value::as_object) {
        for (param, schema) in props {
            let mut entry = Map::new();
            let description = schema
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or(param);
            entry.insert("description".to_string(), json!(description));
            entry.extend(walker.semantic_type(schema, 0));
            properties.insert(param.clone(), Value::Object(entry));
        }
    }

    let mut required: Vec<Value> = root
        .get("required")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    required.sort_by(|a, b| a.as_str().cmp(&b.as_str()));

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

struct SchemaWalker<'a> {
    definitions: Option<&'a Map<String, Value>>,
}

impl SchemaWalker<'_> {
    /// Map one property schema to its semantic type description
    fn semantic_type(&self, schema: &Value, depth: usize) -> Map<String, Value> {
        let mut out = Map::new();

        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            match self.resolve(reference) {
                Some(target) if depth < MAX_REF_DEPTH => return self.semantic_type(target, depth + 1),
                _ => {
                    insert_object(&mut out);
                    return out;
                }
            }
        }

        // schemars wraps a documented reference as `allOf: [{$ref}]`
        if let Some([single]) = schema.get("allOf").and_then(Value::as_array).map(Vec::as_slice) {
            return self.semantic_type(single, depth);
        }

        if let Some(members) = schema.get("anyOf").and_then(Value::as_array) {
            let mut nullable = false;
            let mut any_of = Vec::new();
            for member in members {
                if member.get("type").and_then(Value::as_str) == Some("null") {
                    nullable = true;
                } else {
                    any_of.push(Value::Object(self.semantic_type(member, depth)));
                }
            }
            out.insert("anyOf".to_string(), Value::Array(any_of));
            if nullable {
                out.insert("nullable".to_string(), Value::Bool(true));
            }
            return out;
        }

        match schema.get("type") {
            Some(Value::String(ty)) => self.scalar_or_container(ty, schema, depth, &mut out),
            Some(Value::Array(types)) => {
                let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
                let non_null: Vec<&str> = names.iter().copied().filter(|t| *t != "null").collect();
                match non_null.as_slice() {
                    [] => {
                        out.insert("type".to_string(), json!("null"));
                    }
                    [single] if names.len() == 1 => {
                        self.scalar_or_container(single, schema, depth, &mut out)
                    }
                    _ => {
                        let any_of = non_null
                            .iter()
                            .map(|t| {
                                let mut member = Map::new();
                                self.scalar_or_container(t, schema, depth, &mut member);
                                Value::Object(member)
                            })
                            .collect();
                        out.insert("anyOf".to_string(), Value::Array(any_of));
                        if names.len() != non_null.len() {
                            out.insert("nullable".to_string(), Value::Bool(true));
                        }
                    }
                }
            }
            _ if schema.get("properties").is_some() => insert_object(&mut out),
            _ => {
                out.insert("type".to_string(), json!("string"));
            }
        }
        out
    }

    fn scalar_or_container(
        &self,
        ty: &str,
        schema: &Value,
        depth: usize,
        out: &mut Map<String, Value>,
    ) {
        match ty {
            "integer" | "number" | "string" | "boolean" | "null" => {
                out.insert("type".to_string(), json!(ty));
            }
            "array" => {
                out.insert("type".to_string(), json!("array"));
                let items = match schema.get("items") {
                    Some(items @ Value::Object(_)) => Value::Object(self.semantic_type(items, depth)),
                    _ => json!({"type": "string"}),
                };
                out.insert("items".to_string(), items);
            }
            "object" => insert_object(out),
            _ => {
                out.insert("type".to_string(), json!("string"));
            }
        }
    }

    fn resolve(&self, reference: &str) -> Option<&Value> {
        let name = reference.strip_prefix("#/definitions/")?;
        self.definitions?.get(name)
    }
}

fn insert_object(out: &mut Map<String, Value>) {
    out.insert("type".to_string(), json!("object"));
    out.insert("additionalProperties".to_string(), Value::Bool(true));
}
