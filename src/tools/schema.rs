//! Tool argument schemas
//!
//! A flat list of typed fields, checked before a tool runs and rendered as
//! JSON Schema for the model.

use serde_json::{json, Map, Value};

use crate::core::{ForgeError, Result};

/// Accepted type of an argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    String,
    Integer,
    Number,
    Boolean,
    StringArray,
    Object,
}

impl ArgType {
    fn matches(self, value: &Value) -> bool {
        match self {
            ArgType::String => value.is_string(),
            ArgType::Integer => value.is_i64() || value.is_u64(),
            ArgType::Number => value.is_number(),
            ArgType::Boolean => value.is_boolean(),
            ArgType::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            ArgType::Object => value.is_object(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Integer => "integer",
            ArgType::Number => "number",
            ArgType::Boolean => "boolean",
            ArgType::StringArray => "array of strings",
            ArgType::Object => "object",
        }
    }

    fn json_schema(self) -> Value {
        match self {
            ArgType::StringArray => json!({"type": "array", "items": {"type": "string"}}),
            ArgType::String => json!({"type": "string"}),
            ArgType::Integer => json!({"type": "integer"}),
            ArgType::Number => json!({"type": "number"}),
            ArgType::Boolean => json!({"type": "boolean"}),
            ArgType::Object => json!({"type": "object"}),
        }
    }
}

/// One declared argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgField {
    pub name: String,
    pub kind: ArgType,
    pub required: bool,
    pub description: String,
}

/// The argument shape a tool accepts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgSchema {
    pub fields: Vec<ArgField>,
}

impl ArgSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field
    pub fn required(self, name: &str, kind: ArgType, description: &str) -> Self {
        self.field(name, kind, true, description)
    }

    /// Add an optional field
    pub fn optional(self, name: &str, kind: ArgType, description: &str) -> Self {
        self.field(name, kind, false, description)
    }

    fn field(mut self, name: &str, kind: ArgType, required: bool, description: &str) -> Self {
        self.fields.push(ArgField {
            name: name.to_string(),
            kind,
            required,
            description: description.to_string(),
        });
        self
    }

    /// Check `args` against the schema, collecting every offending field.
    /// Unknown fields are ignored; `null` counts as absent.
    pub fn validate(&self, tool: &str, args: &Value) -> Result<()> {
        let Some(object) = args.as_object() else {
            return Err(ForgeError::schema(
                tool,
                vec!["arguments: expected object".to_string()],
            ));
        };

        let problems: Vec<String> = self
            .fields
            .iter()
            .filter_map(|field| match object.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    Some(format!("{}: required", field.name))
                }
                None | Some(Value::Null) => None,
                Some(value) if !field.kind.matches(value) => {
                    Some(format!("{}: expected {}", field.name, field.kind.label()))
                }
                Some(_) => None,
            })
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ForgeError::schema(tool, problems))
        }
    }

    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            let mut prop = field.kind.json_schema();
            if let Some(obj) = prop.as_object_mut() {
                obj.insert("description".to_string(), json!(field.description));
            }
            properties.insert(field.name.clone(), prop);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}
