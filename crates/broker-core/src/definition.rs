//! # Resource Definitions
//!
//! A resource is described by one JSON document per file:
//!
//! ```json
//! {
//!     "name": "Test1",
//!     "parallel_count": 2,
//!     "keywords": ["build", "linux"],
//!     "parameters": {"host": "build01.example.org"}
//! }
//! ```
//!
//! `parallel_count` may also be given as a numeric string (`"2"`). The
//! `parameters` mapping is opaque to the broker and handed to clients as-is.

use crate::error::DefinitionError;
use serde_json::{Map, Value};
use std::path::Path;

/// A validated resource definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    pub name: String,
    pub parallel_count: i64,
    pub keywords: Vec<String>,
    pub parameters: Map<String, Value>,
}

impl ResourceDefinition {
    /// Creates a definition with no extra keywords and no parameters.
    pub fn new(name: impl Into<String>, parallel_count: i64) -> Self {
        Self {
            name: name.into(),
            parallel_count,
            keywords: Vec::new(),
            parameters: Map::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Reads and validates the definition stored in `path`.
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let text = std::fs::read_to_string(path).map_err(|source| DefinitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, DefinitionError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Validates an already parsed JSON document.
    pub fn from_value(value: &Value) -> Result<Self, DefinitionError> {
        let object = value.as_object().ok_or_else(|| DefinitionError::InvalidField {
            field: "definition",
            reason: "expected a JSON object".to_string(),
        })?;

        let name = match required(object, "name")? {
            Value::String(name) if !name.trim().is_empty() => name.clone(),
            Value::String(_) => {
                return Err(DefinitionError::InvalidField {
                    field: "name",
                    reason: "must not be empty".to_string(),
                })
            }
            other => return Err(wrong_type("name", "a string", other)),
        };

        let parallel_count = parse_count(required(object, "parallel_count")?)?;

        let keywords = match required(object, "keywords")? {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_owned)
                        .ok_or_else(|| wrong_type("keywords", "a list of strings", item))
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => return Err(wrong_type("keywords", "a list of strings", other)),
        };

        let parameters = match required(object, "parameters")? {
            Value::Object(parameters) => parameters.clone(),
            other => return Err(wrong_type("parameters", "a mapping", other)),
        };

        Ok(Self {
            name,
            parallel_count,
            keywords,
            parameters,
        })
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, DefinitionError> {
    object.get(field).ok_or(DefinitionError::MissingField(field))
}

fn wrong_type(field: &'static str, expected: &str, got: &Value) -> DefinitionError {
    DefinitionError::InvalidField {
        field,
        reason: format!("expected {expected}, got {got}"),
    }
}

fn parse_count(value: &Value) -> Result<i64, DefinitionError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| wrong_type("parallel_count", "an integer", value)),
        Value::String(text) => text.trim().parse().map_err(|_| DefinitionError::InvalidField {
            field: "parallel_count",
            reason: format!("'{text}' is not an integer"),
        }),
        other => Err(wrong_type("parallel_count", "an integer", other)),
    }
}
