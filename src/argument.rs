//! Canonical tool-argument value model.
//!
//! Tool call arguments and results cross two boundaries with different
//! representations: the JSON wire tree (`serde_json::Value`) and the
//! in-process MCP execution boundary (`crate::mcp::McpValue`). This module
//! defines the canonical tagged union both converge on, with lossless
//! conversions in each direction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A tool argument value. Tree-shaped: every node is owned by exactly one
/// parent, and object keys are unique within a level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolArgument {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Array(Vec<ToolArgument>),
    Object(BTreeMap<String, ToolArgument>),
}

impl ToolArgument {
    /// Convert a JSON tree into the canonical union.
    ///
    /// Recognizes, in order: null, bool, integer, float, string, array,
    /// object. Anything unexpressible (a u64 beyond `i64::MAX` is the one
    /// JSON case) degrades to its string rendering rather than failing.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    Self::Text(n.to_string())
                }
            }
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Exact inverse of [`from_json`](Self::from_json) for the scalar and
    /// container cases.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(b),
            Self::Int(i) => serde_json::Value::from(i),
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s),
            Self::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Self::into_json).collect())
            }
            Self::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into_json())).collect(),
            ),
        }
    }

    /// Opportunistically parse a string that may carry a pre-serialized
    /// JSON value.
    ///
    /// Vendors deliver tool arguments as JSON-encoded strings; when the
    /// string parses, the structured value is used, otherwise it degrades
    /// to `Text`. This never errors.
    pub fn parse_str(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => Self::from_json(value),
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    /// True for `Null`.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text payload, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Object map, if this is an `Object` value.
    pub fn as_object(&self) -> Option<&BTreeMap<String, ToolArgument>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for ToolArgument {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

impl From<ToolArgument> for serde_json::Value {
    fn from(value: ToolArgument) -> Self {
        value.into_json()
    }
}
