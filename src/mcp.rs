//! MCP-boundary argument representation.
//!
//! The in-process MCP tool-execution boundary speaks its own argument
//! enumeration, defined independently of the wire-side
//! [`ToolArgument`](crate::argument::ToolArgument). Conversions between the
//! two are lossless in both directions.

use std::collections::HashMap;

use crate::argument::ToolArgument;

/// Argument value as seen by the MCP tool-execution boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum McpValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<McpValue>),
    Object(HashMap<String, McpValue>),
}

impl From<ToolArgument> for McpValue {
    fn from(arg: ToolArgument) -> Self {
        match arg {
            ToolArgument::Null => Self::Null,
            ToolArgument::Bool(b) => Self::Bool(b),
            ToolArgument::Int(i) => Self::Int(i),
            ToolArgument::Float(f) => Self::Double(f),
            ToolArgument::Text(s) => Self::String(s),
            ToolArgument::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            ToolArgument::Object(map) => Self::Object(
                map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
            ),
        }
    }
}

impl From<McpValue> for ToolArgument {
    fn from(value: McpValue) -> Self {
        match value {
            McpValue::Null => Self::Null,
            McpValue::Bool(b) => Self::Bool(b),
            McpValue::Int(i) => Self::Int(i),
            McpValue::Double(f) => Self::Float(f),
            McpValue::String(s) => Self::Text(s),
            McpValue::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            McpValue::Object(map) => Self::Object(
                map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
            ),
        }
    }
}
