//! Tool definition types for function calling.

use serde::{Deserialize, Serialize};

/// A function the model may call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    /// JSON-schema-like parameter specification
    pub parameters: serde_json::Value,
}

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Tool {
    Function {
        #[serde(flatten)]
        function: ToolFunction,
    },
}

impl Tool {
    /// Create a new function tool
    ///
    /// # Example
    ///
    /// ```rust
    /// use llmux::types::Tool;
    ///
    /// let tool = Tool::function(
    ///     "get_weather",
    ///     "Get weather information",
    ///     serde_json::json!({
    ///         "type": "object",
    ///         "properties": {
    ///             "location": { "type": "string" }
    ///         }
    ///     }),
    /// );
    /// ```
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self::Function {
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// The tool's function definition.
    pub fn as_function(&self) -> &ToolFunction {
        match self {
            Self::Function { function } => function,
        }
    }
}
