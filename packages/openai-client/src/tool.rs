//! Tool definition and tool-call types for OpenAI function calling.
//!
//! This crate only carries the wire-level pieces: advertising a tool to the
//! model (`ToolDefinition`) and reading back what the model asked for
//! (`ToolCall`). Dispatching a call to real code is the consumer's concern;
//! a closed tool catalogue is better expressed there as an enum over typed
//! argument structs than as a trait-object registry.
//!
//! # Example
//!
//! ```rust,ignore
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//! use openai_client::ToolDefinition;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct SearchArgs {
//!     query: String,
//! }
//!
//! let def = ToolDefinition::new::<SearchArgs>("web_search", "Search the web");
//! let wire = def.to_openai_format();
//! ```

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::schema::StructuredOutput;
use crate::types::ToolCallRaw;

/// OpenAI tool definition format.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    /// The name of the tool.
    pub name: String,

    /// A description of what the tool does.
    pub description: String,

    /// JSON schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Build a definition whose parameter schema is generated from `Args`.
    ///
    /// The schema goes through the same strict-mode transformation as
    /// structured outputs (inlined refs, `additionalProperties: false`,
    /// every property required).
    pub fn new<Args: DeserializeOwned + JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Args::openai_schema(),
        }
    }

    /// Convert to OpenAI API format.
    pub fn to_openai_format(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters
            }
        })
    }
}

/// A tool call from the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// The ID of this tool call (for matching responses).
    pub id: String,

    /// The name of the tool to call.
    pub name: String,

    /// The arguments as a JSON string.
    pub arguments: String,
}

impl ToolCall {
    /// Parse a tool call from OpenAI's response format.
    pub fn from_openai_value(value: &serde_json::Value) -> Option<Self> {
        Some(Self {
            id: value.get("id")?.as_str()?.to_string(),
            name: value.get("function")?.get("name")?.as_str()?.to_string(),
            arguments: value.get("function")?.get("arguments")?.as_str()?.to_string(),
        })
    }

    /// Parse arguments into a typed struct.
    pub fn parse_args<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }

    /// Render back into the assistant-message wire shape, for echoing the
    /// model's request into the conversation before appending tool results.
    pub fn to_openai_value(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "type": "function",
            "function": {
                "name": self.name,
                "arguments": self.arguments
            }
        })
    }

    pub(crate) fn from_raw(raw: ToolCallRaw) -> Self {
        Self {
            id: raw.id,
            name: raw.function.name,
            arguments: raw.function.arguments,
        }
    }
}
