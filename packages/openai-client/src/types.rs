//! OpenAI API request and response types.

use serde::{Deserialize, Serialize};

use crate::tool::ToolCall;

// =============================================================================
// Chat Completion
// =============================================================================

/// Chat completion request.
///
/// Messages are raw JSON values because multi-turn tool conversations mix
/// plain role/content messages with assistant tool-call messages and
/// `role: "tool"` result messages; callers build them with `serde_json::json!`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model to use (e.g., "gpt-4o", "gpt-4o-mini")
    pub model: String,

    /// Conversation messages
    pub messages: Vec<serde_json::Value>,

    /// Tool definitions in OpenAI wire format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<serde_json::Value>>,

    /// Tool choice strategy ("auto" when tools are present)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,

    /// Sampling temperature (0.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Create a new chat request with the given model and messages.
    pub fn new(model: impl Into<String>, messages: Vec<serde_json::Value>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: None,
            tool_choice: None,
            temperature: None,
        }
    }

    /// Attach tool definitions (already rendered to OpenAI wire format).
    pub fn with_tools(mut self, tools: Vec<serde_json::Value>) -> Self {
        if !tools.is_empty() {
            self.tools = Some(tools);
            self.tool_choice = Some("auto".to_string());
        }
        self
    }

    /// Set temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Parsed chat completion.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Assistant text content, if any
    pub content: Option<String>,

    /// Tool calls requested by the model (empty when none)
    pub tool_calls: Vec<ToolCall>,

    /// Why generation stopped ("stop", "tool_calls", "length", ...)
    pub finish_reason: Option<String>,

    /// Token usage statistics
    pub usage: Option<Usage>,
}

impl Completion {
    /// Whether the model asked for at least one tool invocation.
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Raw chat response from API (for internal parsing).
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessageRaw,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageRaw {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRaw>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCallRaw {
    pub id: String,
    pub function: FunctionCallRaw,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FunctionCallRaw {
    pub name: String,
    pub arguments: String,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// Total tokens used
    pub total_tokens: u32,
}

// =============================================================================
// Structured Output
// =============================================================================

/// Structured output request with JSON schema.
#[derive(Debug, Serialize)]
pub struct StructuredRequest {
    /// Model to use
    pub model: String,

    /// Conversation messages
    pub messages: Vec<serde_json::Value>,

    /// Temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Response format with JSON schema
    pub response_format: ResponseFormat,
}

impl StructuredRequest {
    /// Create a new structured request (temperature pinned to 0.0 for
    /// deterministic extraction).
    pub fn new(
        model: impl Into<String>,
        system: impl Into<String>,
        user: impl Into<String>,
        schema: serde_json::Value,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![
                serde_json::json!({"role": "system", "content": system.into()}),
                serde_json::json!({"role": "user", "content": user.into()}),
            ],
            temperature: Some(0.0),
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: "structured_response".to_string(),
                    strict: true,
                    schema,
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    pub json_schema: JsonSchemaFormat,
}

#[derive(Debug, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: serde_json::Value,
}

// =============================================================================
// Utilities
// =============================================================================

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_builder() {
        let req = ChatRequest::new(
            "gpt-4o",
            vec![serde_json::json!({"role": "user", "content": "Hello"})],
        )
        .with_temperature(0.7);

        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.temperature, Some(0.7));
        assert!(req.tools.is_none());
    }

    #[test]
    fn test_with_tools_sets_auto_choice() {
        let req = ChatRequest::new("gpt-4o", vec![])
            .with_tools(vec![serde_json::json!({"type": "function"})]);

        assert!(req.tools.is_some());
        assert_eq!(req.tool_choice.as_deref(), Some("auto"));

        let empty = ChatRequest::new("gpt-4o", vec![]).with_tools(vec![]);
        assert!(empty.tools.is_none());
        assert!(empty.tool_choice.is_none());
    }

    #[test]
    fn test_structured_request_pins_temperature() {
        let req = StructuredRequest::new("gpt-4o", "sys", "user", serde_json::json!({}));
        assert_eq!(req.temperature, Some(0.0));
        assert_eq!(req.response_format.format_type, "json_schema");
        assert!(req.response_format.json_schema.strict);
    }

    #[test]
    fn test_truncate_to_char_boundary() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
    }

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("{}"), "{}");
    }
}
