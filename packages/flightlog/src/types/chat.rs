//! Conversation types for the tool-calling orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// One prior message in a conversation, supplied by the caller as history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    /// A message from the user.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// A message from the assistant.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    /// Wire form for the model backend.
    pub fn to_wire(&self) -> serde_json::Value {
        let role = match self.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        json!({"role": role, "content": self.content})
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One model response inside the orchestration loop.
#[derive(Debug, Clone)]
pub struct ModelTurn {
    /// Assistant text, if the model produced any
    pub content: Option<String>,

    /// Tool invocations the model requested, in request order
    pub tool_calls: Vec<ToolCall>,

    pub stop_reason: StopReason,
}

impl ModelTurn {
    /// Whether the model asked for at least one tool invocation.
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Render this turn back into an assistant wire message, so tool
    /// results can be appended after it in the running conversation.
    pub fn to_assistant_message(&self) -> serde_json::Value {
        let calls: Vec<serde_json::Value> = self
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments,
                    }
                })
            })
            .collect();

        json!({
            "role": "assistant",
            "content": self.content,
            "tool_calls": calls,
        })
    }
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Backend id for matching the result message to the request
    pub id: String,

    pub name: String,

    /// Raw JSON argument text exactly as the model produced it
    pub arguments: String,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Natural end of the answer
    Stop,

    /// Stopped to request tool invocations
    ToolCalls,

    /// Hit the token limit
    Length,

    Other,
}

/// One executed tool invocation, recorded for the caller's audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub name: String,

    /// Arguments as parsed JSON (raw text when unparsable)
    pub arguments: serde_json::Value,

    /// The result fed back to the model (an error payload when the
    /// arguments failed validation)
    pub result: serde_json::Value,
}

/// A structured hint telling a downstream visualizer what subset of the
/// data the answer is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum FocusDirective {
    /// Highlight everything
    #[default]
    All,

    /// Highlight specific flight records
    Flights {
        #[serde(default)]
        flight_ids: Vec<Uuid>,
    },

    /// Highlight specific airports
    Airports {
        /// IATA codes
        #[serde(default)]
        airports: Vec<String>,
    },
}

/// Outcome of one chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    /// Final answer text, focus markers stripped, never empty
    pub answer: String,

    /// Every tool invocation executed during the turn, in order
    pub tool_calls: Vec<ToolInvocation>,

    pub focus: FocusDirective,

    /// Model calls consumed (1..=MAX_TOOL_ITERATIONS)
    pub iterations: usize,
}
