//! Conversational model backend trait.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::chat::ModelTurn;

/// One model call in a tool-calling conversation.
///
/// Messages and tool definitions travel in the provider wire shape
/// (`role`/`content` objects, `type: "function"` tool entries) because
/// the orchestrator appends assistant tool-call echoes and
/// `role: "tool"` result messages between calls.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Complete the conversation, optionally requesting tool invocations.
    async fn complete(
        &self,
        messages: &[serde_json::Value],
        tools: &[serde_json::Value],
    ) -> std::result::Result<ModelTurn, BackendError>;
}
