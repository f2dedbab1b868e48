//! Tool-calling orchestrator.
//!
//! Drives the model / tool-execution loop for one user question: the
//! model sees the query tool catalogue, requests invocations, gets the
//! results fed back, and eventually produces a text answer with an
//! optional focus directive for visualizers.

pub mod focus;

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{FlightLogError, Result};
use crate::tools::{tool_catalogue, QueryTools, ToolRequest};
use crate::traits::chat::ChatBackend;
use crate::types::chat::{ChatMessage, ChatResponse, ToolCall, ToolInvocation};

/// Upper bound on model calls per chat turn.
pub const MAX_TOOL_ITERATIONS: usize = 5;

/// Answer of last resort, so a chat turn never returns empty text.
const FALLBACK_ANSWER: &str =
    "I wasn't able to put together an answer from your flight history this time.";

const SYSTEM_PROMPT: &str = r#"You are a travel assistant answering questions about the user's own flight history.

You can look up their records with the provided tools. Guidelines:
- Ground every factual claim in tool results; never guess counts, dates, or airports.
- Dates are ISO format (YYYY-MM-DD). Airports are 3-letter IATA codes.
- If the records cannot answer the question, say so plainly.

You may end your answer with exactly one focus block telling the UI what to highlight, as the last thing in the message:
<<FOCUS>>{"mode": "flights", "flight_ids": ["<uuid>", ...]}<</FOCUS>>
Other payloads: {"mode": "airports", "airports": ["SFO", ...]} or {"mode": "all"}."#;

/// Drives one question through the model and the query tools.
pub struct ChatAgent {
    backend: Arc<dyn ChatBackend>,
    tools: QueryTools,
}

impl ChatAgent {
    /// Create an agent over a chat backend and the query tool layer.
    pub fn new(backend: Arc<dyn ChatBackend>, tools: QueryTools) -> Self {
        Self { backend, tools }
    }

    /// Answer one question over the user's flight history.
    ///
    /// Runs at most `MAX_TOOL_ITERATIONS` model calls, executing the
    /// requested tool invocations between calls. Hitting the cap is not
    /// an error: the most recent non-empty assistant text becomes the
    /// answer, and a turn that requests tools on the final call has them
    /// left unexecuted. The returned answer is never empty.
    ///
    /// A backend failure is returned as a failed turn rather than
    /// retried: rerunning tool executions mid-conversation is worse than
    /// asking the user to resend one message.
    pub async fn ask(
        &self,
        user_email: &str,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<ChatResponse> {
        let catalogue = tool_catalogue();

        let mut messages: Vec<Value> = Vec::with_capacity(history.len() + 2);
        messages.push(json!({"role": "system", "content": SYSTEM_PROMPT}));
        for message in history {
            messages.push(message.to_wire());
        }
        messages.push(json!({"role": "user", "content": question}));

        let mut invocations: Vec<ToolInvocation> = Vec::new();
        let mut last_content: Option<String> = None;
        let mut iterations = 0;

        for iteration in 1..=MAX_TOOL_ITERATIONS {
            iterations = iteration;

            let turn = self
                .backend
                .complete(&messages, &catalogue)
                .await
                .map_err(FlightLogError::Chat)?;

            if let Some(content) = turn.content.as_deref() {
                if !content.trim().is_empty() {
                    last_content = Some(content.to_string());
                }
            }

            if !turn.wants_tools() {
                break;
            }

            // Tool requests on the final iteration stay unexecuted: there
            // is no model call left to report their results to.
            if iteration == MAX_TOOL_ITERATIONS {
                warn!(
                    "Hit iteration cap with {} tool call(s) pending",
                    turn.tool_calls.len()
                );
                break;
            }

            messages.push(turn.to_assistant_message());

            for call in &turn.tool_calls {
                info!("Executing tool {} (iteration {})", call.name, iteration);
                let (invocation, payload) = self.invoke(user_email, call).await?;
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": payload.to_string(),
                }));
                invocations.push(invocation);
            }
        }

        let raw_answer = last_content.unwrap_or_else(|| FALLBACK_ANSWER.to_string());
        let (stripped, parsed_focus) = focus::extract_focus(&raw_answer);
        let focus = parsed_focus.unwrap_or_else(|| focus::derive_focus(&invocations));

        // An answer that was nothing but a focus block strips to empty.
        let answer = if stripped.trim().is_empty() {
            FALLBACK_ANSWER.to_string()
        } else {
            stripped
        };

        Ok(ChatResponse {
            answer,
            tool_calls: invocations,
            focus,
            iterations,
        })
    }

    /// Execute one requested tool call.
    ///
    /// A name outside the catalogue aborts the turn. Arguments that fail
    /// validation for a known tool become an error payload the model can
    /// react to, recorded in the audit list like any other result.
    async fn invoke(
        &self,
        user_email: &str,
        call: &ToolCall,
    ) -> Result<(ToolInvocation, Value)> {
        let arguments: Value = serde_json::from_str(&call.arguments)
            .unwrap_or_else(|_| Value::String(call.arguments.clone()));

        let outcome = match ToolRequest::parse(&call.name, &call.arguments) {
            Ok(request) => self.tools.execute(user_email, &request).await,
            Err(e) => Err(e),
        };

        let payload = match outcome {
            Ok(payload) => payload,
            Err(FlightLogError::ToolArguments { tool, message }) => {
                warn!("Invalid arguments for tool {}: {}", tool, message);
                json!({ "error": message })
            }
            Err(e) => return Err(e),
        };

        Ok((
            ToolInvocation {
                name: call.name.clone(),
                arguments,
                result: payload.clone(),
            },
            payload,
        ))
    }
}
