//! `FlightExtractor` and `ChatBackend` over the OpenAI API.
//!
//! Both wrap an [`OpenAIClient`] and translate its errors into
//! [`BackendError`] at the trait boundary, preserving retryability so the
//! scan pipeline's retry policy can act on it.

use async_trait::async_trait;
use openai_client::{truncate_to_char_boundary, ChatRequest, OpenAIClient, OpenAIError};
use serde_json::Value;

use crate::error::{BackendError, FlightLogError, Result};
use crate::traits::chat::ChatBackend;
use crate::traits::extractor::FlightExtractor;
use crate::types::chat::{ModelTurn, StopReason, ToolCall};
use crate::types::email::{EmailMessage, ExtractedItinerary};

const DEFAULT_MODEL: &str = "gpt-4o";

/// Bodies past this many bytes get truncated before prompting; booking
/// details sit near the top of real confirmation emails.
const MAX_BODY_BYTES: usize = 32_768;

const EXTRACTION_SYSTEM_PROMPT: &str = r#"You extract flight details from emails.

Set valid=false when the email is not a flight booking confirmation, itinerary, or schedule change (newsletters, promotions, hotel or car receipts, fare alerts). Only include flights the recipient is actually booked on.

For each flight segment:
- Airports as 3-letter IATA codes (SFO, not "San Francisco").
- Dates in ISO format YYYY-MM-DD. Resolve relative dates against the email's sent date.
- Times on the 24-hour clock, HH:MM.
- Flight numbers with the airline prefix, e.g. "UA 100".
- Copy the confirmation number exactly as written.

When the email forwards or quotes another booking email, report the quoted message's id, subject, and sent date in the source fields; leave them null when nothing is quoted."#;

fn backend_error(e: OpenAIError) -> BackendError {
    BackendError {
        retryable: e.is_retryable(),
        message: e.to_string(),
    }
}

fn read_model_env() -> Option<String> {
    std::env::var("OPENAI_MODEL").ok().filter(|m| !m.is_empty())
}

/// Itinerary extraction via OpenAI structured output.
#[derive(Clone)]
pub struct OpenAIExtractor {
    client: OpenAIClient,
    model: String,
}

impl OpenAIExtractor {
    /// Wrap an existing client, using the default model.
    pub fn new(client: OpenAIClient) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Build from `OPENAI_API_KEY` (and `OPENAI_MODEL` when set).
    pub fn from_env() -> Result<Self> {
        let client =
            OpenAIClient::from_env().map_err(|e| FlightLogError::Config(e.to_string()))?;
        let mut extractor = Self::new(client);
        if let Some(model) = read_model_env() {
            extractor = extractor.with_model(model);
        }
        Ok(extractor)
    }

    fn user_prompt(email: &EmailMessage) -> String {
        format!(
            "Message-Id: {}\nSubject: {}\nSent: {}\n\n{}",
            email.id,
            email.subject.as_deref().unwrap_or("(none)"),
            email.sent_at.as_deref().unwrap_or("(unknown)"),
            truncate_to_char_boundary(&email.body, MAX_BODY_BYTES),
        )
    }
}

#[async_trait]
impl FlightExtractor for OpenAIExtractor {
    async fn extract(
        &self,
        email: &EmailMessage,
    ) -> std::result::Result<ExtractedItinerary, BackendError> {
        self.client
            .extract::<ExtractedItinerary>(
                &self.model,
                EXTRACTION_SYSTEM_PROMPT,
                Self::user_prompt(email),
            )
            .await
            .map_err(backend_error)
    }
}

/// Conversational backend via OpenAI chat completions.
#[derive(Clone)]
pub struct OpenAIChat {
    client: OpenAIClient,
    model: String,
}

impl OpenAIChat {
    /// Wrap an existing client, using the default model.
    pub fn new(client: OpenAIClient) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Build from `OPENAI_API_KEY` (and `OPENAI_MODEL` when set).
    pub fn from_env() -> Result<Self> {
        let client =
            OpenAIClient::from_env().map_err(|e| FlightLogError::Config(e.to_string()))?;
        let mut chat = Self::new(client);
        if let Some(model) = read_model_env() {
            chat = chat.with_model(model);
        }
        Ok(chat)
    }
}

#[async_trait]
impl ChatBackend for OpenAIChat {
    async fn complete(
        &self,
        messages: &[Value],
        tools: &[Value],
    ) -> std::result::Result<ModelTurn, BackendError> {
        let request =
            ChatRequest::new(&self.model, messages.to_vec()).with_tools(tools.to_vec());
        let completion = self.client.chat(request).await.map_err(backend_error)?;

        Ok(ModelTurn {
            content: completion.content,
            tool_calls: completion
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.name,
                    arguments: call.arguments,
                })
                .collect(),
            stop_reason: stop_reason(completion.finish_reason.as_deref()),
        })
    }
}

fn stop_reason(finish_reason: Option<&str>) -> StopReason {
    match finish_reason {
        Some("stop") => StopReason::Stop,
        Some("tool_calls") => StopReason::ToolCalls,
        Some("length") => StopReason::Length,
        _ => StopReason::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_mapping() {
        assert_eq!(stop_reason(Some("stop")), StopReason::Stop);
        assert_eq!(stop_reason(Some("tool_calls")), StopReason::ToolCalls);
        assert_eq!(stop_reason(Some("length")), StopReason::Length);
        assert_eq!(stop_reason(Some("content_filter")), StopReason::Other);
        assert_eq!(stop_reason(None), StopReason::Other);
    }

    #[test]
    fn test_backend_error_preserves_retryability() {
        let rate_limited = backend_error(OpenAIError::Api {
            status: 429,
            message: "slow down".into(),
        });
        assert!(rate_limited.is_retryable());

        let bad_schema = backend_error(OpenAIError::Api {
            status: 400,
            message: "invalid schema".into(),
        });
        assert!(!bad_schema.is_retryable());
        assert!(bad_schema.message.contains("invalid schema"));
    }

    #[test]
    fn test_user_prompt_carries_headers() {
        let email = EmailMessage::new("msg-9", "Flight UA 100 departs SFO 08:30")
            .with_subject("Your itinerary")
            .with_sent_at("2024-03-01T10:00:00Z");

        let prompt = OpenAIExtractor::user_prompt(&email);
        assert!(prompt.starts_with("Message-Id: msg-9"));
        assert!(prompt.contains("Subject: Your itinerary"));
        assert!(prompt.contains("Sent: 2024-03-01T10:00:00Z"));
        assert!(prompt.ends_with("departs SFO 08:30"));
    }
}
