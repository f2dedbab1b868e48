//! Pure OpenAI REST API client
//!
//! A clean, minimal client for the OpenAI API with no domain-specific logic.
//! Supports chat completions, structured outputs, and function calling.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::{OpenAIClient, ChatRequest};
//!
//! let client = OpenAIClient::from_env()?;
//!
//! // Chat completion
//! let completion = client.chat(ChatRequest::new(
//!     "gpt-4o",
//!     vec![serde_json::json!({"role": "user", "content": "Hello!"})],
//! )).await?;
//! ```
//!
//! # Type-Safe Structured Output
//!
//! ```rust,ignore
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Segment {
//!     airline: Option<String>,
//!     flight_number: Option<String>,
//! }
//!
//! #[derive(Deserialize, JsonSchema)]
//! struct Itinerary {
//!     segments: Vec<Segment>,
//! }
//!
//! // Schema generated automatically from type!
//! let itinerary: Itinerary = client
//!     .extract::<Itinerary>("gpt-4o", system_prompt, user_prompt)
//!     .await?;
//! ```
//!
//! # Function Calling
//!
//! ```rust,ignore
//! let request = ChatRequest::new("gpt-4o", messages)
//!     .with_tools(definitions.iter().map(|d| d.to_openai_format()).collect());
//! let completion = client.chat(request).await?;
//! for call in &completion.tool_calls {
//!     // dispatch call.name / call.arguments, append role:"tool" messages
//! }
//! ```

pub mod error;
pub mod schema;
pub mod tool;
pub mod types;

pub use error::{OpenAIError, Result};
pub use schema::StructuredOutput;
pub use tool::{ToolCall, ToolDefinition};
pub use types::*;

use reqwest::Client;
use tracing::{debug, warn};

/// Pure OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Get the API key.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// Send messages (optionally with tool definitions) to the chat
    /// completion API and get the parsed first choice back.
    pub async fn chat(&self, request: ChatRequest) -> Result<Completion> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                OpenAIError::from_reqwest(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        let usage = raw.usage;
        let choice = raw
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::Parse("no choices in response".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            tool_calls = choice.message.tool_calls.len(),
            "OpenAI chat completion"
        );

        Ok(Completion {
            content: choice.message.content,
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(ToolCall::from_raw)
                .collect(),
            finish_reason: choice.finish_reason,
            usage,
        })
    }

    /// Type-safe structured output extraction.
    ///
    /// Automatically generates a JSON schema from the type `T` using `schemars`,
    /// sends it to OpenAI, and deserializes the response.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use schemars::JsonSchema;
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize, JsonSchema)]
    /// struct Segment {
    ///     airline: Option<String>,
    ///     flight_number: Option<String>,
    /// }
    ///
    /// #[derive(Deserialize, JsonSchema)]
    /// struct Itinerary {
    ///     segments: Vec<Segment>,
    /// }
    ///
    /// let result: Itinerary = client
    ///     .extract::<Itinerary>("gpt-4o", system_prompt, user_prompt)
    ///     .await?;
    /// ```
    pub async fn extract<T: StructuredOutput>(
        &self,
        model: &str,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<T> {
        let schema = T::openai_schema();

        debug!(
            type_name = T::type_name(),
            "Generated OpenAI schema for extraction"
        );

        let request = StructuredRequest::new(model, system_prompt, user_prompt, schema);
        let json_str = self.structured_output(request).await?;

        serde_json::from_str(strip_code_blocks(&json_str)).map_err(|e| {
            OpenAIError::Parse(format!("Failed to deserialize response: {}", e))
        })
    }

    /// Structured output with JSON schema.
    ///
    /// Uses OpenAI's `json_schema` response format for guaranteed valid JSON.
    pub async fn structured_output(&self, request: StructuredRequest) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(OpenAIError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI structured output error");
            return Err(OpenAIError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))?;

        raw.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Parse("no content in response".into()))
    }
}
