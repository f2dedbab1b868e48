//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the flightlog
//! library without making real model or network calls.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;
use crate::traits::chat::ChatBackend;
use crate::traits::extractor::FlightExtractor;
use crate::types::chat::{ModelTurn, StopReason, ToolCall};
use crate::types::email::{EmailMessage, ExtractedItinerary, ExtractedSegment};

/// A mock extractor for testing.
///
/// Returns scripted itineraries by message id; unknown ids come back as
/// "not a booking". Failures can be injected per message, permanently or
/// for the first N calls, so retry handling is testable.
///
/// Clones share scripts and call history, so a clone can go behind an
/// `Arc<dyn FlightExtractor>` while the original keeps asserting.
#[derive(Clone, Default)]
pub struct MockExtractor {
    /// Scripted itineraries by message id
    itineraries: Arc<RwLock<HashMap<String, ExtractedItinerary>>>,

    /// Message ids that always fail
    fail_ids: Arc<RwLock<Vec<String>>>,

    /// Remaining retryable failures by message id
    transient: Arc<RwLock<HashMap<String, u32>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockExtractor {
    /// Create a new mock extractor with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a full itinerary for a message id.
    pub fn with_itinerary(
        self,
        message_id: impl Into<String>,
        itinerary: ExtractedItinerary,
    ) -> Self {
        self.itineraries
            .write()
            .unwrap()
            .insert(message_id.into(), itinerary);
        self
    }

    /// Script one booking segment for a message id, appending to any
    /// already scripted for it.
    pub fn with_segment(self, message_id: impl Into<String>, segment: ExtractedSegment) -> Self {
        {
            let mut itineraries = self.itineraries.write().unwrap();
            let entry = itineraries.entry(message_id.into()).or_default();
            entry.valid = true;
            entry.segments.push(segment);
        }
        self
    }

    /// Make extraction fail permanently for a message id.
    pub fn fail_message(self, message_id: impl Into<String>) -> Self {
        self.fail_ids.write().unwrap().push(message_id.into());
        self
    }

    /// Make the first `times` calls for a message id fail with a
    /// retryable error before succeeding.
    pub fn fail_transiently(self, message_id: impl Into<String>, times: u32) -> Self {
        self.transient
            .write()
            .unwrap()
            .insert(message_id.into(), times);
        self
    }

    /// Message ids extraction was called with, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Number of extraction calls made for one message id.
    pub fn call_count(&self, message_id: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == message_id)
            .count()
    }
}

#[async_trait]
impl FlightExtractor for MockExtractor {
    async fn extract(
        &self,
        email: &EmailMessage,
    ) -> std::result::Result<ExtractedItinerary, BackendError> {
        self.calls.write().unwrap().push(email.id.clone());

        if self.fail_ids.read().unwrap().contains(&email.id) {
            return Err(BackendError::permanent("mock extraction failure"));
        }

        if let Some(remaining) = self.transient.write().unwrap().get_mut(&email.id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BackendError::retryable("mock transient failure"));
            }
        }

        Ok(self
            .itineraries
            .read()
            .unwrap()
            .get(&email.id)
            .cloned()
            .unwrap_or_else(ExtractedItinerary::invalid))
    }
}

/// A mock chat backend for testing the orchestrator.
///
/// Plays back a scripted sequence of model turns in order, regardless of
/// input, recording every request for assertions. An exhausted script
/// answers with a fixed closing line. Clones share the script and the
/// recorded requests.
#[derive(Clone, Default)]
pub struct MockChatBackend {
    /// Scripted turns, consumed front-first
    turns: Arc<RwLock<Vec<ModelTurn>>>,

    /// Error returned by the next call, once
    fail_next: Arc<RwLock<Option<BackendError>>>,

    /// Message arrays received, one per call
    requests: Arc<RwLock<Vec<Vec<Value>>>>,
}

impl MockChatBackend {
    /// Create a new mock chat backend with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scripted turn.
    pub fn with_turn(self, turn: ModelTurn) -> Self {
        self.turns.write().unwrap().push(turn);
        self
    }

    /// Append a plain text answer turn.
    pub fn with_answer(self, content: impl Into<String>) -> Self {
        self.with_turn(answer_turn(content))
    }

    /// Make the next call fail with the given error.
    pub fn fail_next(self, error: BackendError) -> Self {
        *self.fail_next.write().unwrap() = Some(error);
        self
    }

    /// Message arrays received, one per call.
    pub fn requests(&self) -> Vec<Vec<Value>> {
        self.requests.read().unwrap().clone()
    }

    /// Number of model calls made.
    pub fn call_count(&self) -> usize {
        self.requests.read().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn complete(
        &self,
        messages: &[Value],
        _tools: &[Value],
    ) -> std::result::Result<ModelTurn, BackendError> {
        self.requests.write().unwrap().push(messages.to_vec());

        if let Some(error) = self.fail_next.write().unwrap().take() {
            return Err(error);
        }

        let mut turns = self.turns.write().unwrap();
        if turns.is_empty() {
            Ok(answer_turn("That covers everything I found."))
        } else {
            Ok(turns.remove(0))
        }
    }
}

/// A model turn that answers in plain text.
pub fn answer_turn(content: impl Into<String>) -> ModelTurn {
    ModelTurn {
        content: Some(content.into()),
        tool_calls: Vec::new(),
        stop_reason: StopReason::Stop,
    }
}

/// A model turn requesting tool invocations, given (name, arguments)
/// pairs.
pub fn tool_turn(calls: &[(&str, Value)]) -> ModelTurn {
    ModelTurn {
        content: None,
        tool_calls: calls
            .iter()
            .enumerate()
            .map(|(i, (name, arguments))| ToolCall {
                id: format!("call_{}", i + 1),
                name: (*name).to_string(),
                arguments: arguments.to_string(),
            })
            .collect(),
        stop_reason: StopReason::ToolCalls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_extractor_scripted_and_default() {
        let extractor = MockExtractor::new().with_segment(
            "msg-1",
            ExtractedSegment {
                departure_airport: Some("SFO".to_string()),
                arrival_airport: Some("JFK".to_string()),
                flight_date: Some("2024-03-15".to_string()),
                ..Default::default()
            },
        );

        let scripted = extractor
            .extract(&EmailMessage::new("msg-1", "body"))
            .await
            .unwrap();
        assert!(scripted.valid);
        assert_eq!(scripted.segments.len(), 1);

        let unknown = extractor
            .extract(&EmailMessage::new("msg-2", "newsletter"))
            .await
            .unwrap();
        assert!(!unknown.valid);

        assert_eq!(extractor.calls(), vec!["msg-1", "msg-2"]);
    }

    #[tokio::test]
    async fn test_mock_extractor_transient_failures_run_out() {
        let extractor = MockExtractor::new().fail_transiently("msg-1", 2);
        let email = EmailMessage::new("msg-1", "body");

        assert!(extractor.extract(&email).await.is_err());
        assert!(extractor.extract(&email).await.is_err());
        assert!(extractor.extract(&email).await.is_ok());
        assert_eq!(extractor.call_count("msg-1"), 3);
    }

    #[tokio::test]
    async fn test_mock_chat_backend_plays_script_in_order() {
        let backend = MockChatBackend::new()
            .with_turn(tool_turn(&[("total_flights", json!({}))]))
            .with_answer("You flew 12 times.");

        let first = backend.complete(&[], &[]).await.unwrap();
        assert!(first.wants_tools());
        assert_eq!(first.tool_calls[0].name, "total_flights");

        let second = backend.complete(&[], &[]).await.unwrap();
        assert_eq!(second.content.as_deref(), Some("You flew 12 times."));

        // Script exhausted: still answers.
        let third = backend.complete(&[], &[]).await.unwrap();
        assert!(third.content.is_some());
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_chat_backend_fails_once() {
        let backend = MockChatBackend::new()
            .fail_next(BackendError::retryable("rate limited"))
            .with_answer("Recovered.");

        assert!(backend.complete(&[], &[]).await.is_err());
        assert!(backend.complete(&[], &[]).await.is_ok());
    }
}
