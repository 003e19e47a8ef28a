//! Mock chat provider for deterministic testing.
//!
//! Returns pre-configured responses without making any HTTP calls.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use duka_core::{DukaError, Result};

use crate::provider::{ChatProvider, CompletionRequest};

enum MockReply {
    Text(String),
    Error(String),
}

/// A mock provider that returns scripted completions in order and records
/// every request for test assertions.
pub struct MockProvider {
    replies: Arc<Mutex<Vec<MockReply>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    name: String,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(vec![])),
            requests: Arc::new(Mutex::new(vec![])),
            name: name.into(),
        }
    }

    /// Queue a completion text.
    pub fn with_response(self, text: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Text(text.to_string()));
        self
    }

    /// Queue a provider error.
    pub fn with_error(self, error: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Error(error.to_string()));
        self
    }

    /// All requests made to this provider so far.
    pub fn recorded_requests(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        Arc::clone(&self.requests)
    }

    /// How many completion calls were made.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok("(mock: no more queued responses)".to_string());
        }
        match replies.remove(0) {
            MockReply::Text(text) => Ok(text),
            MockReply::Error(e) => Err(DukaError::Provider(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duka_core::ChatMessage;

    fn req() -> CompletionRequest {
        CompletionRequest {
            model: "test".into(),
            messages: vec![ChatMessage::user("hello")],
            temperature: 0.4,
            max_tokens: 256,
        }
    }

    #[tokio::test]
    async fn scripted_responses_in_order() {
        let provider = MockProvider::new("mock")
            .with_response("first")
            .with_response("second");
        assert_eq!(provider.complete(&req()).await.unwrap(), "first");
        assert_eq!(provider.complete(&req()).await.unwrap(), "second");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn scripted_error() {
        let provider = MockProvider::new("mock").with_error("HTTP 429: rate limited");
        assert!(provider.complete(&req()).await.is_err());
    }

    #[tokio::test]
    async fn records_requests() {
        let provider = MockProvider::new("mock").with_response("ok");
        let _ = provider.complete(&req()).await;
        let recorded = provider.recorded_requests();
        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].messages[0].content, "hello");
    }
}
