//! Mock provider for testing generation pipelines.
//!
//! Allows defining canned responses for specific prompt patterns, enabling
//! end-to-end testing of staged workflows without real API calls. Responses
//! stream as word-sized fragments the way a real provider delivers tokens.

use async_trait::async_trait;
use futures::stream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use atelier_core::{
    ChatMessage, Error, IgnoreLock as _, ModelProvider, Result, TokenStream,
};

/// One recorded `generate` invocation.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// System prompt the call was made with
    pub system: String,
    /// Conversation history the call was made with
    pub messages: Vec<ChatMessage>,
}

impl RecordedCall {
    /// Content of the last user message, the part responses match against.
    pub fn last_user_content(&self) -> &str {
        self.messages
            .last()
            .map_or("", |message| message.content.as_str())
    }
}

/// Response storage type.
type ResponseMap = Arc<Mutex<HashMap<String, String>>>;

/// Mock provider that returns pre-defined streamed responses based on
/// prompt patterns.
#[derive(Clone)]
pub struct MockProvider {
    /// Predefined responses keyed by prompt substring
    responses: ResponseMap,
    /// Predefined failures keyed by prompt substring
    failures: ResponseMap,
    /// Default response if no pattern matches
    default_response: Arc<Mutex<Option<String>>>,
    /// Call history for verification
    call_history: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockProvider {
    /// Creates an empty mock provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            default_response: Arc::new(Mutex::new(None)),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a pattern-based response.
    #[must_use]
    pub fn with_response(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        {
            let mut responses = self.responses.lock_ignore_poison();
            responses.insert(pattern.into(), response.into());
        }
        self
    }

    /// Makes prompts matching `pattern` fail with a provider error.
    #[must_use]
    pub fn with_failure(self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        {
            let mut failures = self.failures.lock_ignore_poison();
            failures.insert(pattern.into(), message.into());
        }
        self
    }

    /// Sets the response used when no pattern matches.
    #[must_use]
    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        {
            let mut default = self.default_response.lock_ignore_poison();
            *default = Some(response.into());
        }
        self
    }

    /// Returns all recorded calls, oldest first.
    #[must_use]
    pub fn call_history(&self) -> Vec<RecordedCall> {
        let history = self.call_history.lock_ignore_poison();
        history.clone()
    }

    /// Number of `generate` calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        let history = self.call_history.lock_ignore_poison();
        history.len()
    }

    /// Finds a matching canned response for the given prompt.
    fn find_response(&self, prompt: &str) -> Option<String> {
        let responses = self.responses.lock_ignore_poison();

        if let Some(response) = responses.get(prompt) {
            return Some(response.clone());
        }

        for (pattern, response) in &*responses {
            if prompt.contains(pattern) {
                return Some(response.clone());
            }
        }

        None
    }

    /// Finds a matching injected failure for the given prompt.
    fn find_failure(&self, prompt: &str) -> Option<String> {
        let failures = self.failures.lock_ignore_poison();
        for (pattern, message) in &*failures {
            if prompt.contains(pattern) {
                return Some(message.clone());
            }
        }
        None
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, system: &str, messages: &[ChatMessage]) -> Result<TokenStream> {
        let call = RecordedCall {
            system: system.to_owned(),
            messages: messages.to_vec(),
        };
        let prompt = call.last_user_content().to_owned();
        {
            let mut history = self.call_history.lock_ignore_poison();
            history.push(call);
        }

        if let Some(message) = self.find_failure(&prompt) {
            return Err(Error::Provider(message));
        }

        let text = self.find_response(&prompt).unwrap_or_else(|| {
            let default = self.default_response.lock_ignore_poison();
            default
                .clone()
                .unwrap_or_else(|| format!("Mock response for: {prompt}"))
        });

        // Stream word-sized fragments; concatenated they reproduce the
        // canned response exactly.
        let fragments: Vec<Result<String>> = text
            .split_inclusive(' ')
            .map(|fragment| Ok(fragment.to_owned()))
            .collect();
        Ok(Box::pin(stream::iter(fragments)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt as _;

    async fn collect_text(provider: &MockProvider, prompt: &str) -> String {
        let result = provider.generate("system", &[ChatMessage::user(prompt)]).await;
        assert!(result.is_ok(), "Generation should start");
        let Ok(mut stream) = result else {
            return String::new();
        };
        let mut text = String::new();
        while let Some(fragment) = stream.next().await {
            if let Ok(piece) = fragment {
                text.push_str(&piece);
            }
        }
        text
    }

    #[tokio::test]
    async fn pattern_match_streams_the_canned_response() {
        let provider = MockProvider::new().with_response("login", "I will build the login form");

        let text = collect_text(&provider, "Please add a login page").await;
        assert_eq!(text, "I will build the login form");
    }

    #[tokio::test]
    async fn fragments_reassemble_exactly() {
        let provider = MockProvider::new().with_response("plan", "step one\nstep two  done");

        let text = collect_text(&provider, "make a plan").await;
        assert_eq!(text, "step one\nstep two  done");
    }

    #[tokio::test]
    async fn default_response_covers_unmatched_prompts() {
        let provider = MockProvider::new().with_default_response("Default response");

        let text = collect_text(&provider, "unmatched prompt").await;
        assert_eq!(text, "Default response");
    }

    #[tokio::test]
    async fn injected_failure_returns_provider_error() {
        let provider = MockProvider::new().with_failure("deploy", "backend offline");

        let result = provider
            .generate("system", &[ChatMessage::user("deploy it")])
            .await;
        assert!(result.is_err());
        if let Err(error) = result {
            assert!(matches!(error, Error::Provider(_)));
            assert_eq!(error.to_string(), "Provider error: backend offline");
        }
    }

    #[tokio::test]
    async fn call_history_records_system_and_messages() {
        let provider = MockProvider::new();

        let first = provider
            .generate("system one", &[ChatMessage::user("first query")])
            .await;
        assert!(first.is_ok());
        let second = provider
            .generate("system two", &[ChatMessage::user("second query")])
            .await;
        assert!(second.is_ok());

        let history = provider.call_history();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(history[0].system, "system one");
        assert_eq!(history[0].last_user_content(), "first query");
        assert_eq!(history[1].last_user_content(), "second query");
    }
}
