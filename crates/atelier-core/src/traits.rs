use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::{ChatMessage, Result};

/// Stream of text fragments produced by a generation call.
///
/// Fragments arrive in generation order and end when the provider closes
/// the stream; a mid-stream transport failure surfaces as a single `Err`
/// item and terminates the stream.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Trait for AI model providers that stream generated text.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Returns the unique identifier for this provider.
    fn name(&self) -> &'static str;

    /// Checks whether this provider is currently reachable.
    async fn is_available(&self) -> bool;

    /// Starts a generation and returns the stream of text fragments.
    ///
    /// `system` carries the role instructions and assembled context;
    /// `messages` is the conversation history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be issued or the provider
    /// rejects it; mid-stream failures are delivered through the stream.
    async fn generate(&self, system: &str, messages: &[ChatMessage]) -> Result<TokenStream>;
}
