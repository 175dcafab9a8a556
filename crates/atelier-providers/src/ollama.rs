use async_trait::async_trait;
use futures::{StreamExt as _, stream};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use atelier_core::{ChatMessage, Error, ModelConfig, ModelProvider, Result, Role, TokenStream};

/// Streaming chat provider backed by a local Ollama service.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model: String,
}

/// Ollama API request for a streamed chat completion.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    /// Model to use for generation.
    model: String,
    /// Conversation including the system message.
    messages: Vec<OllamaChatMessage>,
    /// Whether to stream the response.
    stream: bool,
}

/// A single message on the Ollama wire format.
#[derive(Debug, Serialize)]
struct OllamaChatMessage {
    /// Message role: `system`, `user`, or `assistant`.
    role: String,
    /// Message text.
    content: String,
}

/// One NDJSON line of a streamed chat response.
#[derive(Debug, Deserialize)]
struct OllamaChatChunk {
    /// Incremental message payload, absent on some terminal lines.
    #[serde(default)]
    message: Option<OllamaChunkMessage>,
}

/// Message payload within a streamed chunk.
#[derive(Debug, Deserialize)]
struct OllamaChunkMessage {
    /// Fragment of generated text.
    #[serde(default)]
    content: String,
}

impl OllamaProvider {
    /// Creates a provider for the configured host and chat model.
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.ollama_host.clone(),
            model: config.chat_model.clone(),
        }
    }

    /// Overrides the chat model.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Maps the conversation onto the Ollama wire format, system first.
    fn build_messages(system: &str, messages: &[ChatMessage]) -> Vec<OllamaChatMessage> {
        let mut wire = vec![OllamaChatMessage {
            role: "system".to_owned(),
            content: system.to_owned(),
        }];
        for message in messages {
            wire.push(OllamaChatMessage {
                role: match message.role {
                    Role::User => "user".to_owned(),
                    Role::Assistant => "assistant".to_owned(),
                },
                content: message.content.clone(),
            });
        }
        wire
    }
}

/// Extracts the text fragment from one NDJSON line, if it carries any.
///
/// Lines that fail to parse are skipped rather than failing the stream;
/// Ollama intersperses keep-alive and terminal lines with content lines.
fn parse_line(line: &str) -> Option<String> {
    let chunk: OllamaChatChunk = serde_json::from_str(line).ok()?;
    let content = chunk.message?.content;
    if content.is_empty() { None } else { Some(content) }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .is_ok()
    }

    async fn generate(&self, system: &str, messages: &[ChatMessage]) -> Result<TokenStream> {
        let request = OllamaChatRequest {
            model: self.model.clone(),
            messages: Self::build_messages(system, messages),
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|error| Error::Provider(format!("Ollama request failed: {error}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("Ollama returned {status}: {body}")));
        }

        let (sender, receiver) = mpsc::unbounded_channel::<Result<String>>();
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(piece) = byte_stream.next().await {
                let bytes = match piece {
                    Ok(bytes) => bytes,
                    Err(error) => {
                        // Surface the transport failure as one typed error,
                        // then end the stream.
                        drop(
                            sender
                                .send(Err(Error::Provider(format!("Ollama stream failed: {error}")))),
                        );
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_owned();
                    buffer.drain(..=newline);
                    if let Some(content) = parse_line(&line)
                        && sender.send(Ok(content)).is_err()
                    {
                        return;
                    }
                }
            }

            let trailing = buffer.trim();
            if let Some(content) = parse_line(trailing) {
                drop(sender.send(Ok(content)));
            }
        });

        Ok(Box::pin(stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|item| (item, receiver))
        })))
    }
}
