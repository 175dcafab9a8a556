//! Chat message and file context types shared across the workspace.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs::read_to_string;
use std::path::PathBuf;

use crate::Result;

/// Role of a chat message author.
///
/// System instructions are passed separately to providers, so only the
/// conversational roles appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message written by the user
    User,
    /// Message produced by the assistant
    Assistant,
}

/// A single message in a conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author of the message
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Creates a user message.
    pub fn user<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant<T: Into<String>>(content: T) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Contents of a file the user currently has open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContext {
    /// Path to the file
    pub path: PathBuf,
    /// Full file content
    pub content: String,
}

impl FileContext {
    /// Reads a file into a context entry.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read.
    pub fn from_path(path: &PathBuf) -> Result<Self> {
        let content = read_to_string(path)?;
        Ok(Self {
            path: path.clone(),
            content,
        })
    }

    /// Creates a context entry from already-loaded content.
    #[must_use]
    pub fn new(path: PathBuf, content: String) -> Self {
        Self { path, content }
    }
}

/// Truncates text to at most `max_chars` characters.
///
/// Operates on character boundaries to avoid panics on multi-byte input;
/// returns the original slice unchanged when it already fits.
pub fn truncate_chars(text: &str, max_chars: usize) -> Cow<'_, str> {
    if text.chars().count() <= max_chars {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().take(max_chars).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_roles() {
        let user = ChatMessage::user("hello");
        assert_eq!(user.role, Role::User);
        let assistant = ChatMessage::assistant("hi");
        assert_eq!(assistant.role, Role::Assistant);
    }

    #[test]
    fn role_serializes_lowercase() {
        let serialized = serde_json::to_string(&Role::User).unwrap_or_default();
        assert_eq!(serialized, "\"user\"");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let short = truncate_chars("abc", 10);
        assert_eq!(short, "abc");

        // Multi-byte characters must not be split mid-sequence.
        let truncated = truncate_chars("héllo wörld", 4);
        assert_eq!(truncated, "héll");
    }
}
