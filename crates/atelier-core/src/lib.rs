//! Core types and traits for the atelier assistant.
//!
//! This crate provides the error taxonomy, configuration, chat and provider
//! types, pipeline events, and the streaming channel shared by the retrieval
//! and generation crates.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Test allows"
    )
)]

/// Configuration types and file/env loading.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Indexing progress and pipeline event types.
pub mod events;
/// Event channel for streamed pipeline output.
pub mod streaming;
/// Synchronization utilities for poisoned locks.
pub mod sync;
/// Trait definitions for streaming model providers.
pub mod traits;
/// Core data types for chat messages and file context.
pub mod types;

pub use config::{Config, IndexConfig, MemoryConfig, ModelConfig, SearchConfig};
pub use error::{Error, Result};
pub use events::{AgentStage, IndexPhase, IndexProgress, PipelineEvent};
pub use streaming::EventChannel;
pub use sync::{IgnoreLock, IgnoreRwLock};
pub use traits::{ModelProvider, TokenStream};
pub use types::{ChatMessage, FileContext, Role, truncate_chars};
