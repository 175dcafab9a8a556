//! Provider adapters for streamed text generation.
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

/// Mock provider for pipeline tests.
pub mod mock;
/// Ollama chat provider with NDJSON streaming.
pub mod ollama;

pub use mock::{MockProvider, RecordedCall};
pub use ollama::OllamaProvider;
