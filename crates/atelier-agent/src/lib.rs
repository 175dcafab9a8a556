//! Generation pipeline: context assembly, single-turn chat, and the
//! plan → implement → review agent team.
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

/// Context-block assembly from memory, file, retrieval, and research parts.
pub mod assembler;
/// Single-turn streamed chat.
pub mod chat;
/// Persistent developer-facts memory.
pub mod memory;
/// Web research for queries that need current information.
pub mod research;
/// Fixed role prompts for each pipeline stage.
pub mod roles;
/// Shared stage runner for streamed generation calls.
pub mod stage;
/// The three-stage agent team.
pub mod team;

pub use assembler::assemble_context;
pub use chat::chat_stream;
pub use memory::{DuplicatePredicate, MemoryFact, MemoryStore, extract_facts};
pub use research::{
    ResearchClient, ResearchFindings, format_research_context, should_research,
};
pub use roles::system_prompt;
pub use stage::run_stage;
pub use team::{AgentTeam, TeamOutcome};
