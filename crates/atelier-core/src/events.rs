//! Progress and pipeline event types delivered to observers.

use serde::{Deserialize, Serialize};

/// Phase of an indexing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexPhase {
    /// No run has started
    Idle,
    /// Discovering and chunking files
    Scanning,
    /// Embedding chunk batches
    Embedding,
    /// The last run completed successfully
    Done,
    /// The last run failed
    Error,
}

/// Structured progress report emitted at phase transitions and at each
/// embedding batch boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexProgress {
    /// Current phase
    pub status: IndexPhase,
    /// Human-readable progress message
    pub message: String,
    /// Items completed so far, when counting has started
    pub done: Option<u64>,
    /// Total expected items, when known
    pub total: Option<u64>,
}

impl IndexProgress {
    /// Creates a progress report for a phase transition.
    pub fn phase<T: Into<String>>(status: IndexPhase, message: T) -> Self {
        Self {
            status,
            message: message.into(),
            done: None,
            total: None,
        }
    }

    /// Creates a progress report for an embedding batch boundary.
    pub fn batch<T: Into<String>>(message: T, done: u64, total: u64) -> Self {
        Self {
            status: IndexPhase::Embedding,
            message: message.into(),
            done: Some(done),
            total: Some(total),
        }
    }
}

impl Default for IndexProgress {
    fn default() -> Self {
        Self::phase(IndexPhase::Idle, "")
    }
}

/// Role-scoped stage of the generation pipeline.
///
/// `Chat` is the single-stage case; the agent team runs the remaining
/// three in fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStage {
    /// Plain conversational response
    Chat,
    /// Breaks the request down into an implementation plan
    Planner,
    /// Implements the plan
    Coder,
    /// Reviews the implementation
    Reviewer,
}

impl AgentStage {
    /// Human-readable label shown when the stage starts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Chat => "Assistant",
            Self::Planner => "Planner",
            Self::Coder => "Coder",
            Self::Reviewer => "Reviewer",
        }
    }
}

/// Event delivered to the pipeline observer while a generation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PipelineEvent {
    /// A stage is about to produce its first fragment
    StageStart {
        /// Stage that started
        stage: AgentStage,
        /// Display label for the stage
        label: String,
    },
    /// A stage produced a text fragment
    StageChunk {
        /// Stage that produced the fragment
        stage: AgentStage,
        /// Fragment text
        text: String,
    },
    /// A stage's stream completed
    StageDone {
        /// Stage that completed
        stage: AgentStage,
    },
    /// Every stage of the run completed
    AllDone,
    /// The run failed; no further stages will execute
    Error {
        /// Human-readable failure message
        message: String,
    },
}
