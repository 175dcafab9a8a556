//! The three-stage agent team: plan, implement, review.

use std::sync::Arc;

use atelier_core::{AgentStage, ChatMessage, EventChannel, ModelProvider, PipelineEvent, Result};

use crate::roles::system_prompt;
use crate::stage::run_stage;

/// Accumulated output of a completed team run.
#[derive(Debug, Clone)]
pub struct TeamOutcome {
    /// Text produced by the planner
    pub plan: String,
    /// Text produced by the coder
    pub code: String,
    /// Text produced by the reviewer
    pub review: String,
}

/// Drives the strict linear planner → coder → reviewer workflow.
///
/// Stages never overlap in time: each receives the fully accumulated text
/// of its predecessor, not streamed fragments. There is no branching and
/// no retry between stages — a stage failure halts the run after an error
/// event, and later stages are never attempted.
pub struct AgentTeam<P: ModelProvider> {
    provider: Arc<P>,
}

impl<P: ModelProvider> AgentTeam<P> {
    /// Creates a team over the given provider.
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// Runs all three stages, streaming events as they execute.
    ///
    /// # Errors
    /// Returns the first stage failure; the error has already been
    /// reported on the channel when this returns.
    pub async fn run(
        &self,
        user_request: &str,
        context_block: &str,
        events: &EventChannel,
    ) -> Result<TeamOutcome> {
        let plan = self
            .stage(
                AgentStage::Planner,
                planner_input(user_request, context_block),
                events,
            )
            .await?;

        let code = self
            .stage(
                AgentStage::Coder,
                coder_input(user_request, &plan, context_block),
                events,
            )
            .await?;

        let review = self
            .stage(
                AgentStage::Reviewer,
                reviewer_input(user_request, &code),
                events,
            )
            .await?;

        events.send(PipelineEvent::AllDone);
        Ok(TeamOutcome { plan, code, review })
    }

    /// Runs one stage with its fixed role prompt.
    async fn stage(
        &self,
        stage: AgentStage,
        input: String,
        events: &EventChannel,
    ) -> Result<String> {
        run_stage(
            self.provider.as_ref(),
            stage,
            system_prompt(stage),
            &[ChatMessage::user(input)],
            events,
        )
        .await
    }
}

/// Planner input: the request, plus the context block when present.
fn planner_input(user_request: &str, context_block: &str) -> String {
    if context_block.is_empty() {
        user_request.to_owned()
    } else {
        format!("{user_request}\n\n---\n\n{context_block}")
    }
}

/// Coder input: the request, the complete plan, and the context block.
fn coder_input(user_request: &str, plan: &str, context_block: &str) -> String {
    let context_section = if context_block.is_empty() {
        String::new()
    } else {
        format!("## Context:\n{context_block}\n\n")
    };
    format!(
        "## User Request:\n{user_request}\n\n## Plan from Planner:\n{plan}\n\n\
         {context_section}Now implement this. Write the complete code."
    )
}

/// Reviewer input: the request and the complete implementation — the plan
/// is deliberately absent so the review judges the code on its own.
fn reviewer_input(user_request: &str, code: &str) -> String {
    format!(
        "## Original request:\n{user_request}\n\n## Code written by Coder:\n{code}\n\n\
         Review this code thoroughly."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_providers::MockProvider;
    use tokio::sync::mpsc::UnboundedReceiver;

    const PLAN_TEXT: &str = "## Plan\nAdd a retry helper with exponential backoff.";
    const CODE_TEXT: &str = "FILE: src/retry.rs\n```rust\npub fn retry() {}\n```";
    const REVIEW_TEXT: &str = "## Code Review\nLooks solid. 9/10";

    fn scripted_provider() -> MockProvider {
        // The planner prompt contains neither marker, so it falls through
        // to the default; later stages match on their section headers.
        MockProvider::new()
            .with_default_response(PLAN_TEXT)
            .with_response("## Plan from Planner:", CODE_TEXT)
            .with_response("## Code written by Coder:", REVIEW_TEXT)
    }

    fn drain(mut receiver: UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn stages_run_in_order_and_chain_their_outputs() {
        let provider = Arc::new(scripted_provider());
        let team = AgentTeam::new(Arc::clone(&provider));
        let (events, receiver) = EventChannel::new();

        let outcome = team
            .run("add retry logic", "## Context block", &events)
            .await
            .unwrap();

        assert_eq!(outcome.plan, PLAN_TEXT);
        assert_eq!(outcome.code, CODE_TEXT);
        assert_eq!(outcome.review, REVIEW_TEXT);

        let history = provider.call_history();
        assert_eq!(history.len(), 3);

        // The coder receives the planner's complete accumulated text, and
        // the reviewer receives the coder's — never streamed fragments.
        assert!(history[1].last_user_content().contains(PLAN_TEXT));
        assert!(history[1].last_user_content().contains("add retry logic"));
        assert!(history[1].last_user_content().contains("## Context block"));
        assert!(history[2].last_user_content().contains(CODE_TEXT));
        assert!(
            !history[2].last_user_content().contains(PLAN_TEXT),
            "The reviewer sees the implementation, not the plan"
        );

        // Each stage ran with its own fixed role prompt.
        assert!(history[0].system.contains("PLANNER agent"));
        assert!(history[1].system.contains("CODER agent"));
        assert!(history[2].system.contains("REVIEWER agent"));

        assert!(!drain(receiver).is_empty());
    }

    #[tokio::test]
    async fn events_follow_the_stage_protocol() {
        let provider = Arc::new(scripted_provider());
        let team = AgentTeam::new(Arc::clone(&provider));
        let (events, receiver) = EventChannel::new();

        team.run("add retry logic", "", &events).await.unwrap();
        let all = drain(receiver);

        // Starts appear in pipeline order.
        let starts: Vec<AgentStage> = all
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::StageStart { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            starts,
            vec![AgentStage::Planner, AgentStage::Coder, AgentStage::Reviewer]
        );

        // Concatenated planner chunks reproduce the plan exactly — the
        // same text the coder stage consumed.
        let planner_text: String = all
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::StageChunk { stage, text } if *stage == AgentStage::Planner => {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect();
        assert_eq!(planner_text, PLAN_TEXT);

        // Every stage closes before the next one starts, and the run ends
        // with a single all-done event.
        assert!(matches!(all.last(), Some(PipelineEvent::AllDone)));
        let done_count = all
            .iter()
            .filter(|event| matches!(event, PipelineEvent::StageDone { .. }))
            .count();
        assert_eq!(done_count, 3);
    }

    #[tokio::test]
    async fn coder_failure_halts_before_the_reviewer() {
        let provider = Arc::new(
            MockProvider::new()
                .with_default_response(PLAN_TEXT)
                .with_failure("## Plan from Planner:", "model overloaded"),
        );
        let team = AgentTeam::new(Arc::clone(&provider));
        let (events, receiver) = EventChannel::new();

        let result = team.run("add retry logic", "", &events).await;
        assert!(result.is_err());

        // Planner ran, coder failed, reviewer was never attempted.
        assert_eq!(provider.call_count(), 2);

        let all = drain(receiver);
        let error_messages: Vec<&str> = all
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::Error { message } => Some(message.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(error_messages.len(), 1);
        assert!(error_messages[0].contains("model overloaded"));
        assert!(
            !all.iter().any(|event| matches!(event, PipelineEvent::AllDone)),
            "A failed run never reports completion"
        );
    }
}
