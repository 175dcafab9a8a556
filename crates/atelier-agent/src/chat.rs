use atelier_core::{AgentStage, ChatMessage, EventChannel, ModelProvider, PipelineEvent, Result};

use crate::roles::CHAT_PROMPT;
use crate::stage::run_stage;

/// Streams a single-turn chat response.
///
/// This is the one-stage case of the generation pipeline: the assembled
/// context block rides in the system prompt alongside the chat role
/// instructions, and the full conversation history is passed through.
/// Fragments stream as chat-stage chunk events, followed by a final
/// all-done event.
///
/// # Errors
/// Returns the provider's failure after reporting it on the channel.
pub async fn chat_stream<P: ModelProvider + ?Sized>(
    provider: &P,
    context_block: &str,
    history: &[ChatMessage],
    events: &EventChannel,
) -> Result<String> {
    let system = if context_block.is_empty() {
        CHAT_PROMPT.to_owned()
    } else {
        format!("{CHAT_PROMPT}\n\n{context_block}")
    };

    let response = run_stage(provider, AgentStage::Chat, &system, history, events).await?;
    events.send(PipelineEvent::AllDone);
    Ok(response)
}
