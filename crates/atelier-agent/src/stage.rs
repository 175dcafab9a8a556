use futures::StreamExt as _;

use atelier_core::{
    AgentStage, ChatMessage, EventChannel, ModelProvider, PipelineEvent, Result,
};

/// Runs one role-scoped generation stage to completion.
///
/// Emits a start event before the first fragment, a chunk event per
/// fragment as the provider delivers it, and a done event when the stream
/// ends; the fully accumulated text is returned for the next stage. Any
/// failure — at call time or mid-stream — emits an error event and
/// propagates, so callers halt instead of attempting later stages.
///
/// # Errors
/// Returns the provider's failure after reporting it on the channel.
pub async fn run_stage<P: ModelProvider + ?Sized>(
    provider: &P,
    stage: AgentStage,
    system: &str,
    messages: &[ChatMessage],
    events: &EventChannel,
) -> Result<String> {
    events.send(PipelineEvent::StageStart {
        stage,
        label: stage.label().to_owned(),
    });

    let mut stream = match provider.generate(system, messages).await {
        Ok(stream) => stream,
        Err(error) => {
            events.send(PipelineEvent::Error {
                message: error.to_string(),
            });
            return Err(error);
        }
    };

    let mut accumulated = String::new();
    while let Some(fragment) = stream.next().await {
        match fragment {
            Ok(text) => {
                accumulated.push_str(&text);
                events.send(PipelineEvent::StageChunk { stage, text });
            }
            Err(error) => {
                events.send(PipelineEvent::Error {
                    message: error.to_string(),
                });
                return Err(error);
            }
        }
    }

    events.send(PipelineEvent::StageDone { stage });
    Ok(accumulated)
}
