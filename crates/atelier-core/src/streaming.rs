use tokio::sync::mpsc;
use tracing::warn;

use crate::PipelineEvent;

/// Channel for streaming pipeline events to an observer.
///
/// Sends never block; the pipeline pushes fragments as the provider
/// produces them and the consumer drains at its own pace.
#[derive(Clone)]
pub struct EventChannel {
    sender: mpsc::UnboundedSender<PipelineEvent>,
}

impl EventChannel {
    /// Creates a channel, returning the sending half and the receiver the
    /// consumer drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Creates a channel from an existing sender (for testing).
    pub fn from_sender(sender: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self { sender }
    }

    /// Sends an event through the channel.
    ///
    /// Events are dropped with a warning if the receiver has been closed;
    /// a departed observer must not abort a generation in flight.
    pub fn send(&self, event: PipelineEvent) {
        if let Err(error) = self.sender.send(event) {
            warn!("Failed to send pipeline event: {}", error);
        }
    }
}
