use std::sync::Arc;

use evobridge_agents::CompletionClient;
use evobridge_channels::{Channel, DispatchError, InboundEvent};
use evobridge_security::{OutputSanitizer, SenderFilter};
use tracing::{debug, error, info};

/// What happened to one webhook event.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// A reply was generated and accepted by the gateway.
    Dispatched,
    Skipped(SkipReason),
    Failed(FailureKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a `messages.upsert` event.
    UnsupportedEvent(String),
    /// Upsert without text (media, reactions, protocol messages).
    NoText,
    /// Sender is not the configured owner.
    UnauthorizedSender,
}

#[derive(Debug)]
pub enum FailureKind {
    Dispatch(DispatchError),
}

/// Inbound event -> filter -> completion -> sanitize -> send.
#[derive(Clone)]
pub struct MessagePipeline {
    filter: SenderFilter,
    completion: CompletionClient,
    channel: Arc<dyn Channel>,
}

impl MessagePipeline {
    pub fn new(filter: SenderFilter, completion: CompletionClient, channel: Arc<dyn Channel>) -> Self {
        Self {
            filter,
            completion,
            channel,
        }
    }

    pub async fn process(&self, event: &InboundEvent) -> PipelineOutcome {
        info!("webhook event: {}", event.event);

        if !event.is_message_upsert() {
            return PipelineOutcome::Skipped(SkipReason::UnsupportedEvent(event.event.clone()));
        }

        let message = event.message();
        let sender = message.sender();

        let Some(text) = message.text() else {
            debug!("upsert from {sender} carries no text");
            return PipelineOutcome::Skipped(SkipReason::NoText);
        };

        if !self.filter.is_allowed(sender) {
            return PipelineOutcome::Skipped(SkipReason::UnauthorizedSender);
        }

        info!(
            "message from {} ({sender}): {} chars",
            message.display_name(),
            text.chars().count()
        );

        let raw_reply = self.completion.reply(text).await;
        let reply = OutputSanitizer::strip_reasoning(&raw_reply);
        debug!("model reply: {raw_reply}");

        match self.channel.send_text(sender, &reply).await {
            Ok(_) => {
                info!("reply sent to {sender} via {}", self.channel.channel_type());
                PipelineOutcome::Dispatched
            }
            Err(e) => {
                error!("failed to send reply to {sender}: {e}");
                PipelineOutcome::Failed(FailureKind::Dispatch(e))
            }
        }
    }
}
