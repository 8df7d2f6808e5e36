pub mod api;
pub mod events;

use async_trait::async_trait;

use crate::traits::Channel;

pub use api::{
    DispatchError, EvolutionClient, GatewayReply, OutboundMessage, SendOptions, WEBHOOK_EVENTS,
};
pub use events::{InboundEvent, MESSAGES_UPSERT, MessageData, MessageKey};

#[async_trait]
impl Channel for EvolutionClient {
    fn channel_type(&self) -> &str {
        "whatsapp"
    }

    fn display_name(&self) -> &str {
        "WhatsApp (Evolution API)"
    }

    async fn send_text(&self, to: &str, text: &str) -> Result<serde_json::Value, DispatchError> {
        EvolutionClient::send_text(self, to, text).await
    }
}
