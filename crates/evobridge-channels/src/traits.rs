use async_trait::async_trait;

use crate::whatsapp::DispatchError;

/// Outbound side of a messaging channel.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Unique identifier for this channel type (e.g. "whatsapp").
    fn channel_type(&self) -> &str;

    /// Human-readable display name.
    fn display_name(&self) -> &str;

    /// Deliver a text message to `to`. A single attempt; callers decide
    /// whether a failure matters.
    async fn send_text(&self, to: &str, text: &str) -> Result<serde_json::Value, DispatchError>;
}
