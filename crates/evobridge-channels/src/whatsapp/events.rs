use serde::{Deserialize, Deserializer};

/// Event name Evolution uses for new (or updated) messages.
pub const MESSAGES_UPSERT: &str = "messages.upsert";

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Envelope of every Evolution webhook call.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    #[serde(default, deserialize_with = "null_as_default")]
    pub event: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub instance: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl InboundEvent {
    pub fn is_message_upsert(&self) -> bool {
        self.event == MESSAGES_UPSERT
    }

    /// Interpret `data` as a message payload. Shapes that don't fit (other
    /// event types, unexpected field types) yield an empty payload.
    pub fn message(&self) -> MessageData {
        MessageData::deserialize(&self.data).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub key: MessageKey,
    #[serde(default, rename = "pushName")]
    pub push_name: Option<String>,
    #[serde(default)]
    pub message: Option<MessageBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageKey {
    #[serde(default, rename = "remoteJid", deserialize_with = "null_as_default")]
    pub remote_jid: String,
    #[serde(default, rename = "fromMe", deserialize_with = "null_as_default")]
    pub from_me: bool,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub conversation: Option<String>,
    #[serde(default, rename = "extendedTextMessage")]
    pub extended_text_message: Option<ExtendedText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtendedText {
    #[serde(default)]
    pub text: Option<String>,
}

impl MessageData {
    /// Plain conversation text, else the extended-text body. Empty strings
    /// count as absent.
    pub fn text(&self) -> Option<&str> {
        let body = self.message.as_ref()?;
        body.conversation
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| {
                body.extended_text_message
                    .as_ref()
                    .and_then(|ext| ext.text.as_deref())
                    .filter(|t| !t.is_empty())
            })
    }

    pub fn sender(&self) -> &str {
        &self.key.remote_jid
    }

    pub fn display_name(&self) -> &str {
        self.push_name.as_deref().unwrap_or("Unknown")
    }
}
