use std::sync::Arc;

use tracing::{error, info};

use crate::providers::{ChatMessage, LlmProvider, LlmRequest};

pub const SYSTEM_PROMPT: &str = "You are a helpful WhatsApp assistant. Keep responses concise and friendly. Do not include any thinking process or internal reasoning in your response.";

/// Sent in place of a model reply when the provider cannot be reached.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process your message right now.";

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 500;

/// Turns one inbound message into one reply. Never fails: provider errors
/// degrade to [`FALLBACK_REPLY`].
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl CompletionClient {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_for(&self, user_text: &str) -> LlmRequest {
        LlmRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(user_text)],
            system: Some(SYSTEM_PROMPT.to_string()),
            max_tokens: Some(MAX_TOKENS),
            temperature: Some(TEMPERATURE),
        }
    }

    pub async fn reply(&self, user_text: &str) -> String {
        let request = self.request_for(user_text);

        match self.provider.complete(&request).await {
            Ok(response) => match response.text.filter(|t| !t.is_empty()) {
                Some(text) => {
                    if let Some(usage) = &response.usage {
                        info!(
                            "completion from {}: {} in / {} out tokens",
                            self.provider.provider_id(),
                            usage.input_tokens,
                            usage.output_tokens
                        );
                    }
                    text
                }
                None => {
                    error!(
                        "{} returned no completion choice, using fallback reply",
                        self.provider.provider_id()
                    );
                    FALLBACK_REPLY.to_string()
                }
            },
            Err(e) => {
                error!("{} completion failed: {e}", self.provider.provider_id());
                FALLBACK_REPLY.to_string()
            }
        }
    }
}
