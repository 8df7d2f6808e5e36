pub mod completion;
pub mod openai;
pub mod providers;

pub use completion::{CompletionClient, FALLBACK_REPLY, SYSTEM_PROMPT};
pub use openai::OpenAiProvider;
pub use providers::{ChatMessage, ChatRole, LlmProvider, LlmRequest, LlmResponse, Usage};
