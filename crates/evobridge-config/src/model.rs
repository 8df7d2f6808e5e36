use evobridge_common::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub evolution: EvolutionConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub owner: OwnerConfig,

    #[serde(default)]
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.llm.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Config(
                "llm.api_key is required (or set GROQ_API_KEY)".into(),
            ));
        }
        self.validate_evolution()?;
        if self.owner.phone_number.trim().is_empty() {
            return Err(Error::Config(
                "owner.phone_number is required (or set YOUR_PHONE_NUMBER)".into(),
            ));
        }
        Ok(())
    }

    /// Subset of [`validate`](Self::validate) needed by commands that only
    /// talk to the Evolution API (e.g. webhook registration).
    pub fn validate_evolution(&self) -> Result<()> {
        if self.evolution.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Config(
                "evolution.api_key is required (or set EVOLUTION_API_KEY)".into(),
            ));
        }
        url::Url::parse(&self.evolution.base_url).map_err(|e| {
            Error::Config(format!(
                "invalid evolution.base_url '{}': {e}",
                self.evolution.base_url
            ))
        })?;
        if self.evolution.instance_name.is_empty() {
            return Err(Error::Config("evolution.instance_name is empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Public URL the gateway should call back, used when registering the webhook.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Mount the `/debug/*` diagnostic routes.
    #[serde(default)]
    pub debug_routes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
            debug_routes: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    #[serde(default = "default_evolution_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_true")]
    pub ssl_verify: bool,

    #[serde(default)]
    pub send_format: SendFormat,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            base_url: default_evolution_url(),
            api_key: None,
            instance_name: default_instance_name(),
            ssl_verify: true,
            send_format: SendFormat::default(),
        }
    }
}

fn default_evolution_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_instance_name() -> String {
    "evolution_api".to_string()
}

fn default_true() -> bool {
    true
}

/// Body shape for `POST /message/sendText`.
///
/// Evolution API v2 takes the text at the top level; v1 nests it under
/// `textMessage`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendFormat {
    #[default]
    Text,
    Legacy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// OpenAI-compatible base URL; `/v1/chat/completions` is appended.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_llm_base_url(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerConfig {
    /// The only number the bot answers. Any `+` or `@s.whatsapp.net` suffix is
    /// ignored when comparing.
    #[serde(default = "default_phone_number")]
    pub phone_number: String,
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            phone_number: default_phone_number(),
        }
    }
}

fn default_phone_number() -> String {
    "+962787499976".to_string()
}
