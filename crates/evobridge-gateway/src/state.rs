use std::sync::Arc;
use std::time::Duration;

use evobridge_agents::{CompletionClient, OpenAiProvider};
use evobridge_channels::EvolutionClient;
use evobridge_common::{Error, Result};
use evobridge_config::AppConfig;
use evobridge_security::SenderFilter;

use crate::pipeline::MessagePipeline;

/// Shared application state accessible from all request handlers.
pub struct AppState {
    pub config: AppConfig,
    pub evolution: EvolutionClient,
    pub pipeline: MessagePipeline,
}

impl AppState {
    pub fn new(config: AppConfig, evolution: EvolutionClient, pipeline: MessagePipeline) -> Self {
        Self {
            config,
            evolution,
            pipeline,
        }
    }

    /// Wire the Evolution client, the completion provider and the sender
    /// filter from configuration.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let evolution = EvolutionClient::from_config(&config.evolution)?;

        let api_key = config
            .llm
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("llm.api_key is not set".into()))?;
        let provider = OpenAiProvider::new(
            api_key,
            Some(config.llm.model.clone()),
            Some(config.llm.base_url.clone()),
        )
        .with_timeout(Duration::from_secs(config.llm.timeout_secs));
        let completion = CompletionClient::new(Arc::new(provider), config.llm.model.clone());

        let pipeline = MessagePipeline::new(
            SenderFilter::new(&config.owner.phone_number),
            completion,
            Arc::new(evolution.clone()),
        );

        Ok(Self::new(config, evolution, pipeline))
    }

    /// The owner's number as configured (not normalized), echoed in responses.
    pub fn your_number(&self) -> &str {
        &self.config.owner.phone_number
    }
}

pub type SharedState = Arc<AppState>;
