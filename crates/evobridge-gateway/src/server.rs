use std::sync::Arc;

use evobridge_common::Result;
use evobridge_config::AppConfig;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Binds the configured address and serves the webhook and helper routes.
pub struct GatewayServer {
    config: AppConfig,
}

impl GatewayServer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);

        info!("{}", "=".repeat(60));
        info!("starting WhatsApp bot");
        info!("your WhatsApp number: {}", self.config.owner.phone_number);
        info!("Evolution API URL: {}", self.config.evolution.base_url);
        info!("instance name: {}", self.config.evolution.instance_name);
        info!("model: {}", self.config.llm.model);
        info!("{}", "=".repeat(60));

        let state = Arc::new(AppState::from_config(self.config)?);
        let app = build_router(state);

        let listener = TcpListener::bind(&addr).await?;
        info!("evobridge listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| evobridge_common::Error::Gateway(format!("server error: {e}")))?;

        info!("shutting down WhatsApp bot");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}
