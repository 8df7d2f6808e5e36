use axum::Json;
use axum::extract::State;
use serde::Serialize;
use serde_json::json;

use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub bot: &'static str,
    pub your_number: String,
    pub evolution_api: serde_json::Value,
    pub timestamp: String,
}

/// GET /health — bot liveness plus the Evolution instance connection state.
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let evolution = &state.evolution;
    let timestamp = chrono::Utc::now().to_rfc3339();

    let response = match evolution.connection_state().await {
        Ok(body) => {
            let connection = body
                .get("instance")
                .and_then(|i| i.get("state"))
                .or_else(|| body.get("state"))
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            HealthResponse {
                status: "healthy",
                bot: "running",
                your_number: state.your_number().to_string(),
                evolution_api: json!({
                    "connected": true,
                    "state": connection,
                    "instance": evolution.instance(),
                    "url": evolution.base_url(),
                }),
                timestamp,
            }
        }
        Err(e) => HealthResponse {
            status: "partially_healthy",
            bot: "running",
            your_number: state.your_number().to_string(),
            evolution_api: json!({
                "connected": false,
                "error": e.to_string(),
                "url": evolution.base_url(),
            }),
            timestamp,
        },
    };

    Json(response)
}
