//! Diagnostic routes, mounted only when `server.debug_routes` is on.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::info;

use crate::state::SharedState;

const DEBUG_TEST_MESSAGE: &str = "Test message from debug endpoint";

/// Show enough of a secret to recognize it in logs.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}

/// GET /debug/config — effective configuration with secrets masked.
pub async fn show_config(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let config = &state.config;
    let evolution_key = config.evolution.api_key.as_deref().unwrap_or_default();
    Json(json!({
        "your_phone_number": config.owner.phone_number,
        "evolution_api_url": config.evolution.base_url,
        "instance_name": config.evolution.instance_name,
        "bot_url": config.server.public_url,
        "port": config.server.port,
        "ssl_verify": config.evolution.ssl_verify,
        "send_format": config.evolution.send_format,
        "evolution_api_key_set": !evolution_key.is_empty(),
        "evolution_api_key": mask_secret(evolution_key),
        "llm_model": config.llm.model,
        "llm_base_url": config.llm.base_url,
        "llm_api_key_set": config.llm.api_key.as_deref().is_some_and(|k| !k.is_empty()),
    }))
}

/// GET /debug/test-connection — raw connection-state call.
pub async fn test_connection(State(state): State<SharedState>) -> impl IntoResponse {
    let evolution = &state.evolution;
    let apikey_shown = if evolution.has_api_key() { "***" } else { "None" };
    match evolution.probe_connection_state().await {
        Ok(reply) => {
            info!("tested connection to {}: {}", reply.url, reply.status);
            (
                StatusCode::OK,
                Json(json!({
                    "url": reply.url,
                    "status_code": reply.status,
                    "response": reply.body,
                    "headers_sent": {"apikey": apikey_shown},
                })),
            )
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": e.to_string() })),
        ),
    }
}

/// POST /debug/test-send — send a test message to the owner, reporting errors inline.
pub async fn test_send(State(state): State<SharedState>) -> Json<serde_json::Value> {
    match state
        .evolution
        .send_text(state.your_number(), DEBUG_TEST_MESSAGE)
        .await
    {
        Ok(result) => Json(json!({
            "status": "success",
            "message": "Test message sent",
            "result": result,
        })),
        Err(e) => Json(json!({
            "status": "error",
            "error": e.to_string(),
            "status_code": e.status(),
        })),
    }
}

/// GET /debug/test-api-key — call an authenticated endpoint to check the key.
pub async fn test_api_key(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let config = &state.config;
    let key = config.evolution.api_key.as_deref().unwrap_or_default();
    info!(
        "testing Evolution API key (length {}, {})",
        key.len(),
        mask_secret(key)
    );

    match state.evolution.fetch_instances().await {
        Ok(reply) => Json(json!({
            "url": reply.url,
            "status_code": reply.status,
            "success": reply.is_success(),
            "response": reply.body,
            "actual_apikey_length": key.len(),
        })),
        Err(e) => Json(json!({
            "error": e.to_string(),
            "config_check": {
                "evolution_api_url": config.evolution.base_url,
                "instance_name": config.evolution.instance_name,
                "api_key_set": !key.is_empty(),
            },
        })),
    }
}

/// GET /debug/test-headers — try the key under several header spellings
/// against `fetchInstances` to find the one the server accepts.
pub async fn test_headers(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let key = state.config.evolution.api_key.as_deref().unwrap_or_default();
    let mut tests = Vec::new();

    for (i, (name, value)) in header_variants(key).into_iter().enumerate() {
        let attempt = i + 1;
        match state.evolution.fetch_instances_with_header(name, &value).await {
            Ok(reply) => {
                let success = reply.status == 200;
                let response = if success {
                    "Success!".to_string()
                } else {
                    preview(&reply.body)
                };
                tests.push(json!({
                    "attempt": attempt,
                    "header_name": name,
                    "status_code": reply.status,
                    "success": success,
                    "response": response,
                }));
            }
            Err(e) => tests.push(json!({"attempt": attempt, "error": e.to_string()})),
        }
    }

    Json(json!({
        "url": format!("{}/instance/fetchInstances", state.evolution.base_url()),
        "tests": tests,
    }))
}

fn header_variants(key: &str) -> Vec<(&'static str, String)> {
    vec![
        ("apikey", key.to_string()),
        ("apiKey", key.to_string()),
        ("API-KEY", key.to_string()),
        ("Api-Key", key.to_string()),
        ("Authorization", format!("Bearer {key}")),
    ]
}

/// First 200 characters of a reply body.
fn preview(body: &serde_json::Value) -> String {
    let text = match body {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.chars().take(200).collect()
}
