use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::state::SharedState;

pub const TEST_MESSAGE: &str = "Hello from the bot! This is a test message.";

#[derive(Deserialize)]
pub struct SendParams {
    pub number: String,
    pub message: String,
}

/// POST /messages/test — send a fixed message to the owner.
pub async fn send_test_message(State(state): State<SharedState>) -> impl IntoResponse {
    match state
        .evolution
        .send_text(state.your_number(), TEST_MESSAGE)
        .await
    {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "message": "Test message sent",
                "response": result,
            })),
        ),
        Err(e) => {
            warn!("test message failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": format!("Failed to send test message: {e}") })),
            )
        }
    }
}

/// POST /messages/send?number=…&message=… — send arbitrary text to any number.
pub async fn send_custom_message(
    State(state): State<SharedState>,
    Query(params): Query<SendParams>,
) -> impl IntoResponse {
    match state.evolution.send_text(&params.number, &params.message).await {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "message": format!("Message sent to {}", params.number),
                "response": result,
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": format!("Failed to send message: {e}") })),
        ),
    }
}
