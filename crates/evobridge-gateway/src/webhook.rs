use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use evobridge_channels::InboundEvent;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::pipeline::{PipelineOutcome, SkipReason};
use crate::state::SharedState;

/// Body returned to the gateway for every webhook call.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
    pub message: String,
    pub your_number: String,
}

impl WebhookResponse {
    fn success(your_number: &str) -> Self {
        Self {
            status: "success",
            message: "Webhook processed".to_string(),
            your_number: your_number.to_string(),
        }
    }

    fn error(message: impl Into<String>, your_number: &str) -> Self {
        Self {
            status: "error",
            message: message.into(),
            your_number: your_number.to_string(),
        }
    }
}

/// POST handler for Evolution webhook calls, both the bare `/webhook` and the
/// per-event `/webhook/{event}` paths used with `webhook_by_events`.
///
/// Always answers 200 so the gateway does not retry; problems are reported in
/// the body's `status` field.
pub async fn messages_upsert(State(state): State<SharedState>, body: Bytes) -> Json<WebhookResponse> {
    let your_number = state.your_number();

    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            error!("invalid JSON in webhook: {e}");
            return Json(WebhookResponse::error("Invalid JSON", your_number));
        }
    };

    if !value.is_object() {
        error!("webhook payload is not a JSON object");
        return Json(WebhookResponse::error(
            "Invalid payload: expected a JSON object",
            your_number,
        ));
    }

    let event: InboundEvent = match serde_json::from_value(value) {
        Ok(ev) => ev,
        Err(e) => {
            error!("unexpected webhook payload: {e}");
            return Json(WebhookResponse::error(
                format!("Invalid payload: {e}"),
                your_number,
            ));
        }
    };

    match state.pipeline.process(&event).await {
        PipelineOutcome::Dispatched => {}
        PipelineOutcome::Skipped(SkipReason::UnauthorizedSender) => {}
        PipelineOutcome::Skipped(reason) => debug!("no action: {reason:?}"),
        PipelineOutcome::Failed(kind) => warn!("webhook processed with failure: {kind:?}"),
    }

    Json(WebhookResponse::success(your_number))
}
