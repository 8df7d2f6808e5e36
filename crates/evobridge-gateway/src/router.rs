use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::state::SharedState;
use crate::{debug, health, messages, webhook};

/// Build the main application router with all routes.
pub fn build_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/health", get(health::health))
        .route("/messages/test", post(messages::send_test_message))
        .route("/messages/send", post(messages::send_custom_message))
        .route("/webhook", post(webhook::messages_upsert))
        .route("/webhook/{event}", post(webhook::messages_upsert));

    if state.config.server.debug_routes {
        router = router
            .route("/debug/config", get(debug::show_config))
            .route("/debug/test-connection", get(debug::test_connection))
            .route("/debug/test-send", post(debug::test_send))
            .route("/debug/test-api-key", get(debug::test_api_key))
            .route("/debug/test-headers", get(debug::test_headers));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

async fn index(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let mut endpoints = json!({
        "health": "/health",
        "test_message": "/messages/test",
        "webhook": "/webhook/messages-upsert",
    });
    if state.config.server.debug_routes {
        endpoints["debug"] = json!("/debug/config");
    }

    Json(json!({
        "message": "WhatsApp Bot API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
    }))
}
