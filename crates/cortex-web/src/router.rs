//! Router configuration

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::handlers::{chat, conversations, health, schema};
use crate::sse::steps_sse;
use crate::state::AppState;
use crate::websocket::steps_websocket;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/api/health", get(health::health_handler))
        .route("/api/status", get(health::status_handler))
        // Chat
        .route("/api/chat", post(chat::chat_handler))
        // Schema
        .route("/api/schema", get(schema::get_schema))
        .route("/api/schema/counts", get(schema::get_schema_counts))
        // Conversations
        .route(
            "/api/conversations",
            get(conversations::list_conversations).post(conversations::upsert_conversation),
        )
        .route(
            "/api/conversations/:id",
            get(conversations::get_conversation).delete(conversations::delete_conversation),
        )
        .route("/api/conversations/:id/rename", post(conversations::rename_conversation))
        .route("/api/conversations/:id/archive", post(conversations::archive_conversation))
        .route("/api/conversations/:id/unarchive", post(conversations::unarchive_conversation))
        .route("/api/conversations/:id/pin", post(conversations::pin_conversation))
        .route("/api/conversations/:id/unpin", post(conversations::unpin_conversation))
        // Step streaming
        .route("/ws/steps/:request_id", get(steps_websocket))
        .route("/api/steps/:request_id", get(steps_sse))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
}
