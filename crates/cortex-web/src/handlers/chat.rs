//! Chat handler
//!
//! Runs the pipeline and records the exchange in the conversation store.
//! Storage failures are logged and never fail the chat response.

use axum::{extract::State, Json};
use cortex_chat::{ChatRequest, ChatResponse};
use cortex_storage::{generate_conversation_id, ConversationMessage};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/chat
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(mut request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".to_string()));
    }

    let conversation_id = request
        .conversation_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_conversation_id);
    request.conversation_id = Some(conversation_id.clone());
    info!(conversation_id = %conversation_id, chars = request.message.len(), "Chat request");

    // Clients that do not track history get the stored one
    if request.conversation_history.is_empty() {
        match state.conversations.load(&conversation_id).await {
            Ok(Some(conversation)) => request.conversation_history = conversation.history(),
            Ok(None) => {}
            Err(e) => warn!(
                conversation_id = %conversation_id,
                error = %e,
                "Failed to load conversation history"
            ),
        }
    }

    let user_message = ConversationMessage::user(request.message.clone());
    let response = state.pipeline.handle_request(request).await;

    let mut answer = ConversationMessage::assistant(response.response.clone());
    answer.query = response.query.clone();
    answer.results = response.results.clone();
    answer.steps = Some(response.steps.clone());

    if let Err(e) = state
        .conversations
        .append(&conversation_id, vec![user_message, answer])
        .await
    {
        warn!(conversation_id = %conversation_id, error = %e, "Failed to store conversation");
    }

    Ok(Json(response))
}
