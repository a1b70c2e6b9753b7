//! Conversation CRUD handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use cortex_storage::{Conversation, ConversationSummary};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpsertRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub title: String,
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    Ok(Json(state.conversations.list(params.include_archived).await?))
}

/// GET /api/conversations/:id
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    state
        .conversations
        .load(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Conversation {} not found", id)))
}

/// POST /api/conversations
pub async fn upsert_conversation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpsertRequest>,
) -> Result<Json<Conversation>, ApiError> {
    let conversation = state
        .conversations
        .create_or_update(req.id.as_deref(), req.title.as_deref())
        .await?;
    Ok(Json(conversation))
}

/// DELETE /api/conversations/:id
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.conversations.delete(&id).await?;
    Ok(Json(json!({ "deleted": true })))
}

/// POST /api/conversations/:id/rename
pub async fn rename_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.conversations.rename(&id, &req.title).await?))
}

/// POST /api/conversations/:id/archive
pub async fn archive_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.conversations.archive(&id).await?))
}

/// POST /api/conversations/:id/unarchive
pub async fn unarchive_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.conversations.unarchive(&id).await?))
}

/// POST /api/conversations/:id/pin
pub async fn pin_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.conversations.pin(&id).await?))
}

/// POST /api/conversations/:id/unpin
pub async fn unpin_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.conversations.unpin(&id).await?))
}
