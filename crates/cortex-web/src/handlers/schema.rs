//! Schema handlers

use axum::{
    extract::{Query, State},
    Json,
};
use cortex_introspection::{PropertySchema, SchemaCounts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SchemaParams {
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    /// Prompt rendering of the schema
    pub formatted: String,
    pub node_labels: Vec<String>,
    pub relationship_types: Vec<String>,
    pub node_properties: BTreeMap<String, Vec<PropertySchema>>,
    pub relationship_properties: BTreeMap<String, Vec<PropertySchema>>,
    /// Every property name across labels and types
    pub all_properties: Vec<PropertySchema>,
}

/// GET /api/schema
pub async fn get_schema(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SchemaParams>,
) -> Json<SchemaResponse> {
    let schema = state.schema.introspect(params.force_refresh).await;
    Json(SchemaResponse {
        formatted: schema.format_for_prompt(),
        all_properties: schema.all_properties(),
        node_labels: schema.node_labels,
        relationship_types: schema.relationship_types,
        node_properties: schema.node_properties,
        relationship_properties: schema.relationship_properties,
    })
}

/// GET /api/schema/counts
pub async fn get_schema_counts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SchemaCounts>, ApiError> {
    Ok(Json(state.schema.counts().await?))
}
