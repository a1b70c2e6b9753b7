//! Neo4j driver over the HTTP transactional API
//!
//! ## Endpoints
//!
//! | Endpoint | URL | Purpose |
//! |----------|-----|---------|
//! | Commit | `{uri}/db/{database}/tx/commit` | Run statements in an auto-commit transaction |
//!
//! ## Authentication
//! - HTTP basic auth with `NEO4J_USER` / `NEO4J_PASSWORD`
//!
//! Sessions are slots in a counting semaphore sized by `max_sessions`. A
//! session holds its permit until dropped.

use async_trait::async_trait;
use cortex_core::config::Neo4jConfig;
use cortex_core::Row;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::driver::{GraphDriver, GraphSession, SharedSession};
use crate::error::GraphError;

// =============================================================================
// WIRE FORMAT
// =============================================================================

#[derive(Debug, Serialize)]
struct TxRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Statement<'a> {
    statement: &'a str,
    result_data_contents: [&'static str; 2],
}

#[derive(Debug, Default, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    #[serde(default)]
    row: Vec<Value>,
    #[serde(default)]
    meta: Vec<Value>,
    #[serde(default)]
    graph: GraphData,
}

#[derive(Debug, Default, Deserialize)]
struct GraphData {
    #[serde(default)]
    nodes: Vec<GraphNode>,
    #[serde(default)]
    relationships: Vec<GraphRelationship>,
}

#[derive(Debug, Deserialize)]
struct GraphNode {
    id: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRelationship {
    id: String,
    #[serde(rename = "type")]
    rel_type: String,
    start_node: String,
    end_node: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

// =============================================================================
// DRIVER
// =============================================================================

struct DriverInner {
    client: Client,
    uri: String,
    commit_url: String,
    user: String,
    password: String,
    connected: AtomicBool,
}

/// Neo4j driver with a bounded session pool
pub struct Neo4jDriver {
    inner: Arc<DriverInner>,
    permits: Arc<Semaphore>,
    acquire_timeout: Duration,
}

impl Neo4jDriver {
    pub fn new(config: &Neo4jConfig) -> Result<Self, GraphError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GraphError::transport(format!("Failed to build HTTP client: {}", e)))?;

        let uri = config.uri.trim_end_matches('/').to_string();
        let commit_url = format!("{}/db/{}/tx/commit", uri, config.database);

        Ok(Self {
            inner: Arc::new(DriverInner {
                client,
                uri,
                commit_url,
                user: config.user.clone(),
                password: config.password.clone(),
                connected: AtomicBool::new(false),
            }),
            permits: Arc::new(Semaphore::new(config.max_sessions.max(1))),
            acquire_timeout: Duration::from_secs(config.acquire_timeout_secs),
        })
    }

    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    /// Sessions that could be opened right now without waiting
    pub fn available_sessions(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl GraphDriver for Neo4jDriver {
    async fn session(&self) -> Result<SharedSession, GraphError> {
        // Re-probe until the store has answered once
        if !self.inner.connected.load(Ordering::Acquire) {
            self.verify_connectivity().await.map_err(|e| match e {
                GraphError::Unavailable(_) => e,
                other => GraphError::unavailable(format!(
                    "Neo4j at {} rejected the connectivity check: {}",
                    self.inner.uri, other
                )),
            })?;
        }

        let permit = tokio::time::timeout(
            self.acquire_timeout,
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        .map_err(|_| {
            GraphError::unavailable(format!(
                "Timed out after {:?} waiting for a Neo4j session",
                self.acquire_timeout
            ))
        })?
        .map_err(|_| GraphError::unavailable("Neo4j session pool is closed"))?;

        debug!(available = self.permits.available_permits(), "Acquired Neo4j session");
        Ok(Arc::new(Neo4jSession {
            inner: Arc::clone(&self.inner),
            _permit: permit,
        }))
    }

    async fn verify_connectivity(&self) -> Result<(), GraphError> {
        match self.inner.execute("RETURN 1").await {
            Ok(_) => {
                if !self.inner.connected.swap(true, Ordering::AcqRel) {
                    info!(uri = %self.inner.uri, "Neo4j connection established");
                }
                Ok(())
            }
            Err(e) => {
                self.inner.connected.store(false, Ordering::Release);
                Err(e)
            }
        }
    }
}

impl DriverInner {
    async fn execute(&self, query: &str) -> Result<Vec<Row>, GraphError> {
        let body = TxRequest {
            statements: vec![Statement {
                statement: query,
                result_data_contents: ["row", "graph"],
            }],
        };

        let response = self
            .client
            .post(&self.commit_url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GraphError::unavailable(format!("Failed to reach Neo4j at {}: {}", self.uri, e))
                } else {
                    GraphError::transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GraphError::transport(e.to_string()))?;

        match serde_json::from_str::<TxResponse>(&text) {
            Ok(parsed) => rows_from_response(parsed),
            Err(_) if !status.is_success() => Err(GraphError::transport(format!(
                "Neo4j returned HTTP {}",
                status
            ))),
            Err(e) => Err(GraphError::Protocol(e.to_string())),
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// One pool slot; released on drop
pub struct Neo4jSession {
    inner: Arc<DriverInner>,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn run(&self, query: &str) -> Result<Vec<Row>, GraphError> {
        debug!(query = %query, "Running statement");
        let rows = self.inner.execute(query).await;
        if let Err(e) = &rows {
            warn!(error = %e, "Statement failed");
        }
        rows
    }
}

// =============================================================================
// RESULT DECODING
// =============================================================================

fn rows_from_response(response: TxResponse) -> Result<Vec<Row>, GraphError> {
    if let Some(err) = response.errors.into_iter().next() {
        return Err(GraphError::client(err.code, err.message));
    }

    let Some(result) = response.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    let columns = result.columns;
    Ok(result
        .data
        .into_iter()
        .map(|data| {
            let nodes: HashMap<&str, &GraphNode> =
                data.graph.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
            let rels: HashMap<&str, &GraphRelationship> = data
                .graph
                .relationships
                .iter()
                .map(|r| (r.id.as_str(), r))
                .collect();

            columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let value = data.row.get(i).cloned().unwrap_or(Value::Null);
                    let meta = data.meta.get(i).unwrap_or(&Value::Null);
                    (column.clone(), hydrate(value, meta, &nodes, &rels))
                })
                .collect()
        })
        .collect())
}

/// Replace bare property maps with full node / relationship objects
/// (`identity`, `labels` or `type`, `properties`) using the row metadata.
fn hydrate(
    value: Value,
    meta: &Value,
    nodes: &HashMap<&str, &GraphNode>,
    rels: &HashMap<&str, &GraphRelationship>,
) -> Value {
    match meta {
        Value::Object(m) => {
            let Some(id) = m.get("id").map(id_string) else {
                return value;
            };
            match m.get("type").and_then(Value::as_str) {
                Some("node") => match nodes.get(id.as_str()) {
                    Some(node) => json!({
                        "identity": id,
                        "labels": node.labels,
                        "properties": node.properties,
                    }),
                    None => value,
                },
                Some("relationship") => match rels.get(id.as_str()) {
                    Some(rel) => json!({
                        "identity": id,
                        "type": rel.rel_type,
                        "start": rel.start_node,
                        "end": rel.end_node,
                        "properties": rel.properties,
                    }),
                    None => value,
                },
                _ => value,
            }
        }
        Value::Array(metas) => match value {
            Value::Array(items) if items.len() == metas.len() => Value::Array(
                items
                    .into_iter()
                    .zip(metas)
                    .map(|(item, meta)| hydrate(item, meta, nodes, rels))
                    .collect(),
            ),
            other => other,
        },
        _ => value,
    }
}

fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: Value) -> Result<Vec<Row>, GraphError> {
        rows_from_response(serde_json::from_value(body).unwrap())
    }

    fn test_config(max_sessions: usize) -> Neo4jConfig {
        Neo4jConfig {
            uri: "http://127.0.0.1:1/".to_string(),
            user: "neo4j".to_string(),
            password: "secret".to_string(),
            database: "neo4j".to_string(),
            max_sessions,
            acquire_timeout_secs: 0,
        }
    }

    #[test]
    fn test_scalar_rows_map_columns() {
        let rows = parse(json!({
            "results": [{
                "columns": ["name", "age"],
                "data": [
                    {"row": ["Ada", 36], "meta": [null, null]},
                    {"row": ["Alan", 41], "meta": [null, null]}
                ]
            }],
            "errors": []
        }))
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Ada");
        assert_eq!(rows[1]["age"], 41);
    }

    #[test]
    fn test_nodes_are_hydrated_with_labels() {
        let rows = parse(json!({
            "results": [{
                "columns": ["p"],
                "data": [{
                    "row": [{"name": "Ada"}],
                    "meta": [{"id": 7, "elementId": "4:x:7", "type": "node", "deleted": false}],
                    "graph": {
                        "nodes": [{"id": "7", "labels": ["Person"], "properties": {"name": "Ada"}}],
                        "relationships": []
                    }
                }]
            }],
            "errors": []
        }))
        .unwrap();

        let node = &rows[0]["p"];
        assert_eq!(node["labels"], json!(["Person"]));
        assert_eq!(node["properties"]["name"], "Ada");
        assert_eq!(node["identity"], "7");
    }

    #[test]
    fn test_relationship_lists_are_hydrated() {
        let rows = parse(json!({
            "results": [{
                "columns": ["rels"],
                "data": [{
                    "row": [[{"since": 2020}]],
                    "meta": [[{"id": 3, "type": "relationship", "deleted": false}]],
                    "graph": {
                        "nodes": [],
                        "relationships": [{
                            "id": "3", "type": "KNOWS",
                            "startNode": "1", "endNode": "2",
                            "properties": {"since": 2020}
                        }]
                    }
                }]
            }]
        }))
        .unwrap();

        assert_eq!(rows[0]["rels"][0]["type"], "KNOWS");
        assert_eq!(rows[0]["rels"][0]["start"], "1");
    }

    #[test]
    fn test_errors_become_client_errors() {
        let err = parse(json!({
            "results": [],
            "errors": [{
                "code": "Neo.ClientError.Statement.SyntaxError",
                "message": "Invalid input 'MATC'"
            }]
        }))
        .unwrap_err();

        assert!(err.is_syntax_error());
        assert_eq!(err.to_string(), "Invalid input 'MATC'");
    }

    #[test]
    fn test_no_results_is_empty() {
        assert!(parse(json!({"results": [], "errors": []})).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_session_pool_is_bounded_and_released_on_drop() {
        let driver = Neo4jDriver::new(&test_config(1)).unwrap();
        driver.inner.connected.store(true, Ordering::Release);

        let first = driver.session().await.unwrap();
        assert_eq!(driver.available_sessions(), 0);

        let second = driver.session().await;
        assert!(matches!(second, Err(GraphError::Unavailable(_))));

        drop(first);
        assert_eq!(driver.available_sessions(), 1);
        assert!(driver.session().await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        let driver = Neo4jDriver::new(&test_config(4)).unwrap();
        assert_eq!(driver.uri(), "http://127.0.0.1:1");

        let result = driver.session().await;
        assert!(matches!(result, Err(GraphError::Unavailable(_))));
        assert_eq!(driver.available_sessions(), 4);
    }
}
