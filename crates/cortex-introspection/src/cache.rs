//! Schema caching
//!
//! The schema is introspected at most once per process unless a refresh is
//! forced. Failed introspection yields an empty schema and leaves the cache
//! untouched so the next call tries again.

use cortex_graph::{GraphDriver, GraphError, GraphSession};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::schema::GraphSchema;

const LABELS_QUERY: &str = "CALL db.labels() YIELD label RETURN label ORDER BY label";

const REL_TYPES_QUERY: &str =
    "CALL db.relationshipTypes() YIELD relationshipType RETURN relationshipType ORDER BY relationshipType";

const NODE_PROPERTIES_QUERY: &str = "CALL db.schema.nodeTypeProperties() \
     YIELD nodeType, propertyName, propertyTypes \
     RETURN nodeType, propertyName, propertyTypes ORDER BY nodeType, propertyName";

const REL_PROPERTIES_QUERY: &str = "CALL db.schema.relTypeProperties() \
     YIELD relType, propertyName, propertyTypes \
     RETURN relType, propertyName, propertyTypes ORDER BY relType, propertyName";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountEntry {
    pub name: String,
    pub count: u64,
}

/// Live element counts per label and relationship type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaCounts {
    pub node_labels: Vec<CountEntry>,
    pub relationship_types: Vec<CountEntry>,
}

struct Cached {
    schema: GraphSchema,
    loaded_at: Instant,
}

/// Process-lifetime memo of the graph schema
pub struct SchemaCache {
    driver: Arc<dyn GraphDriver>,
    cache: RwLock<Option<Cached>>,
    /// Serializes introspection so concurrent misses query the store once
    refresh: Mutex<()>,
}

impl SchemaCache {
    pub fn new(driver: Arc<dyn GraphDriver>) -> Self {
        Self {
            driver,
            cache: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// Cached schema, introspecting first when empty or when `force_refresh`
    pub async fn introspect(&self, force_refresh: bool) -> GraphSchema {
        self.introspect_on(None, force_refresh).await
    }

    /// Same as [`introspect`](Self::introspect), but a miss runs the
    /// catalog queries on the caller's session instead of taking another
    /// one from the driver.
    pub async fn introspect_with(
        &self,
        session: &dyn GraphSession,
        force_refresh: bool,
    ) -> GraphSchema {
        self.introspect_on(Some(session), force_refresh).await
    }

    async fn introspect_on(
        &self,
        session: Option<&dyn GraphSession>,
        force_refresh: bool,
    ) -> GraphSchema {
        if !force_refresh {
            if let Some(schema) = self.cached().await {
                return schema;
            }
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have filled the cache while we waited
        if !force_refresh {
            if let Some(schema) = self.cached().await {
                return schema;
            }
        }

        let loaded = match session {
            Some(session) => load(session).await,
            None => match self.driver.session().await {
                Ok(owned) => load(owned.as_ref()).await,
                Err(e) => Err(e),
            },
        };

        match loaded {
            Ok(schema) => {
                info!(
                    node_labels = schema.node_labels.len(),
                    relationship_types = schema.relationship_types.len(),
                    "Schema introspection completed"
                );
                let mut cache = self.cache.write().await;
                *cache = Some(Cached {
                    schema: schema.clone(),
                    loaded_at: Instant::now(),
                });
                schema
            }
            Err(e) => {
                error!(error = %e, "Failed to introspect schema");
                GraphSchema::default()
            }
        }
    }

    /// Drop the cached schema
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    pub async fn is_cached(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// Per-label and per-type counts, always read live from the store
    pub async fn counts(&self) -> Result<SchemaCounts, GraphError> {
        let session = self.driver.session().await?;
        let schema = self.introspect_with(session.as_ref(), false).await;

        let mut counts = SchemaCounts::default();
        for label in &schema.node_labels {
            let query = format!("MATCH (n:{}) RETURN count(n) AS count", quote_identifier(label));
            counts.node_labels.push(CountEntry {
                name: label.clone(),
                count: single_count(session.as_ref(), &query).await?,
            });
        }
        for rel_type in &schema.relationship_types {
            let query = format!(
                "MATCH ()-[r:{}]->() RETURN count(r) AS count",
                quote_identifier(rel_type)
            );
            counts.relationship_types.push(CountEntry {
                name: rel_type.clone(),
                count: single_count(session.as_ref(), &query).await?,
            });
        }
        Ok(counts)
    }

    async fn cached(&self) -> Option<GraphSchema> {
        let cache = self.cache.read().await;
        cache.as_ref().map(|c| {
            debug!(age_ms = c.loaded_at.elapsed().as_millis() as u64, "Using cached schema");
            c.schema.clone()
        })
    }
}

async fn load(session: &dyn GraphSession) -> Result<GraphSchema, GraphError> {
    info!("Introspecting graph schema");

    let mut schema = GraphSchema {
        node_labels: string_column(session.run(LABELS_QUERY).await?, "label"),
        relationship_types: string_column(session.run(REL_TYPES_QUERY).await?, "relationshipType"),
        ..Default::default()
    };

    for row in session.run(NODE_PROPERTIES_QUERY).await? {
        if let (Some(node_type), Some(property)) =
            (str_field(&row, "nodeType"), str_field(&row, "propertyName"))
        {
            schema.add_node_property(node_type, property, string_list(row.get("propertyTypes")));
        }
    }

    for row in session.run(REL_PROPERTIES_QUERY).await? {
        if let (Some(rel_type), Some(property)) =
            (str_field(&row, "relType"), str_field(&row, "propertyName"))
        {
            schema.add_relationship_property(
                rel_type,
                property,
                string_list(row.get("propertyTypes")),
            );
        }
    }

    Ok(schema)
}

fn str_field<'a>(row: &'a cortex_core::Row, key: &str) -> Option<&'a str> {
    row.get(key).and_then(Value::as_str)
}

fn string_column(rows: Vec<cortex_core::Row>, column: &str) -> Vec<String> {
    rows.iter()
        .filter_map(|row| str_field(row, column).map(str::to_string))
        .collect()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

async fn single_count(session: &dyn GraphSession, query: &str) -> Result<u64, GraphError> {
    let rows = session.run(query).await?;
    Ok(rows
        .first()
        .and_then(|row| row.get("count"))
        .and_then(Value::as_u64)
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cortex_core::Row;
    use cortex_graph::SharedSession;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeStore {
        runs: AtomicUsize,
        sessions: AtomicUsize,
        failing: AtomicBool,
    }

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    #[async_trait]
    impl GraphSession for FakeStore {
        async fn run(&self, query: &str) -> Result<Vec<Row>, GraphError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(GraphError::transport("store offline"));
            }
            let rows = if query.contains("db.labels") {
                vec![row(json!({"label": "Person"})), row(json!({"label": "Company"}))]
            } else if query.contains("db.relationshipTypes") {
                vec![row(json!({"relationshipType": "WORKS_AT"}))]
            } else if query.contains("nodeTypeProperties") {
                vec![
                    row(json!({"nodeType": ":`Person`", "propertyName": "name", "propertyTypes": ["String"]})),
                    row(json!({"nodeType": ":`Company`", "propertyName": null, "propertyTypes": null})),
                ]
            } else if query.contains("relTypeProperties") {
                vec![row(json!({"relType": ":`WORKS_AT`", "propertyName": "since", "propertyTypes": ["Date"]}))]
            } else if query.contains("(n:`Person`)") {
                vec![row(json!({"count": 3}))]
            } else if query.contains("(n:`Company`)") {
                vec![row(json!({"count": 1}))]
            } else if query.contains("[r:`WORKS_AT`]") {
                vec![row(json!({"count": 2}))]
            } else {
                Vec::new()
            };
            Ok(rows)
        }
    }

    struct FakeDriver(Arc<FakeStore>);

    #[async_trait]
    impl GraphDriver for FakeDriver {
        async fn session(&self) -> Result<SharedSession, GraphError> {
            self.0.sessions.fetch_add(1, Ordering::SeqCst);
            Ok(self.0.clone())
        }

        async fn verify_connectivity(&self) -> Result<(), GraphError> {
            Ok(())
        }
    }

    fn cache_with_store() -> (SchemaCache, Arc<FakeStore>) {
        let store = Arc::new(FakeStore::default());
        (SchemaCache::new(Arc::new(FakeDriver(store.clone()))), store)
    }

    #[tokio::test]
    async fn test_introspect_twice_hits_store_once() {
        let (cache, store) = cache_with_store();

        let first = cache.introspect(false).await;
        let runs_after_first = store.runs.load(Ordering::SeqCst);
        let second = cache.introspect(false).await;

        assert_eq!(first, second);
        assert_eq!(store.runs.load(Ordering::SeqCst), runs_after_first);
        assert_eq!(first.node_labels, vec!["Person", "Company"]);
        assert_eq!(first.node_properties["Person"][0].types, vec!["String"]);
        assert!(!first.node_properties.contains_key("Company"));
    }

    #[tokio::test]
    async fn test_concurrent_misses_introspect_once() {
        let (cache, store) = cache_with_store();
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.introspect(false).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.runs.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_force_refresh_and_clear() {
        let (cache, store) = cache_with_store();
        cache.introspect(false).await;
        cache.introspect(true).await;
        assert_eq!(store.runs.load(Ordering::SeqCst), 8);

        cache.clear().await;
        assert!(!cache.is_cached().await);
        cache.introspect(false).await;
        assert_eq!(store.runs.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn test_failure_returns_empty_and_is_not_cached() {
        let (cache, store) = cache_with_store();
        store.failing.store(true, Ordering::SeqCst);

        let schema = cache.introspect(false).await;
        assert!(schema.is_empty());
        assert!(!cache.is_cached().await);

        store.failing.store(false, Ordering::SeqCst);
        let schema = cache.introspect(false).await;
        assert_eq!(schema.relationship_types, vec!["WORKS_AT"]);
        assert!(cache.is_cached().await);
    }

    #[tokio::test]
    async fn test_introspect_with_reuses_callers_session() {
        let (cache, store) = cache_with_store();

        let schema = cache.introspect_with(store.as_ref(), false).await;
        assert_eq!(schema.node_labels, vec!["Person", "Company"]);
        assert_eq!(store.sessions.load(Ordering::SeqCst), 0);
        assert!(cache.is_cached().await);
    }

    #[tokio::test]
    async fn test_counts_take_a_single_session() {
        let (cache, store) = cache_with_store();
        cache.counts().await.unwrap();
        assert_eq!(store.sessions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_counts_are_never_cached() {
        let (cache, store) = cache_with_store();

        let counts = cache.counts().await.unwrap();
        assert_eq!(counts.node_labels[0], CountEntry { name: "Person".to_string(), count: 3 });
        assert_eq!(counts.relationship_types[0].count, 2);

        let before = store.runs.load(Ordering::SeqCst);
        cache.counts().await.unwrap();
        assert_eq!(store.runs.load(Ordering::SeqCst), before + 3);
    }

    #[test]
    fn test_quote_identifier_escapes_backticks() {
        assert_eq!(quote_identifier("We`ird"), "`We``ird`");
    }
}
