//! End-to-end pipeline behaviour against scripted collaborators

use async_trait::async_trait;
use cortex_chat::{ChatPipeline, ChatRequest};
use cortex_core::{
    step_topic, ContextNode, ConversationTurn, PlanResult, Row, StepStatus, StepUpdateEvent,
};
use cortex_events::{EventBus, EventStream, StepBus};
use cortex_graph::{GraphDriver, GraphError, GraphSession, SharedSession};
use cortex_introspection::SchemaCache;
use cortex_llm::{
    LanguageModel, LlmError, LlmResponse, Planner, QueryGenerator, ResponseSynthesizer,
};
use cortex_tools::{register_builtin_tools, ToolRegistry, CONTEXT_TOOL, QUERY_TOOL};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

const GENERATED: &str = "MATCH (p:Person) RETURN p.name AS name";

// ============================================================================
// Scripted collaborators
// ============================================================================

#[derive(Default)]
struct Store {
    rows: Vec<Row>,
    error: Option<GraphError>,
    unavailable: bool,
    acquired: AtomicUsize,
    released: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
}

struct Session {
    rows: Vec<Row>,
    error: Option<GraphError>,
    released: Arc<AtomicUsize>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphSession for Session {
    async fn run(&self, query: &str) -> Result<Vec<Row>, GraphError> {
        self.queries.lock().unwrap().push(query.to_string());
        if query != GENERATED {
            return Ok(Vec::new());
        }
        match &self.error {
            Some(e) => Err(e.clone()),
            None => Ok(self.rows.clone()),
        }
    }
}

struct Driver(Arc<Store>);

#[async_trait]
impl GraphDriver for Driver {
    async fn session(&self) -> Result<SharedSession, GraphError> {
        let store = &self.0;
        if store.unavailable {
            return Err(GraphError::unavailable("Connection refused"));
        }
        store.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Session {
            rows: store.rows.clone(),
            error: store.error.clone(),
            released: store.released.clone(),
            queries: store.queries.clone(),
        }))
    }

    async fn verify_connectivity(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

struct ScriptedPlanner(Result<PlanResult, LlmError>);

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(
        &self,
        _message: &str,
        _tool_catalogue: &str,
        _schema: Option<&str>,
        _history: &[ConversationTurn],
    ) -> Result<PlanResult, LlmError> {
        self.0.clone()
    }
}

struct ScriptedGenerator(&'static str);

#[async_trait]
impl QueryGenerator for ScriptedGenerator {
    async fn generate_query(
        &self,
        _message: &str,
        _schema: Option<&str>,
    ) -> Result<String, LlmError> {
        Ok(self.0.to_string())
    }
}

struct ScriptedSynthesizer(Result<String, LlmError>);

#[async_trait]
impl ResponseSynthesizer for ScriptedSynthesizer {
    async fn synthesize(
        &self,
        _message: &str,
        _rows: &[Row],
        _query: Option<&str>,
    ) -> Result<String, LlmError> {
        self.0.clone()
    }
}

struct EchoModel;

#[async_trait]
impl LanguageModel for EchoModel {
    async fn generate(&self, _prompt: &str) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse::text("Ada works at Acme."))
    }

    fn endpoint(&self) -> &str {
        "http://localhost:11434"
    }
}

fn plan(tools: &[&str]) -> PlanResult {
    PlanResult {
        tools: tools.iter().map(|t| t.to_string()).collect(),
        reasoning: "scripted".to_string(),
        parameters: Default::default(),
    }
}

fn row(name: &str) -> Row {
    json!({ "name": name }).as_object().cloned().unwrap()
}

fn pipeline(
    store: Arc<Store>,
    bus: StepBus,
    tools: &[&str],
    synthesized: Result<String, LlmError>,
) -> ChatPipeline {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry).unwrap();

    let driver: Arc<dyn GraphDriver> = Arc::new(Driver(store));
    ChatPipeline::new(
        Arc::new(registry),
        bus,
        driver.clone(),
        Arc::new(SchemaCache::new(driver)),
        Arc::new(EchoModel),
    )
    .with_planner(Arc::new(ScriptedPlanner(Ok(plan(tools)))))
    .with_query_generator(Arc::new(ScriptedGenerator(GENERATED)))
    .with_synthesizer(Arc::new(ScriptedSynthesizer(synthesized)))
}

fn drain(stream: &mut EventStream<StepUpdateEvent>) -> Vec<(String, StepStatus)> {
    let mut seen = Vec::new();
    while let Some(event) = stream.try_next_event() {
        seen.push((event.step.id, event.step.status));
    }
    seen
}

fn ids(response: &cortex_chat::ChatResponse) -> Vec<&str> {
    response.steps.iter().map(|s| s.id.as_str()).collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_query_path_completes_every_step() {
    let store = Arc::new(Store {
        rows: vec![row("Ada"), row("Alan"), row("Grace")],
        ..Default::default()
    });
    let bus = EventBus::new();
    let pipeline = pipeline(
        store.clone(),
        bus.clone(),
        &[QUERY_TOOL],
        Ok("Three people.".to_string()),
    );

    let response = pipeline.handle("Who are the people?", None).await;

    assert_eq!(
        ids(&response),
        vec!["planning", "generate_query", "tool:execute_cypher_query", "response"]
    );
    assert!(response.steps.iter().all(|s| s.status == StepStatus::Completed));
    assert!(response.steps.iter().all(|s| s.duration.unwrap() >= 0.0));
    assert_eq!(response.response, "Three people.");
    assert_eq!(response.query.as_deref(), Some(GENERATED));
    assert_eq!(response.results.as_ref().unwrap().len(), 3);
    assert_eq!(response.request_id.len(), 36);

    let plan_outputs = response.steps[0].outputs.as_ref().unwrap();
    assert_eq!(plan_outputs.plan.as_ref().unwrap().tools, vec![QUERY_TOOL]);
    assert_eq!(
        response.steps[1].outputs.as_ref().unwrap().query.as_deref(),
        Some(GENERATED)
    );
}

#[tokio::test]
async fn test_steps_are_published_in_order() {
    let bus = EventBus::new();
    let mut stream = bus.iterate(&step_topic("req-order"));
    let store = Arc::new(Store {
        rows: vec![row("Ada")],
        ..Default::default()
    });
    let pipeline = pipeline(store, bus, &[QUERY_TOOL], Ok("One.".to_string()));

    let response = pipeline.handle("Who?", Some("req-order".to_string())).await;
    assert_eq!(response.request_id, "req-order");

    let expected: Vec<(String, StepStatus)> = [
        "planning",
        "generate_query",
        "tool:execute_cypher_query",
        "response",
    ]
    .iter()
    .flat_map(|id| {
        [
            (id.to_string(), StepStatus::Running),
            (id.to_string(), StepStatus::Completed),
        ]
    })
    .collect();
    assert_eq!(drain(&mut stream), expected);
}

#[tokio::test]
async fn test_syntax_error_uses_rephrasing_template() {
    let bus = EventBus::new();
    let mut stream = bus.iterate(&step_topic("req-syntax"));
    let store = Arc::new(Store {
        error: Some(GraphError::client(
            "Neo.ClientError.Statement.SyntaxError",
            "Invalid input 'MATC'",
        )),
        ..Default::default()
    });
    let pipeline = pipeline(store.clone(), bus, &[QUERY_TOOL], Ok("unused".to_string()));

    let response = pipeline.handle("Broken?", Some("req-syntax".to_string())).await;

    assert!(response.response.starts_with("I generated an invalid Cypher query."));
    let last = response.steps.last().unwrap();
    assert_eq!(last.id, "tool:execute_cypher_query");
    assert_eq!(last.status, StepStatus::Error);
    assert_eq!(last.error.as_deref(), Some("Invalid input 'MATC'"));
    assert!(response.query.is_none());

    let published = drain(&mut stream);
    assert_eq!(
        published.last().unwrap(),
        &("tool:execute_cypher_query".to_string(), StepStatus::Error)
    );
    assert!(!published.iter().any(|(id, _)| id == "response"));
}

#[tokio::test]
async fn test_unregistered_tools_fall_back_to_query() {
    let store = Arc::new(Store {
        rows: vec![row("Ada")],
        ..Default::default()
    });
    let pipeline = pipeline(
        store,
        EventBus::new(),
        &["search_the_web", "summon_dragons"],
        Ok("Ada.".to_string()),
    );

    let response = pipeline.handle("Who?", None).await;

    assert_eq!(
        ids(&response),
        vec!["planning", "generate_query", "tool:execute_cypher_query", "response"]
    );
    assert!(response.steps.iter().all(|s| s.status == StepStatus::Completed));
    assert_eq!(response.response, "Ada.");
}

#[tokio::test]
async fn test_zero_rows_reports_no_results() {
    let store = Arc::new(Store::default());
    let pipeline = pipeline(
        store,
        EventBus::new(),
        &[QUERY_TOOL],
        Err(LlmError::connection("http://localhost:11434", "timed out")),
    );

    let response = pipeline.handle("Anyone named Zed?", None).await;

    assert_eq!(response.response, "No results found for your query.");
    assert_eq!(response.steps.last().unwrap().status, StepStatus::Completed);
}

#[tokio::test]
async fn test_unavailable_store_returns_no_steps() {
    let bus = EventBus::new();
    let mut stream = bus.iterate(&step_topic("req-down"));
    let store = Arc::new(Store {
        unavailable: true,
        ..Default::default()
    });
    let pipeline = pipeline(store, bus, &[QUERY_TOOL], Ok("unused".to_string()));

    let response = pipeline.handle("Hello?", Some("req-down".to_string())).await;

    assert!(response.steps.is_empty());
    assert_eq!(
        response.response,
        "Error: Neo4j database is not connected. Please ensure Neo4j is running and the connection settings in .env are correct."
    );
    assert!(drain(&mut stream).is_empty());
}

#[tokio::test]
async fn test_planner_failure_marks_planning_error() {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry).unwrap();
    let store = Arc::new(Store::default());
    let driver: Arc<dyn GraphDriver> = Arc::new(Driver(store.clone()));

    let pipeline = ChatPipeline::new(
        Arc::new(registry),
        EventBus::new(),
        driver.clone(),
        Arc::new(SchemaCache::new(driver)),
        Arc::new(EchoModel),
    )
    .with_planner(Arc::new(ScriptedPlanner(Err(LlmError::connection(
        "http://localhost:11434",
        "error sending request",
    )))));

    let response = pipeline.handle("Plan this", None).await;

    assert_eq!(ids(&response), vec!["planning"]);
    assert_eq!(response.steps[0].status, StepStatus::Error);
    assert!(response.steps[0].error.as_deref().unwrap().contains("Failed to connect to Ollama"));
    assert_eq!(
        response.response,
        "Unable to connect to the AI service. Please ensure Ollama is running at http://localhost:11434"
    );
}

#[tokio::test]
async fn test_empty_generated_query_fails_generation_step() {
    let store = Arc::new(Store::default());
    let pipeline = pipeline(store.clone(), EventBus::new(), &[QUERY_TOOL], Ok("unused".to_string()))
        .with_query_generator(Arc::new(ScriptedGenerator("   ")));

    let response = pipeline.handle("Who?", None).await;

    let last = response.steps.last().unwrap();
    assert_eq!(last.id, "generate_query");
    assert_eq!(last.status, StepStatus::Error);
    assert_eq!(last.error.as_deref(), Some("Generated query is empty"));
    assert!(response.response.contains("Generated query is empty"));
    assert!(!store.queries.lock().unwrap().iter().any(|q| q == GENERATED));
}

#[tokio::test]
async fn test_context_branch_skips_the_store() {
    let store = Arc::new(Store::default());
    let pipeline = pipeline(
        store.clone(),
        EventBus::new(),
        &[CONTEXT_TOOL, QUERY_TOOL],
        Ok("unused".to_string()),
    );

    let request = ChatRequest {
        message: "Where does Ada work?".to_string(),
        conversation_id: Some("conv_1".to_string()),
        context_nodes: vec![ContextNode {
            id: "7".to_string(),
            labels: Some(vec!["Person".to_string()]),
            properties: json!({"name": "Ada", "employer": "Acme"}).as_object().cloned(),
        }],
        ..Default::default()
    };
    let response = pipeline.handle_request(request).await;

    assert_eq!(ids(&response), vec!["planning", "tool:answer_from_context", "response"]);
    assert_eq!(response.response, "Ada works at Acme.");
    assert_eq!(response.conversation_id.as_deref(), Some("conv_1"));
    assert!(response.query.is_none());
    assert!(!store.queries.lock().unwrap().iter().any(|q| q == GENERATED));
}

#[tokio::test]
async fn test_sessions_released_on_every_path() {
    let ok = Arc::new(Store {
        rows: vec![row("Ada")],
        ..Default::default()
    });
    pipeline(ok.clone(), EventBus::new(), &[QUERY_TOOL], Ok("Ada.".to_string()))
        .handle("Who?", None)
        .await;

    let failing = Arc::new(Store {
        error: Some(GraphError::client("Neo.ClientError.Statement.SyntaxError", "bad")),
        ..Default::default()
    });
    pipeline(failing.clone(), EventBus::new(), &[QUERY_TOOL], Ok("unused".to_string()))
        .handle("Who?", None)
        .await;

    for store in [ok, failing] {
        let acquired = store.acquired.load(Ordering::SeqCst);
        assert!(acquired >= 1);
        assert_eq!(store.released.load(Ordering::SeqCst), acquired);
    }
}

#[tokio::test]
async fn test_concurrent_requests_keep_separate_traces() {
    let store = Arc::new(Store {
        rows: vec![row("Ada")],
        ..Default::default()
    });
    let bus = EventBus::new();
    let mut first = bus.iterate(&step_topic("a"));
    let mut second = bus.iterate(&step_topic("b"));
    let pipeline = Arc::new(pipeline(store, bus, &[QUERY_TOOL], Ok("Ada.".to_string())));

    let (ra, rb) = tokio::join!(
        pipeline.handle("one", Some("a".to_string())),
        pipeline.handle("two", Some("b".to_string()))
    );

    assert_eq!(ra.steps.len(), 4);
    assert_eq!(rb.steps.len(), 4);
    assert_eq!(drain(&mut first).len(), 8);
    assert_eq!(drain(&mut second).len(), 8);
}

/// Pool with a fixed number of slots that fails instead of waiting
struct PooledDriver {
    slots: Arc<Semaphore>,
}

struct PooledSession {
    _slot: OwnedSemaphorePermit,
}

#[async_trait]
impl GraphSession for PooledSession {
    async fn run(&self, query: &str) -> Result<Vec<Row>, GraphError> {
        if query.contains("db.labels") {
            Ok(vec![json!({"label": "Person"}).as_object().cloned().unwrap()])
        } else if query == GENERATED {
            Ok(vec![row("Ada")])
        } else {
            Ok(Vec::new())
        }
    }
}

#[async_trait]
impl GraphDriver for PooledDriver {
    async fn session(&self) -> Result<SharedSession, GraphError> {
        let slot = Arc::clone(&self.slots)
            .try_acquire_owned()
            .map_err(|_| GraphError::unavailable("Timed out waiting for a Neo4j session"))?;
        Ok(Arc::new(PooledSession { _slot: slot }))
    }

    async fn verify_connectivity(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

/// Records the schema text each planning call receives
#[derive(Default)]
struct SchemaRecordingPlanner {
    schemas: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl Planner for SchemaRecordingPlanner {
    async fn plan(
        &self,
        _message: &str,
        _tool_catalogue: &str,
        schema: Option<&str>,
        _history: &[ConversationTurn],
    ) -> Result<PlanResult, LlmError> {
        self.schemas.lock().unwrap().push(schema.map(str::to_string));
        Ok(plan(&[QUERY_TOOL]))
    }
}

#[tokio::test]
async fn test_single_slot_pool_still_plans_with_schema() {
    let slots = Arc::new(Semaphore::new(1));
    let driver: Arc<dyn GraphDriver> = Arc::new(PooledDriver { slots: slots.clone() });
    let planner = Arc::new(SchemaRecordingPlanner::default());

    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry).unwrap();
    let pipeline = ChatPipeline::new(
        Arc::new(registry),
        EventBus::new(),
        driver.clone(),
        Arc::new(SchemaCache::new(driver)),
        Arc::new(EchoModel),
    )
    .with_planner(planner.clone())
    .with_query_generator(Arc::new(ScriptedGenerator(GENERATED)))
    .with_synthesizer(Arc::new(ScriptedSynthesizer(Ok("Ada.".to_string()))));

    let response = pipeline.handle("Who is here?", None).await;

    assert_eq!(response.response, "Ada.");
    assert!(response.steps.iter().all(|s| s.status == StepStatus::Completed));
    let schemas = planner.schemas.lock().unwrap();
    let schema = schemas[0].as_deref().unwrap();
    assert!(schema.contains("Person"));
    assert_eq!(slots.available_permits(), 1);
}
