//! Common types used across cortex
//!
//! Everything that crosses a crate boundary lives here: the observable
//! [`Step`] lifecycle, what a tool hands back ([`ToolResult`]), and the
//! per-request context (explicit nodes, prior turns).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// A single result row: column name -> value
pub type Row = Map<String, Value>;

/// Per-tool parameters chosen by the planner, keyed by tool name
pub type ToolParameters = HashMap<String, Map<String, Value>>;

/// Lifecycle status of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Error,
}

impl StepStatus {
    /// `COMPLETED` and `ERROR` are final; nothing is written after them
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Error)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "PENDING"),
            StepStatus::Running => write!(f, "RUNNING"),
            StepStatus::Completed => write!(f, "COMPLETED"),
            StepStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// Query execution summary attached to a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Row>>,
}

/// Planning decision: which tools, why, and with what parameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanResult {
    pub tools: Vec<String>,
    pub reasoning: String,
    #[serde(default)]
    pub parameters: ToolParameters,
}

/// Structured outputs of a step. Tools produce the same shape as artifacts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepOutputs {
    /// Generated graph query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<QueryResults>,
    /// Generated text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl StepOutputs {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn plan(plan: PlanResult) -> Self {
        Self {
            plan: Some(plan),
            ..Default::default()
        }
    }

    pub fn results(rows: Vec<Row>) -> Self {
        Self {
            results: Some(QueryResults {
                count: rows.len(),
                data: Some(rows),
            }),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none()
            && self.results.is_none()
            && self.text.is_none()
            && self.plan.is_none()
            && self.data.is_none()
    }
}

/// One observable unit of progress within a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub name: String,
    pub status: StepStatus,
    /// Seconds; present only once the step is terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<StepOutputs>,
}

impl Step {
    /// A freshly started step
    pub fn running(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: StepStatus::Running,
            duration: None,
            error: None,
            outputs: None,
        }
    }

    /// Terminal success copy of this step
    pub fn completed(&self, duration_secs: f64, outputs: Option<StepOutputs>) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            status: StepStatus::Completed,
            duration: Some(duration_secs.max(0.0)),
            error: None,
            outputs,
        }
    }

    /// Terminal failure copy of this step
    pub fn failed(&self, duration_secs: f64, error: impl Into<String>) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            status: StepStatus::Error,
            duration: Some(duration_secs.max(0.0)),
            error: Some(error.into()),
            outputs: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Payload published on a request's step topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepUpdateEvent {
    pub request_id: String,
    pub step: Step,
}

/// Topic name for a request's step updates
pub fn step_topic(request_id: &str) -> String {
    format!("step:{}", request_id)
}

/// Return contract of every tool
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<StepOutputs>,
}

impl ToolResult {
    pub fn success(data: Value, artifacts: StepOutputs) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            artifacts: Some(artifacts),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            artifacts: None,
        }
    }
}

/// A graph node the user pinned into the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Map<String, Value>>,
}

/// Explicit context supplied with a request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExplicitContext {
    #[serde(default)]
    pub nodes: Vec<ContextNode>,
}

impl ExplicitContext {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Who said a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// A prior turn, optionally with the query it ran and the rows it got back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            results: None,
            query: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            results: None,
            query: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_lifecycle_durations() {
        let running = Step::running("planning", "Planning");
        assert!(running.duration.is_none());
        assert!(!running.is_terminal());

        let done = running.completed(0.25, None);
        assert_eq!(done.status, StepStatus::Completed);
        assert_eq!(done.duration, Some(0.25));

        let failed = running.failed(-1.0, "boom");
        assert_eq!(failed.status, StepStatus::Error);
        assert_eq!(failed.duration, Some(0.0));
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_step_wire_format() {
        let step = Step::running("tool:execute_cypher_query", "Executing query");
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["status"], "RUNNING");
        assert!(value.get("duration").is_none());

        let event = StepUpdateEvent {
            request_id: "r1".to_string(),
            step,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["requestId"], "r1");
    }

    #[test]
    fn test_results_outputs_count_rows() {
        let mut row = Row::new();
        row.insert("n".to_string(), json!({"name": "Ada"}));
        let outputs = StepOutputs::results(vec![row.clone(), row]);
        assert_eq!(outputs.results.as_ref().unwrap().count, 2);
        assert!(!outputs.is_empty());
        assert!(StepOutputs::default().is_empty());
    }

    #[test]
    fn test_history_turn_deserializes_lowercase_role() {
        let turn: ConversationTurn =
            serde_json::from_value(json!({"role": "assistant", "content": "hi"})).unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert!(turn.results.is_none());
    }
}
