//! Tolerant parsing of model output

use cortex_core::{PlanResult, ToolParameters};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

const QUERY_TOOL: &str = "execute_cypher_query";
const CONTEXT_TOOL: &str = "answer_from_context";

/// Pull a Cypher statement out of free-form model output.
///
/// Code fences are stripped, then lines are collected from the first line
/// opening with a clause keyword until a line that no longer looks like
/// Cypher. Without any clause keyword the cleaned text is returned as is.
pub fn extract_cypher_query(response: &str) -> String {
    let mut cleaned = response.to_string();
    if let Ok(re) = Regex::new(r"(?i)```(?:cypher-query|cypher)?\s*\n?") {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    if let Ok(re) = Regex::new(r"```\s*$") {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }

    let start = Regex::new(r"(?i)^\s*(MATCH|CREATE|MERGE|RETURN|CALL|WITH|UNWIND|OPTIONAL)\b").ok();
    let clause = Regex::new(
        r"(?i)^\s*(MATCH|CREATE|MERGE|RETURN|CALL|WITH|UNWIND|OPTIONAL|WHERE|SET|DELETE|DETACH|LIMIT|ORDER|SKIP)\b",
    )
    .ok();
    let trailing = Regex::new(r"[;,\s]+$").ok();
    let matches = |re: &Option<Regex>, text: &str| {
        re.as_ref().map(|r| r.is_match(text)).unwrap_or(false)
    };

    let mut lines: Vec<&str> = Vec::new();
    let mut in_cypher = false;

    for line in cleaned.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('#') {
            if in_cypher {
                break;
            }
            continue;
        }

        if matches(&start, trimmed) {
            in_cypher = true;
            lines.push(trimmed);
        } else if in_cypher {
            if matches(&clause, trimmed)
                || matches(&trailing, trimmed)
                || trimmed.contains('(')
                || trimmed.contains(')')
            {
                lines.push(trimmed);
            } else {
                break;
            }
        }
    }

    if lines.is_empty() {
        cleaned.trim().to_string()
    } else {
        lines.join(" ").trim().to_string()
    }
}

/// Parse a planning decision, falling back to keyword inference when the
/// output holds no usable JSON object.
pub fn parse_planning_response(response: &str) -> PlanResult {
    let mut cleaned = response.trim().to_string();
    if let Ok(re) = Regex::new(r"(?i)```json\s*") {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    if let Ok(re) = Regex::new(r"```\s*") {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }

    if let Some(plan) = Regex::new(r"(?s)\{.*\}")
        .ok()
        .and_then(|re| re.find(&cleaned).map(|m| m.as_str().to_string()))
        .and_then(|json| serde_json::from_str::<Value>(&json).ok())
        .and_then(|value| plan_from_value(&value))
    {
        return plan;
    }

    debug!("Planning response was not JSON, inferring tools from text");
    let lower = cleaned.to_lowercase();
    let mut tools = Vec::new();
    if lower.contains(QUERY_TOOL) || lower.contains("query") {
        tools.push(QUERY_TOOL.to_string());
    }
    if lower.contains(CONTEXT_TOOL) || lower.contains("context") {
        tools.push(CONTEXT_TOOL.to_string());
    }
    if tools.is_empty() {
        tools.push(QUERY_TOOL.to_string());
    }

    PlanResult {
        tools,
        reasoning: cleaned.chars().take(200).collect(),
        parameters: ToolParameters::new(),
    }
}

fn plan_from_value(value: &Value) -> Option<PlanResult> {
    let obj = value.as_object()?;

    let tools = obj
        .get("tools")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let parameters = obj
        .get("parameters")
        .and_then(Value::as_object)
        .map(|params| {
            params
                .iter()
                .filter_map(|(tool, p)| p.as_object().map(|p| (tool.clone(), p.clone())))
                .collect()
        })
        .unwrap_or_default();

    Some(PlanResult {
        tools,
        reasoning,
        parameters,
    })
}
