//! Deterministic answer text for query rows

use cortex_core::Row;
use serde::Serialize;
use serde_json::Value;

/// Row counts above this are summarized
const SUMMARY_THRESHOLD: usize = 50;
/// Rows shown in a summary
const SUMMARY_PREVIEW: usize = 10;

/// Render rows without a language model
pub fn format_query_response(rows: &[Row]) -> String {
    match rows.len() {
        0 => "No results found for your query.".to_string(),
        n if n > SUMMARY_THRESHOLD => format!(
            "Found {} results. Showing first {}:\n\n{}\n\n... and {} more results.",
            n,
            SUMMARY_PREVIEW,
            pretty(&rows[..SUMMARY_PREVIEW]),
            n - SUMMARY_PREVIEW
        ),
        1 => format_single(&rows[0]),
        n => format!("Found {} results:\n\n{}", n, pretty(rows)),
    }
}

fn format_single(row: &Row) -> String {
    if row.len() == 1 {
        if let Some(Value::Object(node)) = row.values().next() {
            if let (Some(labels), Some(props)) = (node.get("labels"), node.get("properties")) {
                let labels = labels
                    .as_array()
                    .map(|l| l.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(":"))
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| "node".to_string());
                return format!("Found 1 {}:\n\n{}", labels, pretty(props));
            }
        }
    }
    format!("Found 1 result:\n\n{}", pretty(row))
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
