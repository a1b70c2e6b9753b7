//! Prompt builders

use cortex_core::{ConversationTurn, Row};

/// Prompt that turns a question into a single Cypher statement
pub fn build_cypher_prompt(question: &str, schema: Option<&str>) -> String {
    let schema_section = match schema {
        Some(schema) => format!(
            "Current graph schema:\n{}\n\nIMPORTANT: Only use node labels, relationship types, and properties that exist in the schema above. Do not invent labels or properties that are not listed.",
            schema
        ),
        None => "WARNING: No schema information available. Use generic queries and be cautious about label/property names."
            .to_string(),
    };
    let schema_rule = if schema.is_some() {
        "- Use ONLY the node labels and relationship types from the schema above"
    } else {
        ""
    };

    format!(
        r#"You are a Cypher query generator for Neo4j graph database.

{schema_section}

Convert the following natural language query into a valid Cypher query:
"{question}"

CRITICAL RULES:
- Return ONLY the Cypher query, no explanations, no markdown, no code blocks
- Use proper Neo4j Cypher syntax (version 5.x)
- Always include a RETURN clause
{schema_rule}
- Use MATCH to find nodes: MATCH (n:Label) WHERE n.property = 'value' RETURN n
- Use WHERE for filtering: MATCH (n) WHERE n.name CONTAINS 'text' RETURN n
- For "all nodes" queries: MATCH (n) RETURN n LIMIT 100
- For searching by name: MATCH (n) WHERE toLower(n.name) CONTAINS toLower('search') RETURN n
- Always use LIMIT for queries that might return many results
- Test your syntax mentally before returning

Example valid queries:
- "show all nodes": MATCH (n) RETURN n LIMIT 100
- "find person named John": MATCH (n) WHERE toLower(n.name) CONTAINS 'john' RETURN n LIMIT 50
- "all notes": MATCH (n:Note) RETURN n LIMIT 100

Cypher query:"#
    )
}

/// Prompt that explains query rows in plain language
pub fn build_response_prompt(question: &str, rows: &[Row], query: Option<&str>) -> String {
    let results_json = serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string());
    let count = rows.len();
    let noun = if count == 1 { "result" } else { "results" };
    let query_line = query
        .map(|q| format!("The query executed was: {}\n\n", q))
        .unwrap_or_default();

    format!(
        r#"You are a helpful assistant that explains graph database query results in a conversational, natural way.

The user asked: "{question}"

{query_line}The query returned {count} {noun}:

{results_json}

Your task:
- Provide a clear, conversational response that answers the user's question
- Summarize the key findings from the results
- If there are many results, provide a summary rather than listing everything
- If there are no results, explain that in a helpful way
- Be concise but informative
- Don't just repeat the JSON - interpret and explain what it means
- Use natural language, not technical jargon unless necessary

Response:"#
    )
}

/// Prompt that asks for a JSON tool-selection decision
pub fn build_planning_prompt(
    message: &str,
    tool_catalogue: &str,
    schema: Option<&str>,
    history: &[ConversationTurn],
) -> String {
    let schema_section = schema
        .map(|s| format!("\n\nGraph schema:\n{}", s))
        .unwrap_or_default();

    let history_section = if history.is_empty() {
        String::new()
    } else {
        let lines: Vec<String> = history
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect();
        format!("\n\nPrevious conversation:\n{}", lines.join("\n"))
    };

    format!(
        r#"You are a planning assistant for a graph database chat system. Based on the user's question and available tools, decide what actions to take.

Available tools:
{tool_catalogue}{schema_section}{history_section}

User question: "{message}"

Your task:
- Analyze the question and available context
- Decide which tool(s) to use
- If the question can be answered from context (previous results or explicit nodes), use answer_from_context
- If you need to search the database, use execute_cypher_query
- You can use multiple tools if needed

Return ONLY valid JSON in this exact format:
{{
  "tools": ["tool_name1", "tool_name2"],
  "reasoning": "Brief explanation of why you chose these tools",
  "parameters": {{
    "tool_name1": {{ "param1": "value1" }},
    "tool_name2": {{ "param2": "value2" }}
  }}
}}

Important:
- "tools" must be an array of tool names from the available tools list
- "parameters" must include parameters for each tool you selected
- For execute_cypher_query, you don't need to provide the query in parameters (it will be generated separately)
- For answer_from_context, include "message" parameter with the user's question
- Return ONLY the JSON, no markdown, no explanations

Planning decision:"#
    )
}

/// Prompt that answers strictly from supplied context
pub fn build_context_answer_prompt(context: &str, question: &str) -> String {
    format!(
        r#"You are a helpful assistant. Answer the user's question using ONLY the provided context. Do not make up information or reference things not in the context.

Context:
{context}

User question: "{question}"

Provide a clear, conversational answer based on the context above. If the context doesn't contain enough information to fully answer, say so."#
    )
}
