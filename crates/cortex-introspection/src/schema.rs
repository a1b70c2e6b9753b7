//! Schema model and prompt formatting

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A property name with every value type observed for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySchema {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl PropertySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    fn merge_types<I: IntoIterator<Item = String>>(&mut self, types: I) {
        for t in types {
            if !self.types.contains(&t) {
                self.types.push(t);
            }
        }
    }
}

/// Shape of the graph: labels, relationship types, and their properties
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphSchema {
    pub node_labels: Vec<String>,
    pub relationship_types: Vec<String>,
    /// label -> properties
    #[serde(default)]
    pub node_properties: BTreeMap<String, Vec<PropertySchema>>,
    /// relationship type -> properties
    #[serde(default)]
    pub relationship_properties: BTreeMap<String, Vec<PropertySchema>>,
}

impl GraphSchema {
    pub fn is_empty(&self) -> bool {
        self.node_labels.is_empty() && self.relationship_types.is_empty()
    }

    /// Record that nodes with `node_type` (`` :`A`:`B` ``) carry `property`
    pub(crate) fn add_node_property(
        &mut self,
        node_type: &str,
        property: &str,
        types: Vec<String>,
    ) {
        for label in split_type_string(node_type) {
            let props = self.node_properties.entry(label).or_default();
            upsert(props, property, types.clone());
        }
    }

    /// Record that relationships of `rel_type` (`` :`TYPE` ``) carry `property`
    pub(crate) fn add_relationship_property(
        &mut self,
        rel_type: &str,
        property: &str,
        types: Vec<String>,
    ) {
        let name: String = rel_type.chars().filter(|c| *c != '`' && *c != ':').collect();
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let props = self
            .relationship_properties
            .entry(name.to_string())
            .or_default();
        upsert(props, property, types);
    }

    /// Every distinct property across labels and relationship types
    pub fn all_properties(&self) -> Vec<PropertySchema> {
        let mut merged: BTreeMap<&str, PropertySchema> = BTreeMap::new();
        for prop in self
            .node_properties
            .values()
            .chain(self.relationship_properties.values())
            .flatten()
        {
            merged
                .entry(prop.name.as_str())
                .or_insert_with(|| PropertySchema::new(prop.name.clone()))
                .merge_types(prop.types.iter().cloned());
        }
        merged.into_values().collect()
    }

    /// Human-readable rendering for language model prompts
    pub fn format_for_prompt(&self) -> String {
        let mut parts = Vec::new();

        if self.node_labels.is_empty() {
            parts.push("NODE LABELS: (none)".to_string());
        } else {
            parts.push("NODE LABELS:".to_string());
            for label in &self.node_labels {
                parts.push(format_entry(label, self.node_properties.get(label)));
            }
        }

        if self.relationship_types.is_empty() {
            parts.push("\nRELATIONSHIP TYPES: (none)".to_string());
        } else {
            parts.push("\nRELATIONSHIP TYPES:".to_string());
            for rel_type in &self.relationship_types {
                parts.push(format_entry(rel_type, self.relationship_properties.get(rel_type)));
            }
        }

        parts.join("\n")
    }
}

fn format_entry(name: &str, props: Option<&Vec<PropertySchema>>) -> String {
    match props {
        Some(props) if !props.is_empty() => {
            let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
            format!("  - {} (properties: {})", name, names.join(", "))
        }
        _ => format!("  - {}", name),
    }
}

fn upsert(props: &mut Vec<PropertySchema>, property: &str, types: Vec<String>) {
    match props.iter_mut().find(|p| p.name == property) {
        Some(existing) => existing.merge_types(types),
        None => {
            let mut prop = PropertySchema::new(property);
            prop.merge_types(types);
            props.push(prop);
        }
    }
}

/// `` :`Person`:`Employee` `` -> `["Person", "Employee"]`
fn split_type_string(node_type: &str) -> Vec<String> {
    node_type
        .split(':')
        .map(|l| l.replace('`', "").trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphSchema {
        let mut schema = GraphSchema {
            node_labels: vec!["Company".to_string(), "Person".to_string()],
            relationship_types: vec!["WORKS_AT".to_string()],
            ..Default::default()
        };
        schema.add_node_property(":`Person`", "name", vec!["String".to_string()]);
        schema.add_node_property(":`Person`", "age", vec!["Long".to_string()]);
        schema.add_relationship_property(":`WORKS_AT`", "since", vec!["Date".to_string()]);
        schema
    }

    #[test]
    fn test_format_for_prompt() {
        let text = sample().format_for_prompt();
        assert_eq!(
            text,
            "NODE LABELS:\n  - Company\n  - Person (properties: name, age)\n\nRELATIONSHIP TYPES:\n  - WORKS_AT (properties: since)"
        );
    }

    #[test]
    fn test_format_empty_schema() {
        assert_eq!(
            GraphSchema::default().format_for_prompt(),
            "NODE LABELS: (none)\n\nRELATIONSHIP TYPES: (none)"
        );
    }

    #[test]
    fn test_multi_label_node_types_fan_out() {
        let mut schema = GraphSchema::default();
        schema.add_node_property(":`Person`:`Employee`", "name", vec!["String".to_string()]);
        schema.add_node_property(":`Person`", "name", vec!["StringArray".to_string()]);

        assert_eq!(schema.node_properties["Employee"][0].name, "name");
        assert_eq!(
            schema.node_properties["Person"][0].types,
            vec!["String".to_string(), "StringArray".to_string()]
        );
    }

    #[test]
    fn test_all_properties_are_distinct() {
        let mut schema = sample();
        schema.add_node_property(":`Company`", "name", vec!["String".to_string()]);

        let names: Vec<_> = schema.all_properties().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["age", "name", "since"]);
    }
}
