//! Parse-and-validate step for status endpoint bodies.
//!
//! The body arrives as untyped JSON. It is either turned into a [`StatusPayload`]
//! or rejected with [`SourceError::Validation`]; nothing here panics or returns a
//! partially trusted value.

use std::collections::HashSet;

use api_types::StatusNode;
use api_types::StatusRole;
use api_types::StatusSourceKind;
use error_stack::Report;
use serde_json::Value;
use tracing::trace;

use crate::error::SourceError;
use crate::error::SourceResult;

/// Validated body of a status response
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPayload {
    /// Never empty
    pub nodes: Vec<StatusNode>,
    pub source: StatusSourceKind,
    /// The endpoint's own advisory, if it sent one
    pub advisory: Option<String>,
}

impl StatusPayload {
    pub fn is_fallback(&self) -> bool {
        self.source == StatusSourceKind::Fallback
    }
}

/// Validate a status body.
///
/// # Errors
///
/// - [`SourceError::Validation`] if `nodes` is missing or not an array, or if no
///   entry in it describes a usable node
pub fn parse_status_payload(body: &Value) -> SourceResult<StatusPayload> {
    let Some(raw_nodes) = body.get("nodes").and_then(Value::as_array) else {
        return Err(Report::new(SourceError::validation("missing nodes array")));
    };

    let mut seen = HashSet::new();
    let mut nodes = Vec::with_capacity(raw_nodes.len());
    for raw in raw_nodes {
        let Some(node) = normalize_node(raw) else {
            trace!(entry = %raw, "skipping unusable status entry");
            continue;
        };
        // name is the graph identity; an exact repeat would alias the first node
        if seen.insert(node.name.clone()) {
            nodes.push(node);
        } else {
            trace!(name = %node.name, "skipping repeated status entry");
        }
    }

    if nodes.is_empty() {
        return Err(Report::new(SourceError::validation("no valid nodes")));
    }

    let source = body
        .get("source")
        .and_then(|v| serde_json::from_value::<StatusSourceKind>(v.clone()).ok())
        .unwrap_or_default();

    let advisory = body
        .get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(StatusPayload {
        nodes,
        source,
        advisory,
    })
}

fn normalize_node(raw: &Value) -> Option<StatusNode> {
    let obj = raw.as_object()?;
    let name = node_name(obj.get("name")?)?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let role = obj
        .get("role")
        .and_then(Value::as_str)
        .and_then(StatusRole::parse)
        .unwrap_or_else(|| infer_role(name));
    let online = obj.get("online").map(coerce_online).unwrap_or(false);
    Some(StatusNode::new(name, role, online))
}

/// Names are strings; numeric names are accepted in their JSON text form.
fn node_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Interpret loosely typed `online` values.
pub fn coerce_online(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "online" | "up"
        ),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// Guess a role from a host name when the endpoint sent none we recognize.
pub fn infer_role(name: &str) -> StatusRole {
    let name = name.to_lowercase();
    let has_any = |keys: &[&str]| keys.iter().any(|k| name.contains(k));
    if has_any(&["gateway", "router", "edge"]) {
        StatusRole::Gateway
    } else if has_any(&["gpu", "cuda", "rtx", "hades"]) {
        StatusRole::Gpu
    } else if has_any(&["ai", "llm", "ollama", "kratos"]) {
        StatusRole::Ai
    } else {
        StatusRole::Storage
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    fn validation_reason(body: Value) -> String {
        let err = parse_status_payload(&body).expect_err("should reject body");
        match err.current_context() {
            SourceError::Validation { reason } => reason.clone(),
            other => panic!("unexpected error kind: {other}"),
        }
    }

    #[test]
    fn accepts_well_formed_body() {
        let payload = parse_status_payload(&json!({
            "nodes": [
                {"name": "minibeast", "role": "gateway", "online": true},
                {"name": "hermes", "role": "storage", "online": false}
            ],
            "source": "astra-core"
        }))
        .expect("should accept body");

        assert_eq!(payload.nodes, vec![
            StatusNode::new("minibeast", StatusRole::Gateway, true),
            StatusNode::new("hermes", StatusRole::Storage, false),
        ]);
        assert!(!payload.is_fallback());
        assert_eq!(payload.advisory, None);
    }

    #[test]
    fn rejects_missing_or_non_array_nodes() {
        assert_eq!(validation_reason(json!({})), "missing nodes array");
        assert_eq!(validation_reason(json!({"nodes": "x"})), "missing nodes array");
        assert_eq!(validation_reason(json!({"nodes": {"a": 1}})), "missing nodes array");
        assert_eq!(validation_reason(json!([1, 2, 3])), "missing nodes array");
        assert_eq!(validation_reason(Value::Null), "missing nodes array");
    }

    #[test]
    fn rejects_when_no_entry_survives() {
        assert_eq!(validation_reason(json!({"nodes": []})), "no valid nodes");
        assert_eq!(
            validation_reason(json!({"nodes": [42, {"role": "gpu"}, {"name": "  "}]})),
            "no valid nodes"
        );
    }

    #[test]
    fn fallback_source_and_advisory() {
        let payload = parse_status_payload(&json!({
            "nodes": [{"name": "a", "role": "gateway", "online": true}],
            "source": "nebula-fallback",
            "error": "Status backend unreachable: timeout"
        }))
        .expect("should accept body");

        assert!(payload.is_fallback());
        assert_eq!(
            payload.advisory.as_deref(),
            Some("Status backend unreachable: timeout")
        );
    }

    #[test]
    fn normalizes_entries() {
        let payload = parse_status_payload(&json!({
            "nodes": [
                {"name": " edge-router ", "role": "switch", "online": "UP"},
                {"name": "rtx-box", "online": 1},
                {"name": "ollama-1", "role": "", "online": "no"},
                {"name": "nas", "online": null},
                {"name": "edge-router", "role": "storage", "online": false}
            ]
        }))
        .expect("should accept body");

        assert_eq!(payload.nodes, vec![
            StatusNode::new("edge-router", StatusRole::Gateway, true),
            StatusNode::new("rtx-box", StatusRole::Gpu, true),
            StatusNode::new("ollama-1", StatusRole::Ai, false),
            StatusNode::new("nas", StatusRole::Storage, false),
        ]);
    }

    #[test]
    fn names_differing_only_in_case_are_distinct_nodes() {
        let payload = parse_status_payload(&json!({
            "nodes": [
                {"name": "Hermes", "role": "storage", "online": true},
                {"name": "hermes", "role": "storage", "online": false}
            ]
        }))
        .expect("should accept body");

        let names: Vec<_> = payload.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Hermes", "hermes"]);
    }

    #[test]
    fn numeric_names_are_stringified() {
        let payload = parse_status_payload(&json!({
            "nodes": [
                {"name": 42, "role": "gpu", "online": true},
                {"name": 1.5, "role": "ai"},
                {"name": true, "role": "gateway"},
                {"name": null, "role": "gateway"}
            ]
        }))
        .expect("should accept body");

        assert_eq!(payload.nodes, vec![
            StatusNode::new("42", StatusRole::Gpu, true),
            StatusNode::new("1.5", StatusRole::Ai, false),
        ]);
    }

    #[test]
    fn unknown_source_is_primary() {
        let payload = parse_status_payload(&json!({
            "nodes": [{"name": "a", "role": "gpu", "online": true}],
            "source": "mystery"
        }))
        .expect("should accept body");
        assert_eq!(payload.source, StatusSourceKind::Primary);
    }
}
