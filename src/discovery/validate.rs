//! MCP schema checks.
//!
//! Two levels:
//! - **Well-formed**: an object with a non-empty `tools` array where every tool
//!   has a non-empty `name`. This is what `validated == true` promises.
//! - **Conforming**: additionally matches the published MCP schema shape
//!   (identifier-style names, semver `version`, described tools with object
//!   `parameters`). Only used as a scoring bonus.

use std::sync::OnceLock;

use jsonschema::JSONSchema;
use serde_json::{json, Value};

/// Outcome of checking a schema payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaCheck {
    pub well_formed: bool,
    pub conforms: bool,
    pub tool_count: usize,
    pub problems: Vec<String>,
}

fn conformance_schema() -> &'static Option<JSONSchema> {
    static COMPILED: OnceLock<Option<JSONSchema>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        let schema = json!({
            "type": "object",
            "required": ["name", "version", "tools"],
            "properties": {
                "name": { "type": "string", "pattern": "^[a-zA-Z0-9._-]+$", "minLength": 1 },
                "version": { "type": "string", "pattern": "^\\d+\\.\\d+\\.\\d+$" },
                "description": { "type": "string" },
                "tools": {
                    "type": "array",
                    "minItems": 1,
                    "items": {
                        "type": "object",
                        "required": ["name", "description", "parameters"],
                        "properties": {
                            "name": { "type": "string", "pattern": "^[a-zA-Z0-9._-]+$" },
                            "description": { "type": "string", "minLength": 10 },
                            "parameters": { "type": "object" }
                        }
                    }
                }
            }
        });
        match JSONSchema::options().compile(&schema) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::error!("MCP conformance schema failed to compile: {}", e);
                None
            }
        }
    })
}

/// Check a schema payload for well-formedness and conformance.
pub fn check_schema(schema: &Value) -> SchemaCheck {
    let mut check = SchemaCheck::default();

    let Some(object) = schema.as_object() else {
        check.problems.push("schema is not an object".into());
        return check;
    };

    match object.get("tools") {
        Some(Value::Array(tools)) if !tools.is_empty() => {
            check.tool_count = tools.len();
            for (i, tool) in tools.iter().enumerate() {
                let named = tool
                    .get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|n| !n.trim().is_empty());
                if !named {
                    check.problems.push(format!("tool #{} has no name", i));
                }
            }
            check.well_formed = check.problems.is_empty();
        }
        Some(Value::Array(_)) => check.problems.push("tool list is empty".into()),
        Some(_) => check.problems.push("tools is not a list".into()),
        None => check.problems.push("missing tools".into()),
    }

    check.conforms = check.well_formed
        && conformance_schema()
            .as_ref()
            .is_some_and(|compiled| compiled.is_valid(schema));

    check
}

/// Whether an optional schema payload is present and well-formed.
pub fn is_well_formed(schema: Option<&Value>) -> bool {
    schema.is_some_and(|s| check_schema(s).well_formed)
}

/// Whether a parsed document is recognisably an MCP schema at all (possibly
/// malformed). Documents that fail this are not importable.
pub fn looks_like_mcp(document: &Value) -> bool {
    let Some(object) = document.as_object() else {
        return false;
    };
    object.contains_key("tools")
        || (object.get("name").is_some_and(Value::is_string)
            && (object.contains_key("description") || object.contains_key("version")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather_schema() -> Value {
        json!({
            "name": "weather.forecast",
            "version": "2.1.0",
            "description": "Weather forecasting tools",
            "tools": [
                {
                    "name": "get_current_weather",
                    "description": "Get current weather for a location",
                    "parameters": { "location": "string" }
                }
            ]
        })
    }

    #[test]
    fn test_conforming_schema() {
        let check = check_schema(&weather_schema());
        assert!(check.well_formed);
        assert!(check.conforms);
        assert_eq!(check.tool_count, 1);
        assert!(check.problems.is_empty());
    }

    #[test]
    fn test_well_formed_but_not_conforming() {
        let schema = json!({ "name": "my tool set", "tools": [{ "name": "do_it" }] });
        let check = check_schema(&schema);
        assert!(check.well_formed);
        assert!(!check.conforms);
    }

    #[test]
    fn test_empty_tool_list_is_malformed() {
        let check = check_schema(&json!({ "name": "x", "tools": [] }));
        assert!(!check.well_formed);
        assert!(!check.conforms);
    }

    #[test]
    fn test_unnamed_tool_is_malformed() {
        let schema = json!({ "tools": [{ "name": "ok" }, { "description": "no name" }, { "name": "  " }] });
        let check = check_schema(&schema);
        assert!(!check.well_formed);
        assert_eq!(check.problems.len(), 2);
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(!check_schema(&json!(["tools"])).well_formed);
        assert!(!is_well_formed(None));
        assert!(is_well_formed(Some(&weather_schema())));
    }

    #[test]
    fn test_looks_like_mcp() {
        assert!(looks_like_mcp(&weather_schema()));
        assert!(looks_like_mcp(&json!({ "tools": "broken" })));
        assert!(looks_like_mcp(&json!({ "name": "x", "version": "1.0.0" })));
        assert!(!looks_like_mcp(&json!({ "name": "package.json-ish" })));
        assert!(!looks_like_mcp(&json!("plain string")));
    }
}
