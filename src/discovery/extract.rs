//! Turning a fetched schema document into an `McpRecord`.
//!
//! Handles JSON and YAML payloads, infers a domain from a keyword table when
//! the document doesn't declare one, and derives display tags from explicit
//! `tags`, tool-name prefixes, and keyword patterns.

use serde_json::Value;

use crate::record::{McpRecord, SourcePlatform};

/// Domain keyword table. First matching domain wins, so order matters.
const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
    ("weather", &["weather", "climate", "forecast", "temperature", "meteorology"]),
    ("finance", &["finance", "trading", "stock", "stocks", "crypto", "payment", "payments", "banking"]),
    ("travel", &["travel", "booking", "hotel", "flight", "flights", "airbnb", "tourism"]),
    ("productivity", &["calendar", "task", "tasks", "note", "notes", "email", "schedule", "todo"]),
    ("development", &["code", "git", "github", "deploy", "api", "programming"]),
    ("social", &["social", "twitter", "facebook", "instagram", "post", "media"]),
    ("ecommerce", &["shop", "store", "product", "cart", "order", "commerce", "ecommerce"]),
    ("data", &["data", "analytics", "database", "query", "search", "analysis"]),
    ("ai", &["ai", "ml", "llm", "gpt", "model", "intelligence"]),
    ("communication", &["chat", "message", "slack", "discord", "teams"]),
];

/// Tag keyword patterns.
const TAG_PATTERNS: &[(&str, &[&str])] = &[
    ("api", &["api", "rest", "endpoint"]),
    ("web", &["web", "http", "url", "browser"]),
    ("database", &["db", "database", "sql"]),
    ("cloud", &["aws", "azure", "gcp", "cloud"]),
    ("automation", &["automation", "automate", "script", "workflow"]),
    ("integration", &["integrate", "integration", "connect", "sync"]),
    ("realtime", &["realtime", "live", "stream", "streaming"]),
    ("security", &["auth", "security", "encrypt", "encryption"]),
    ("monitoring", &["monitor", "monitoring", "log", "logs", "metric", "metrics"]),
];

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Parse a schema document as JSON, falling back to YAML.
///
/// Returns the parsed object and its file type, or `None` when the content is
/// neither a JSON nor a YAML mapping.
pub fn parse_document(content: &str) -> Option<(Value, &'static str)> {
    if let Ok(value) = serde_json::from_str::<Value>(content) {
        return value.is_object().then_some((value, "json"));
    }
    match serde_yaml::from_str::<Value>(content) {
        Ok(value) if value.is_object() => Some((value, "yaml")),
        _ => None,
    }
}

/// Infer a domain from free text, defaulting to "general".
pub fn infer_domain(name: &str, description: &str) -> String {
    let words = tokens(&format!("{} {}", name, description));
    DOMAIN_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| words.iter().any(|w| w == k)))
        .map(|(domain, _)| domain.to_string())
        .unwrap_or_else(|| "general".to_string())
}

/// Derive display tags: explicit tags first, then tool-name prefixes, then
/// keyword patterns. Deduplicated, first occurrence wins.
pub fn infer_tags(schema: Option<&Value>, title: &str, description: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: String| {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    };

    let mut text = format!("{} {}", title, description);

    if let Some(schema) = schema {
        if let Some(explicit) = schema.get("tags").and_then(Value::as_array) {
            for tag in explicit.iter().filter_map(Value::as_str) {
                push(tag.to_string());
            }
        }
        if let Some(tools) = schema.get("tools").and_then(Value::as_array) {
            for tool in tools {
                if let Some(prefix) = tool
                    .get("name")
                    .and_then(Value::as_str)
                    .and_then(|n| n.split(['_', '.', '-']).next())
                    .filter(|p| p.len() > 1)
                {
                    push(prefix.to_string());
                }
            }
        }
        for key in ["name", "description"] {
            if let Some(s) = schema.get(key).and_then(Value::as_str) {
                text.push(' ');
                text.push_str(s);
            }
        }
    }

    let words = tokens(&text);
    for (tag, patterns) in TAG_PATTERNS {
        if patterns.iter().any(|p| words.iter().any(|w| w == p)) {
            push(tag.to_string());
        }
    }

    tags
}

/// Build an unscored web record from a parsed schema document.
pub fn record_from_document(
    source_url: &str,
    platform: SourcePlatform,
    title_hint: &str,
    document: Value,
    file_type: &str,
) -> McpRecord {
    let name = document
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(title_hint)
        .to_string();
    let description = document
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let domain = document
        .get("domain")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty())
        .map(|d| d.trim().to_lowercase())
        .unwrap_or_else(|| infer_domain(&name, &description));
    let tags = infer_tags(Some(&document), title_hint, &description);

    let mut record = McpRecord::discovered(source_url, platform, name, description);
    record.domain = domain;
    record.tags = tags;
    record.file_type = file_type.to_string();
    record.schema = Some(document);
    record
}
