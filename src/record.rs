//! The MCP record: the unit of discovery and of the local catalog.
//!
//! A record is either web-discovered (identified by its source URL, carries a
//! confidence score) or a catalog record (identified by a stable catalog ID,
//! carries a popularity counter). Never both.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where a record came from.
///
/// Declaration order doubles as the deterministic tiebreak order when two
/// otherwise-equal records are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePlatform {
    Github,
    Huggingface,
    Web,
    Awesome,
    Catalog,
}

impl SourcePlatform {
    /// Platforms that have a web Source Adapter (everything except the catalog).
    pub const DISCOVERABLE: [SourcePlatform; 4] = [
        SourcePlatform::Github,
        SourcePlatform::Huggingface,
        SourcePlatform::Web,
        SourcePlatform::Awesome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourcePlatform::Github => "github",
            SourcePlatform::Huggingface => "huggingface",
            SourcePlatform::Web => "web",
            SourcePlatform::Awesome => "awesome",
            SourcePlatform::Catalog => "catalog",
        }
    }
}

impl fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourcePlatform {
    type Err = String;

    /// Accepts the canonical names plus the spellings the frontend and the
    /// health check have historically used ("General Web", "Awesome Lists", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" => Ok(SourcePlatform::Github),
            "huggingface" | "hugging face" | "hf" => Ok(SourcePlatform::Huggingface),
            "web" | "general web" | "registry" => Ok(SourcePlatform::Web),
            "awesome" | "awesome lists" | "awesome-list" => Ok(SourcePlatform::Awesome),
            "catalog" | "local" => Ok(SourcePlatform::Catalog),
            other => Err(format!("unknown source platform '{}'", other)),
        }
    }
}

/// Identity of a record: a catalog ID for persisted records, a source URL for
/// web-discovered ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RecordIdentity {
    Catalog(String),
    Web(String),
}

/// A discovered or catalogued MCP schema record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpRecord {
    pub identity: RecordIdentity,
    pub name: String,
    pub description: String,
    /// Single categorical tag, e.g. "weather" or "finance".
    pub domain: String,
    /// Display order is preserved; matching ignores order.
    pub tags: Vec<String>,
    pub validated: bool,
    /// Present only on web-discovered records, always in [0, 1].
    pub confidence_score: Option<f64>,
    /// Present only on catalog records.
    pub popularity: Option<i64>,
    pub source_platform: SourcePlatform,
    /// Raw tool-schema payload (name/description/tools), if one was extracted.
    pub schema: Option<serde_json::Value>,
    /// "json", "yaml", or "unknown".
    pub file_type: String,
    pub repository: Option<String>,
    pub stars: Option<u64>,
    /// Origin URL of an imported catalog record.
    pub imported_from: Option<String>,
    pub created_at: Option<String>,
}

impl McpRecord {
    /// A fresh web-discovered record with no score yet.
    pub fn discovered(
        source_url: impl Into<String>,
        platform: SourcePlatform,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            identity: RecordIdentity::Web(source_url.into()),
            name: name.into(),
            description: description.into(),
            domain: "general".into(),
            tags: Vec::new(),
            validated: false,
            confidence_score: None,
            popularity: None,
            source_platform: platform,
            schema: None,
            file_type: "unknown".into(),
            repository: None,
            stars: None,
            imported_from: None,
            created_at: None,
        }
    }

    /// Source URL of a web-discovered record, or the origin URL of an imported one.
    pub fn source_url(&self) -> Option<&str> {
        match &self.identity {
            RecordIdentity::Web(url) => Some(url),
            RecordIdentity::Catalog(_) => self.imported_from.as_deref(),
        }
    }

    pub fn catalog_id(&self) -> Option<&str> {
        match &self.identity {
            RecordIdentity::Catalog(id) => Some(id),
            RecordIdentity::Web(_) => None,
        }
    }

    /// Score used for ranking. Catalog records are implicitly fully trusted.
    pub fn score(&self) -> f64 {
        self.confidence_score.unwrap_or(1.0)
    }

    /// Key identifying this record within one result list.
    pub fn key(&self) -> String {
        match &self.identity {
            RecordIdentity::Catalog(id) => format!("catalog:{}", id),
            RecordIdentity::Web(url) => format!("{}:{}", self.source_platform, url),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
