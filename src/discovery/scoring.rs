//! Confidence scoring for discovered MCP records.
//!
//! Monotonic rules rather than a trained model:
//! - a fixed base, plus a fixed increment for a well-formed schema
//!   (and a small bonus when it also conforms to the published shape)
//! - a per-term increment for query terms found in the name or tags
//!   (half for description-only matches), capped
//! - a saturating increment for stars: `max * s / (s + half_saturation)`
//! - a small bonus when the name/URL identifies itself as an MCP
//! - a per-platform trust multiplier applied last
//!
//! An empty query contributes no term, star or naming increments, so it ranks
//! on schema validity and platform trust alone.
//!
//! Pure and deterministic. The result is always clamped to [0, 1].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validate::check_schema;
use crate::record::{McpRecord, SourcePlatform};

/// Trust multiplier per source platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformTrust {
    #[serde(default = "default_trust_github")]
    pub github: f64,
    #[serde(default = "default_trust_huggingface")]
    pub huggingface: f64,
    #[serde(default = "default_trust_web")]
    pub web: f64,
    #[serde(default = "default_trust_awesome")]
    pub awesome: f64,
}

fn default_trust_github() -> f64 {
    1.0
}
fn default_trust_huggingface() -> f64 {
    0.95
}
fn default_trust_web() -> f64 {
    0.9
}
fn default_trust_awesome() -> f64 {
    0.85
}

impl Default for PlatformTrust {
    fn default() -> Self {
        Self {
            github: default_trust_github(),
            huggingface: default_trust_huggingface(),
            web: default_trust_web(),
            awesome: default_trust_awesome(),
        }
    }
}

impl PlatformTrust {
    pub fn for_platform(&self, platform: SourcePlatform) -> f64 {
        match platform {
            SourcePlatform::Github => self.github,
            SourcePlatform::Huggingface => self.huggingface,
            SourcePlatform::Web => self.web,
            SourcePlatform::Awesome => self.awesome,
            SourcePlatform::Catalog => 1.0,
        }
    }
}

/// Scoring coefficients. None of these are load-bearing; all are configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_base")]
    pub base: f64,
    #[serde(default = "default_valid_schema")]
    pub valid_schema: f64,
    #[serde(default = "default_conforming_schema")]
    pub conforming_schema: f64,
    #[serde(default = "default_term_match")]
    pub term_match: f64,
    #[serde(default = "default_term_match_cap")]
    pub term_match_cap: f64,
    #[serde(default = "default_stars_max")]
    pub stars_max: f64,
    #[serde(default = "default_stars_half_saturation")]
    pub stars_half_saturation: f64,
    #[serde(default = "default_mcp_named")]
    pub mcp_named: f64,
    #[serde(default)]
    pub platform_trust: PlatformTrust,
}

fn default_base() -> f64 {
    0.2
}
fn default_valid_schema() -> f64 {
    0.3
}
fn default_conforming_schema() -> f64 {
    0.05
}
fn default_term_match() -> f64 {
    0.08
}
fn default_term_match_cap() -> f64 {
    0.24
}
fn default_stars_max() -> f64 {
    0.15
}
fn default_stars_half_saturation() -> f64 {
    50.0
}
fn default_mcp_named() -> f64 {
    0.05
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: default_base(),
            valid_schema: default_valid_schema(),
            conforming_schema: default_conforming_schema(),
            term_match: default_term_match(),
            term_match_cap: default_term_match_cap(),
            stars_max: default_stars_max(),
            stars_half_saturation: default_stars_half_saturation(),
            mcp_named: default_mcp_named(),
            platform_trust: PlatformTrust::default(),
        }
    }
}

/// The raw signals the scorer looks at.
#[derive(Debug, Clone, Copy)]
pub struct ScoreSignals<'a> {
    pub platform: SourcePlatform,
    pub schema: Option<&'a Value>,
    pub stars: Option<u64>,
    pub name: &'a str,
    pub description: &'a str,
    pub tags: &'a [String],
    pub source_url: &'a str,
}

impl<'a> ScoreSignals<'a> {
    pub fn from_record(record: &'a McpRecord) -> Self {
        Self {
            platform: record.source_platform,
            schema: record.schema.as_ref(),
            stars: record.stars,
            name: &record.name,
            description: &record.description,
            tags: &record.tags,
            source_url: record.source_url().unwrap_or_default(),
        }
    }
}

/// Scoring outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub score: f64,
    /// Whether the schema is present and well-formed. Always false without a schema.
    pub validated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    weights: ScoringWeights,
}

impl ConfidenceScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn score(&self, query: &str, signals: &ScoreSignals<'_>) -> Scored {
        let w = &self.weights;
        let mut score = w.base;

        let check = signals.schema.map(check_schema);
        let validated = check.as_ref().is_some_and(|c| c.well_formed);
        if validated {
            score += w.valid_schema;
        }
        if check.as_ref().is_some_and(|c| c.conforms) {
            score += w.conforming_schema;
        }

        // An empty query ranks on schema validity and platform trust alone.
        let terms = query_terms(query);
        if !terms.is_empty() {
            score += self.term_component(&terms, signals);

            if let Some(stars) = signals.stars {
                let s = stars as f64;
                let half = w.stars_half_saturation.max(f64::EPSILON);
                score += w.stars_max * s / (s + half);
            }

            if mentions_mcp(signals.name) || mentions_mcp(signals.source_url) {
                score += w.mcp_named;
            }
        }

        score *= w.platform_trust.for_platform(signals.platform);

        Scored {
            score: clamp_unit(score),
            validated,
        }
    }

    /// Score a record in place, setting `confidence_score` and `validated`.
    pub fn apply(&self, query: &str, record: &mut McpRecord) {
        let scored = self.score(query, &ScoreSignals::from_record(record));
        record.confidence_score = Some(scored.score);
        record.validated = scored.validated;
    }

    fn term_component(&self, terms: &[String], signals: &ScoreSignals<'_>) -> f64 {
        let w = &self.weights;
        let name = signals.name.to_lowercase();
        let description = signals.description.to_lowercase();
        let tags: Vec<String> = signals.tags.iter().map(|t| t.to_lowercase()).collect();

        let mut total = 0.0;
        for term in terms {
            if name.contains(term.as_str()) || tags.iter().any(|t| t.contains(term.as_str())) {
                total += w.term_match;
            } else if description.contains(term.as_str()) {
                total += w.term_match / 2.0;
            }
        }
        total.min(w.term_match_cap)
    }
}

/// Lowercased, deduplicated query terms in first-seen order.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for raw in query.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_')) {
        let term = raw.trim_matches(|c| c == '-' || c == '_').to_lowercase();
        if !term.is_empty() && !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

fn mentions_mcp(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("mcp") || lower.contains("model context protocol") || lower.contains("model-context-protocol")
}

fn clamp_unit(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
