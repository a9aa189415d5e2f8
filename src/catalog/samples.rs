//! Built-in sample catalog shown on a fresh install.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Result;

const SAMPLES_JSON: &str = include_str!("samples.json");

#[derive(Debug, Clone, Deserialize)]
pub struct SampleMcp {
    pub id: String,
    pub name: String,
    pub description: String,
    pub domain: String,
    pub tags: Vec<String>,
    pub validated: bool,
    pub popularity: i64,
    pub source_platform: String,
    pub schema: Value,
}

pub fn sample_mcps() -> Result<Vec<SampleMcp>> {
    Ok(serde_json::from_str(SAMPLES_JSON)?)
}
