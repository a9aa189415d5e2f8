//! Import-by-URL: fetch a schema document, normalize it and persist it.

use url::Url;

use super::CatalogStore;
use crate::discovery::extract::record_from_document;
use crate::discovery::fetch::SchemaFetcher;
use crate::error::{PlaygroundError, Result};
use crate::record::{McpRecord, SourcePlatform};

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub record: McpRecord,
    /// False when the URL was already catalogued.
    pub created: bool,
}

/// Import the MCP schema at `source_url` into the catalog.
///
/// A URL that is already catalogued short-circuits: no fetch happens and the
/// existing record is returned with one more usage. Fetch or parse failures
/// surface as [`PlaygroundError::Import`] and leave the catalog untouched.
pub async fn import_from_url(
    catalog: &CatalogStore,
    fetcher: &dyn SchemaFetcher,
    source_url: &str,
    auto_validate: bool,
    popularity_seed: i64,
) -> Result<ImportOutcome> {
    let source_url = source_url.trim();
    let parsed = Url::parse(source_url)
        .map_err(|e| PlaygroundError::InvalidRequest(format!("invalid source URL: {}", e)))?;

    if let Some(existing) = catalog.find_by_source_url(source_url)? {
        tracing::info!("{} already catalogued, recording usage", source_url);
        let id = existing.catalog_id().unwrap_or_default().to_string();
        let record = catalog.record_usage(&id)?.unwrap_or(existing);
        return Ok(ImportOutcome {
            record,
            created: false,
        });
    }

    let fetched = fetcher
        .fetch_schema(source_url)
        .await
        .map_err(|e| match e {
            invalid @ PlaygroundError::InvalidRequest(_) => invalid,
            PlaygroundError::Fetch(msg) => PlaygroundError::Import(msg),
            other => PlaygroundError::Import(format!("{} could not be fetched: {}", source_url, other)),
        })?;

    let record = record_from_document(
        source_url,
        platform_for(&parsed),
        &title_hint(&parsed),
        fetched.document,
        fetched.file_type,
    );
    let (record, created) = catalog.import_from_web(&record, auto_validate, popularity_seed)?;
    tracing::info!(
        "Imported {} as {} (validated: {})",
        source_url,
        record.catalog_id().unwrap_or_default(),
        record.validated
    );
    Ok(ImportOutcome { record, created })
}

fn platform_for(url: &Url) -> SourcePlatform {
    match url.host_str().map(|h| h.trim_start_matches("www.")) {
        Some("github.com") | Some("raw.githubusercontent.com") => SourcePlatform::Github,
        Some("huggingface.co") => SourcePlatform::Huggingface,
        _ => SourcePlatform::Web,
    }
}

/// Fallback name when the document has none: the repository or file name.
fn title_hint(url: &Url) -> String {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let last = segments
        .last()
        .copied()
        .unwrap_or_else(|| url.host_str().unwrap_or("mcp"));
    match last.rsplit_once('.') {
        Some((stem, "json" | "yaml" | "yml" | "git")) if !stem.is_empty() => stem.to_string(),
        _ => last.to_string(),
    }
}
