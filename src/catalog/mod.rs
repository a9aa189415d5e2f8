//! Local MCP catalog on SQLite.
//!
//! Catalog records are keyed by a stable catalog ID derived from the record
//! name and its normalized source URL. The source URL carries a unique
//! constraint, so concurrent imports of the same URL can never produce two
//! rows.

pub mod import;
pub mod samples;
pub mod schema;

use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::discovery::normalize_source_url;
use crate::discovery::validate::is_well_formed;
use crate::error::{PlaygroundError, Result};
use crate::facets::{SavedQuery, SavedSearch};
use crate::record::{McpRecord, RecordIdentity, SourcePlatform};

const RECORD_COLUMNS: &str = "id, name, description, schema_content, tags, domain, validated, \
     popularity, source_url, source_platform, file_type, repository, stars, created_at";

pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Listing sort order. Every order ends with name, then ID, so it is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Popularity,
    Name,
    CreatedAt,
}

impl SortBy {
    fn order_clause(&self) -> &'static str {
        match self {
            SortBy::Popularity => "popularity DESC, name ASC, id ASC",
            SortBy::Name => "name ASC, id ASC",
            SortBy::CreatedAt => "created_at DESC, name ASC, id ASC",
        }
    }
}

impl FromStr for SortBy {
    type Err = PlaygroundError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "popularity" | "popular" => Ok(SortBy::Popularity),
            "name" => Ok(SortBy::Name),
            "created_at" | "created" | "recent" => Ok(SortBy::CreatedAt),
            other => Err(PlaygroundError::InvalidRequest(format!(
                "unknown sort_by '{}' (expected popularity, name or created_at)",
                other
            ))),
        }
    }
}

/// Catalog listing criteria. All present criteria must hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogFilter {
    /// `None` or "all" means every domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// Every tag must be present (case-insensitive).
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub validated: Option<bool>,
    #[serde(default)]
    pub sort_by: SortBy,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

impl Default for CatalogFilter {
    fn default() -> Self {
        Self {
            domain: None,
            tags: Vec::new(),
            validated: None,
            sort_by: SortBy::default(),
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

/// Thread-safe catalog store.
pub struct CatalogStore {
    conn: Mutex<Connection>,
}

impl CatalogStore {
    /// Open or create the catalog database.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::initialize_schema(&conn)?;
        tracing::info!("Catalog opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a closure with access to the database connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| {
            PlaygroundError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(format!("Lock poisoned: {}", e)),
            ))
        })?;
        f(&conn)
    }

    /// Connectivity check for the health endpoint.
    pub fn ping(&self) -> bool {
        self.with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
            .is_ok()
    }

    pub fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM mcps", [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }

    /// List catalog records matching every criterion of `filter`.
    pub fn list(&self, filter: &CatalogFilter) -> Result<Vec<McpRecord>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<SqlValue> = Vec::new();

        if let Some(domain) = filter
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("all"))
        {
            clauses.push("lower(domain) = lower(?)");
            params.push(SqlValue::Text(domain.to_string()));
        }
        for tag in filter.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            clauses.push(
                "EXISTS (SELECT 1 FROM json_each(mcps.tags) WHERE lower(json_each.value) = lower(?))",
            );
            params.push(SqlValue::Text(tag.to_string()));
        }
        if let Some(validated) = filter.validated {
            clauses.push("validated = ?");
            params.push(SqlValue::Integer(validated as i64));
        }

        let mut sql = format!("SELECT {} FROM mcps", RECORD_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY {} LIMIT ?", filter.sort_by.order_clause()));
        params.push(SqlValue::Integer(filter.limit as i64));

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(params), row_to_record)?;
            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
    }

    pub fn get(&self, id: &str) -> Result<Option<McpRecord>> {
        self.with_conn(|conn| get_record(conn, id))
    }

    /// Look up a record by source URL (compared in normalized form).
    pub fn find_by_source_url(&self, source_url: &str) -> Result<Option<McpRecord>> {
        let normalized = normalize_source_url(source_url);
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {} FROM mcps WHERE source_url = ?1", RECORD_COLUMNS),
                    rusqlite::params![normalized],
                    row_to_record,
                )
                .optional()?)
        })
    }

    /// Delete a record. Returns whether it existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM mcps WHERE id = ?1", rusqlite::params![id])?;
            Ok(n > 0)
        })
    }

    /// Bump popularity by one usage. Returns the updated record.
    pub fn record_usage(&self, id: &str) -> Result<Option<McpRecord>> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE mcps SET popularity = popularity + 1 WHERE id = ?1",
                rusqlite::params![id],
            )?;
            if n == 0 {
                return Ok(None);
            }
            get_record(conn, id)
        })
    }

    /// Persist a web-discovered record into the catalog.
    ///
    /// Idempotent on normalized source URL: a known URL returns the existing
    /// record with popularity bumped by one, without re-validating. A new
    /// record starts at `popularity_seed` and is validated only when
    /// `auto_validate` is set. Returns the stored record and whether it was
    /// newly created.
    pub fn import_from_web(
        &self,
        record: &McpRecord,
        auto_validate: bool,
        popularity_seed: i64,
    ) -> Result<(McpRecord, bool)> {
        let source_url = record.source_url().ok_or_else(|| {
            PlaygroundError::InvalidRequest("record has no source URL to import".into())
        })?;
        let normalized = normalize_source_url(source_url);
        let validated = auto_validate && is_well_formed(record.schema.as_ref());
        let tags = serde_json::to_string(&record.tags)?;
        let schema_content = record
            .schema
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM mcps WHERE source_url = ?1",
                    rusqlite::params![normalized],
                    |row| row.get(0),
                )
                .optional()?;

            let (id, created) = match existing {
                Some(id) => {
                    tx.execute(
                        "UPDATE mcps SET popularity = popularity + 1 WHERE id = ?1",
                        rusqlite::params![id],
                    )?;
                    (id, false)
                }
                None => {
                    let id = catalog_id(&record.name, &normalized);
                    tx.execute(
                        "INSERT INTO mcps (id, name, description, schema_content, tags, domain,
                                           validated, popularity, source_url, source_platform,
                                           file_type, repository, stars)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                         ON CONFLICT(source_url) DO UPDATE SET popularity = popularity + 1",
                        rusqlite::params![
                            id,
                            record.name,
                            record.description,
                            schema_content,
                            tags,
                            record.domain,
                            validated,
                            popularity_seed,
                            normalized,
                            record.source_platform.as_str(),
                            record.file_type,
                            record.repository,
                            record.stars.map(|s| s as i64),
                        ],
                    )?;
                    (id, true)
                }
            };

            let stored = get_record(&tx, &id)?.ok_or_else(|| {
                PlaygroundError::NotFound(format!("catalog record {} vanished during import", id))
            })?;
            tx.commit()?;
            Ok((stored, created))
        })
    }

    /// Insert the built-in samples. Existing rows are left untouched so a
    /// restart never resets popularity. Returns the number inserted.
    pub fn seed_samples(&self) -> Result<usize> {
        let samples = samples::sample_mcps()?;
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut inserted = 0;
            for sample in &samples {
                inserted += tx.execute(
                    "INSERT OR IGNORE INTO mcps (id, name, description, schema_content, tags,
                                                 domain, validated, popularity, source_platform,
                                                 file_type)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'json')",
                    rusqlite::params![
                        sample.id,
                        sample.name,
                        sample.description,
                        serde_json::to_string(&sample.schema)?,
                        serde_json::to_string(&sample.tags)?,
                        sample.domain,
                        sample.validated,
                        sample.popularity,
                        sample.source_platform,
                    ],
                )?;
            }
            tx.commit()?;
            if inserted > 0 {
                tracing::info!("Seeded {} sample MCPs", inserted);
            }
            Ok(inserted)
        })
    }

    pub fn save_search(&self, search: &SavedSearch) -> Result<()> {
        let (kind, criteria) = match search.query() {
            SavedQuery::Web(request) => ("web", serde_json::to_string(request)?),
            SavedQuery::Catalog(filter) => ("catalog", serde_json::to_string(filter)?),
        };
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO saved_searches (id, name, kind, criteria, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![search.id(), search.name(), kind, criteria, search.created_at()],
            )?;
            Ok(())
        })
    }

    pub fn list_saved_searches(&self) -> Result<Vec<SavedSearch>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, kind, criteria, created_at FROM saved_searches
                 ORDER BY created_at DESC, name ASC, id ASC",
            )?;
            let rows = stmt.query_map([], saved_search_row)?;
            let mut searches = Vec::new();
            for row in rows {
                let (id, name, kind, criteria, created_at) = row?;
                match decode_saved_query(&kind, &criteria) {
                    Ok(query) => searches.push(SavedSearch::restore(id, name, query, created_at)),
                    Err(e) => tracing::warn!("Skipping unreadable saved search {}: {}", id, e),
                }
            }
            Ok(searches)
        })
    }

    pub fn get_saved_search(&self, id: &str) -> Result<Option<SavedSearch>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, kind, criteria, created_at FROM saved_searches WHERE id = ?1",
                    rusqlite::params![id],
                    saved_search_row,
                )
                .optional()?;
            match row {
                Some((id, name, kind, criteria, created_at)) => {
                    let query = decode_saved_query(&kind, &criteria)?;
                    Ok(Some(SavedSearch::restore(id, name, query, created_at)))
                }
                None => Ok(None),
            }
        })
    }
}

type SavedSearchRow = (String, String, String, String, String);

fn saved_search_row(row: &Row<'_>) -> rusqlite::Result<SavedSearchRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode_saved_query(kind: &str, criteria: &str) -> Result<SavedQuery> {
    match kind {
        "web" => Ok(SavedQuery::Web(serde_json::from_str(criteria)?)),
        "catalog" => Ok(SavedQuery::Catalog(serde_json::from_str(criteria)?)),
        other => Err(PlaygroundError::InvalidRequest(format!(
            "unknown saved search kind '{}'",
            other
        ))),
    }
}

fn get_record(conn: &Connection, id: &str) -> Result<Option<McpRecord>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM mcps WHERE id = ?1", RECORD_COLUMNS),
            rusqlite::params![id],
            row_to_record,
        )
        .optional()?)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<McpRecord> {
    let tags: String = row.get(4)?;
    let schema: Option<String> = row.get(3)?;
    let platform: String = row.get(9)?;
    let stars: Option<i64> = row.get(12)?;

    Ok(McpRecord {
        identity: RecordIdentity::Catalog(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        domain: row.get(5)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        validated: row.get(6)?,
        confidence_score: None,
        popularity: Some(row.get(7)?),
        source_platform: platform.parse().unwrap_or(SourcePlatform::Catalog),
        schema: schema.and_then(|s| serde_json::from_str(&s).ok()),
        file_type: row.get(10)?,
        repository: row.get(11)?,
        stars: stars.map(|s| s.max(0) as u64),
        imported_from: row.get(8)?,
        created_at: Some(row.get(13)?),
    })
}

/// Stable catalog ID: a slug of the name plus a short hash of the normalized
/// source URL.
pub fn catalog_id(name: &str, normalized_url: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let mut slug: String = slug.trim_matches('-').chars().take(40).collect();
    if slug.is_empty() {
        slug.push_str("mcp");
    }

    let digest = hex::encode(Sha256::digest(normalized_url.as_bytes()));
    format!("{}-{}", slug.trim_end_matches('-'), &digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather_record() -> McpRecord {
        let mut record = McpRecord::discovered(
            "https://github.com/x/weather-mcp",
            SourcePlatform::Github,
            "weather-mcp",
            "Weather forecasts",
        );
        record.domain = "weather".into();
        record.tags = vec!["weather".into(), "api".into()];
        record.schema = Some(json!({
            "name": "weather-mcp",
            "tools": [{ "name": "get_forecast" }]
        }));
        record.file_type = "json".into();
        record.stars = Some(42);
        record.confidence_score = Some(0.8);
        record
    }

    fn store_with_samples() -> CatalogStore {
        let store = CatalogStore::open_in_memory().unwrap();
        store.seed_samples().unwrap();
        store
    }

    #[test]
    fn test_import_assigns_catalog_identity() {
        let store = CatalogStore::open_in_memory().unwrap();
        let (stored, created) = store.import_from_web(&weather_record(), true, 50).unwrap();

        assert!(created);
        assert!(stored.catalog_id().unwrap().starts_with("weather-mcp-"));
        assert_eq!(stored.popularity, Some(50));
        assert!(stored.confidence_score.is_none());
        assert!(stored.validated);
        assert_eq!(stored.source_url(), Some("https://github.com/x/weather-mcp"));
        assert_eq!(stored.stars, Some(42));
        assert_eq!(stored.tags, vec!["weather", "api"]);
        assert!(stored.created_at.is_some());
    }

    #[test]
    fn test_import_is_idempotent_on_source_url() {
        let store = CatalogStore::open_in_memory().unwrap();
        let (first, _) = store.import_from_web(&weather_record(), true, 50).unwrap();

        let mut again = weather_record();
        again.identity = RecordIdentity::Web("http://www.github.com/X/weather-mcp/".into());
        let (second, created) = store.import_from_web(&again, true, 50).unwrap();

        assert!(!created);
        assert_eq!(first.catalog_id(), second.catalog_id());
        assert_eq!(second.popularity, Some(51));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_import_without_auto_validate() {
        let store = CatalogStore::open_in_memory().unwrap();
        let (stored, _) = store.import_from_web(&weather_record(), false, 50).unwrap();
        assert!(!stored.validated);
    }

    #[test]
    fn test_import_malformed_schema_is_not_validated() {
        let store = CatalogStore::open_in_memory().unwrap();
        let mut record = weather_record();
        record.schema = Some(json!({ "name": "broken", "tools": [] }));
        let (stored, created) = store.import_from_web(&record, true, 50).unwrap();
        assert!(created);
        assert!(!stored.validated);
    }

    #[test]
    fn test_import_requires_source_url() {
        let store = CatalogStore::open_in_memory().unwrap();
        let mut record = weather_record();
        record.identity = RecordIdentity::Catalog("x".into());
        assert!(matches!(
            store.import_from_web(&record, true, 50),
            Err(PlaygroundError::InvalidRequest(_))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_seed_samples_is_idempotent() {
        let store = store_with_samples();
        assert_eq!(store.count().unwrap(), 8);

        store.record_usage("weather-mcp-001").unwrap();
        assert_eq!(store.seed_samples().unwrap(), 0);
        let weather = store.get("weather-mcp-001").unwrap().unwrap();
        assert_eq!(weather.popularity, Some(96));
    }

    #[test]
    fn test_list_sorted_by_popularity() {
        let store = store_with_samples();
        let records = store.list(&CatalogFilter::default()).unwrap();
        assert_eq!(records.len(), 8);
        assert_eq!(records[0].name, "weather.forecast");
        assert!(records
            .windows(2)
            .all(|w| w[0].popularity >= w[1].popularity));
    }

    #[test]
    fn test_list_sorted_by_name() {
        let store = store_with_samples();
        let records = store
            .list(&CatalogFilter {
                sort_by: SortBy::Name,
                ..CatalogFilter::default()
            })
            .unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_list_sorted_by_created_at() {
        let store = store_with_samples();
        store.with_conn(|conn| {
            conn.execute(
                "UPDATE mcps SET created_at = '2030-01-01T00:00:00.000Z' WHERE id = 'calc-mcp-003'",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        let records = store
            .list(&CatalogFilter {
                sort_by: SortBy::CreatedAt,
                ..CatalogFilter::default()
            })
            .unwrap();
        assert_eq!(records[0].catalog_id(), Some("calc-mcp-003"));
    }

    #[test]
    fn test_list_filters_are_conjunctive() {
        let store = store_with_samples();
        store.import_from_web(&weather_record(), false, 10).unwrap();

        let weather = store
            .list(&CatalogFilter {
                domain: Some("Weather".into()),
                ..CatalogFilter::default()
            })
            .unwrap();
        assert_eq!(weather.len(), 2);

        let validated_weather = store
            .list(&CatalogFilter {
                domain: Some("weather".into()),
                validated: Some(true),
                ..CatalogFilter::default()
            })
            .unwrap();
        assert_eq!(validated_weather.len(), 1);
        assert_eq!(validated_weather[0].name, "weather.forecast");

        let tagged = store
            .list(&CatalogFilter {
                tags: vec!["WEATHER".into(), "forecast".into()],
                ..CatalogFilter::default()
            })
            .unwrap();
        assert_eq!(tagged.len(), 1);

        let all = store
            .list(&CatalogFilter {
                domain: Some("all".into()),
                limit: 3,
                ..CatalogFilter::default()
            })
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_get_delete_and_usage() {
        let store = store_with_samples();
        assert!(store.get("missing").unwrap().is_none());
        assert!(store.record_usage("missing").unwrap().is_none());

        let used = store.record_usage("ai-mcp-007").unwrap().unwrap();
        assert_eq!(used.popularity, Some(94));
        assert_eq!(used.source_platform, SourcePlatform::Huggingface);

        assert!(store.delete("ai-mcp-007").unwrap());
        assert!(!store.delete("ai-mcp-007").unwrap());
        assert_eq!(store.count().unwrap(), 7);
    }

    #[test]
    fn test_find_by_source_url() {
        let store = CatalogStore::open_in_memory().unwrap();
        store.import_from_web(&weather_record(), true, 50).unwrap();
        assert!(store
            .find_by_source_url("https://github.com/x/weather-mcp.git")
            .unwrap()
            .is_some());
        assert!(store
            .find_by_source_url("https://github.com/x/other")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_sort_by_parsing() {
        assert_eq!("name".parse::<SortBy>().unwrap(), SortBy::Name);
        assert_eq!("created_at".parse::<SortBy>().unwrap(), SortBy::CreatedAt);
        assert!("stars".parse::<SortBy>().is_err());
    }

    #[test]
    fn test_catalog_id_is_stable() {
        let a = catalog_id("Weather MCP!", "https://github.com/x/weather-mcp");
        let b = catalog_id("Weather MCP!", "https://github.com/x/weather-mcp");
        assert_eq!(a, b);
        assert!(a.starts_with("weather-mcp-"));
        assert_eq!(a.len(), "weather-mcp-".len() + 8);
        assert!(catalog_id("***", "u").starts_with("mcp-"));
    }
}
