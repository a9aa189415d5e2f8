use rusqlite::Connection;

use crate::error::Result;

/// Initialize the catalog schema.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- One row per catalogued MCP. source_url is NULL for built-in samples.
        CREATE TABLE IF NOT EXISTS mcps (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            schema_content TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            domain TEXT NOT NULL DEFAULT 'general',
            validated INTEGER NOT NULL DEFAULT 0,
            popularity INTEGER NOT NULL DEFAULT 0,
            source_url TEXT UNIQUE,
            source_platform TEXT NOT NULL DEFAULT 'catalog',
            file_type TEXT NOT NULL DEFAULT 'json',
            repository TEXT,
            stars INTEGER,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        -- Immutable query snapshots; criteria is the serialized query
        CREATE TABLE IF NOT EXISTS saved_searches (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            criteria TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_mcps_domain ON mcps(domain);
        CREATE INDEX IF NOT EXISTS idx_mcps_popularity ON mcps(popularity);
        CREATE INDEX IF NOT EXISTS idx_mcps_created_at ON mcps(created_at);

        PRAGMA journal_mode=WAL;
        ",
    )?;

    Ok(())
}
