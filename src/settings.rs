//! Persistent service settings.
//!
//! Settings are stored as JSON (`$MCP_PLAYGROUND_CONFIG`, or
//! `<data_dir>/mcp-playground/settings.json`) and can be overridden from the
//! environment for container deployments.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::discovery::scoring::ScoringWeights;
use crate::record::SourcePlatform;

const APP_DIR: &str = "mcp-playground";

/// Service settings persisted to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// SQLite catalog file. Defaults to `<data_dir>/mcp-playground/catalog.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Master switch for web discovery. When off, searches return nothing.
    #[serde(default = "default_true")]
    pub scraping_enabled: bool,
    #[serde(default = "default_sources")]
    pub enabled_sources: Vec<SourcePlatform>,
    /// Per-adapter timeout for one search call.
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_secs: u64,
    /// Sustained outbound request rate shared by every source and schema lookup.
    #[serde(default = "default_outbound_rate")]
    pub outbound_requests_per_minute: u32,
    /// Requests allowed back to back before the sustained rate applies.
    #[serde(default = "default_outbound_burst")]
    pub outbound_burst: u32,
    /// Popularity assigned to a freshly imported record.
    #[serde(default = "default_popularity_seed")]
    pub import_popularity_seed: i64,
    #[serde(default = "default_true")]
    pub seed_samples: bool,
    #[serde(default)]
    pub github_token: Option<String>,
    /// Raw README URLs of curated awesome lists.
    #[serde(default = "default_awesome_lists")]
    pub awesome_lists: Vec<String>,
    #[serde(default)]
    pub scoring: ScoringWeights,
    /// Protocol comparison backend: "simulated" is the only built-in mode.
    #[serde(default = "default_playground_mode")]
    pub playground_mode: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

fn default_sources() -> Vec<SourcePlatform> {
    SourcePlatform::DISCOVERABLE.to_vec()
}

fn default_adapter_timeout() -> u64 {
    5
}

fn default_outbound_rate() -> u32 {
    30
}

fn default_outbound_burst() -> u32 {
    30
}

fn default_popularity_seed() -> i64 {
    50
}

fn default_awesome_lists() -> Vec<String> {
    vec![
        "https://raw.githubusercontent.com/modelcontextprotocol/servers/main/README.md".to_string(),
        "https://raw.githubusercontent.com/punkpeye/awesome-mcp-servers/main/README.md".to_string(),
    ]
}

fn default_playground_mode() -> String {
    "simulated".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: None,
            scraping_enabled: true,
            enabled_sources: default_sources(),
            adapter_timeout_secs: default_adapter_timeout(),
            outbound_requests_per_minute: default_outbound_rate(),
            outbound_burst: default_outbound_burst(),
            import_popularity_seed: default_popularity_seed(),
            seed_samples: true,
            github_token: None,
            awesome_lists: default_awesome_lists(),
            scoring: ScoringWeights::default(),
            playground_mode: default_playground_mode(),
        }
    }
}

impl Settings {
    /// Default settings file location.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("MCP_PLAYGROUND_CONFIG") {
            return PathBuf::from(path);
        }
        data_dir().join("settings.json")
    }

    /// Load settings from a JSON file. Returns defaults if file doesn't exist.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse settings file: {}, using defaults", e);
                Self::default()
            }),
            Err(_) => {
                tracing::info!("No settings file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Save settings to a JSON file.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Apply `HOST`, `PORT`, `DATABASE_PATH`, `GITHUB_TOKEN` and
    /// `MCP_PLAYGROUND_SCRAPING` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("HOST").filter(|h| !h.is_empty()) {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => tracing::warn!("Ignoring invalid PORT '{}'", port),
            }
        }
        if let Some(path) = lookup("DATABASE_PATH").filter(|p| !p.is_empty()) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(token) = lookup("GITHUB_TOKEN").filter(|t| !t.is_empty()) {
            self.github_token = Some(token);
        }
        if let Some(flag) = lookup("MCP_PLAYGROUND_SCRAPING") {
            match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.scraping_enabled = true,
                "0" | "false" | "no" | "off" => self.scraping_enabled = false,
                other => tracing::warn!("Ignoring invalid MCP_PLAYGROUND_SCRAPING '{}'", other),
            }
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| data_dir().join("catalog.db"))
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_secs(self.adapter_timeout_secs.max(1))
    }

    /// Enabled discoverable platforms, deduplicated, in declaration order.
    pub fn enabled_platforms(&self) -> Vec<SourcePlatform> {
        SourcePlatform::DISCOVERABLE
            .into_iter()
            .filter(|p| self.enabled_sources.contains(p))
            .collect()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr(), "127.0.0.1:8000");
        assert!(settings.scraping_enabled);
        assert_eq!(settings.enabled_platforms().len(), 4);
        assert_eq!(settings.adapter_timeout(), Duration::from_secs(5));
        assert_eq!(settings.import_popularity_seed, 50);
        assert_eq!(settings.playground_mode, "simulated");
        assert_eq!(settings.outbound_requests_per_minute, 30);
        assert_eq!(settings.outbound_burst, 30);
    }

    #[test]
    fn test_save_and_load() {
        let tmp = std::env::temp_dir().join("mcp_playground_test_settings.json");
        let settings = Settings {
            port: 9100,
            enabled_sources: vec![SourcePlatform::Github],
            ..Settings::default()
        };
        settings.save(&tmp).unwrap();

        let loaded = Settings::load(&tmp);
        assert_eq!(loaded.port, 9100);
        assert_eq!(loaded.enabled_platforms(), vec![SourcePlatform::Github]);

        let _ = std::fs::remove_file(&tmp);
    }

    #[test]
    fn test_load_missing_file() {
        let settings = Settings::load(&PathBuf::from("/nonexistent/settings.json"));
        assert_eq!(settings.port, 8000);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "port": 8080, "enabled_sources": ["web"] }"#).unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.host, "127.0.0.1");
        assert!(settings.scraping_enabled);
        assert_eq!(settings.enabled_platforms(), vec![SourcePlatform::Web]);
        assert_eq!(settings.outbound_requests_per_minute, 30);
        assert!(crate::discovery::fetch::outbound_quota(
            settings.outbound_requests_per_minute,
            settings.outbound_burst
        )
        .is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("DATABASE_PATH", "/tmp/catalog.db"),
            ("MCP_PLAYGROUND_SCRAPING", "off"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.bind_addr(), "0.0.0.0:9000");
        assert_eq!(settings.database_path(), PathBuf::from("/tmp/catalog.db"));
        assert!(!settings.scraping_enabled);
        assert!(settings.github_token.is_none());
    }

    #[test]
    fn test_invalid_port_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_overrides(|k| (k == "PORT").then(|| "not-a-port".to_string()));
        assert_eq!(settings.port, 8000);
    }

    #[test]
    fn test_enabled_platforms_skip_catalog_and_duplicates() {
        let settings = Settings {
            enabled_sources: vec![
                SourcePlatform::Awesome,
                SourcePlatform::Catalog,
                SourcePlatform::Github,
                SourcePlatform::Awesome,
            ],
            ..Settings::default()
        };
        assert_eq!(
            settings.enabled_platforms(),
            vec![SourcePlatform::Github, SourcePlatform::Awesome]
        );
    }
}
