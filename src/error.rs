use thiserror::Error;

use crate::record::SourcePlatform;

#[derive(Error, Debug)]
pub enum PlaygroundError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{platform} adapter error: {message}")]
    Adapter {
        platform: SourcePlatform,
        message: String,
    },

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PlaygroundError {
    pub fn adapter(platform: SourcePlatform, message: impl Into<String>) -> Self {
        Self::Adapter {
            platform,
            message: message.into(),
        }
    }
}

impl serde::Serialize for PlaygroundError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlaygroundError>;
