//! Error types for the order resolver.

use std::path::PathBuf;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors loading or validating a reference table document.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Failed to read {table} from {path}: {source}")]
    Io {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {table} from {path}: {source}")]
    Json {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid pattern for {item_type}.{attribute}: {source}")]
    InvalidPattern {
        item_type: String,
        attribute: String,
        #[source]
        source: regex::Error,
    },

    #[error("Inconsistent reference tables: {}", problems.join("; "))]
    Inconsistent { problems: Vec<String> },
}

/// Catalog loading errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to open catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed catalog row: {0}")]
    Csv(#[from] csv::Error),

    #[error("Catalog header has no column named {column:?}")]
    MissingColumn { column: String },

    #[error("Catalog is empty")]
    Empty,
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-line resolution errors. Never fatal for a batch.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Line {index} has an empty name")]
    EmptyName { index: usize },
}
