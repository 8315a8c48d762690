//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::catalog::CatalogColumns;
use crate::error::ConfigError;
use crate::fallback::FallbackOrder;
use crate::llm::yandex::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
use crate::parser::MaterialPolicy;
use crate::reference::TablePaths;

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Reference table documents.
    pub tables: TablePaths,
    /// Tab-separated catalog export.
    pub catalog_path: PathBuf,
    pub catalog_columns: CatalogColumns,
    pub fallback_order: FallbackOrder,
    pub material_policy: MaterialPolicy,
    /// Directory for the rolling log file.
    pub log_dir: PathBuf,
    /// Start even when the reference tables are inconsistent.
    pub skip_validation: bool,
}

impl ResolverConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
        };

        let tables = TablePaths {
            synonyms: required("RESOLVER_SYNONYMS_PATH")?,
            regex: required("RESOLVER_REGEX_PATH")?,
            parameters: required("RESOLVER_PARAMETERS_PATH")?,
            materials: get("RESOLVER_MATERIALS_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        };
        let catalog_path = required("RESOLVER_CATALOG_PATH")?;

        let defaults = CatalogColumns::default();
        let catalog_columns = CatalogColumns {
            code: get("RESOLVER_CATALOG_CODE_COLUMN").unwrap_or(defaults.code),
            name: get("RESOLVER_CATALOG_NAME_COLUMN").unwrap_or(defaults.name),
        };

        let fallback_order = match get("RESOLVER_FALLBACK_ORDER") {
            Some(v) => v.parse().map_err(|message| ConfigError::InvalidValue {
                key: "RESOLVER_FALLBACK_ORDER".to_string(),
                message,
            })?,
            None => FallbackOrder::default(),
        };

        let material_policy = match get("RESOLVER_MATERIAL_ALIASES") {
            Some(v) => v.parse().map_err(|message| ConfigError::InvalidValue {
                key: "RESOLVER_MATERIAL_ALIASES".to_string(),
                message,
            })?,
            None => MaterialPolicy::default(),
        };

        let log_dir = get("RESOLVER_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("logs"));

        let skip_validation = get("RESOLVER_SKIP_VALIDATION")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            tables,
            catalog_path,
            catalog_columns,
            fallback_order,
            material_policy,
            log_dir,
            skip_validation,
        })
    }
}

/// YandexGPT connection settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub model_uri: String,
    pub api_key: SecretString,
    pub timeout: Duration,
}

impl LlmSettings {
    /// Build settings from environment variables.
    /// Returns `None` if `YANDEX_GPT_API_KEY` is not set (AI extraction disabled).
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, ConfigError> {
        let Some(api_key) = get("YANDEX_GPT_API_KEY").filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        let model_uri = get("YANDEX_GPT_MODEL_URI")
            .ok_or_else(|| ConfigError::MissingEnvVar("YANDEX_GPT_MODEL_URI".to_string()))?;
        let endpoint =
            get("YANDEX_GPT_API_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let timeout = match get("YANDEX_GPT_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::InvalidValue {
                    key: "YANDEX_GPT_TIMEOUT_SECS".to_string(),
                    message: format!("{e}"),
                })?,
            None => DEFAULT_TIMEOUT,
        };

        Ok(Some(Self {
            endpoint,
            model_uri,
            api_key: SecretString::from(api_key),
            timeout,
        }))
    }
}
