//! Configuration for turf-form.

use serde::{Deserialize, Serialize};

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

fn default_database_path() -> String {
    "data/carreras.db".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// One workbook sheet to ingest. The label is both the sheet name and the `dd-mm-yy`
/// meeting date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSheet {
    pub label: String,
    pub file: String,
}

impl SourceSheet {
    /// Parse a `LABEL=FILE` command line value
    pub fn parse_arg(value: &str) -> Result<Self, String> {
        match value.split_once('=') {
            Some((label, file)) if !label.trim().is_empty() && !file.trim().is_empty() => Ok(Self {
                label: label.trim().to_string(),
                file: file.trim().to_string(),
            }),
            _ => Err(format!("expected LABEL=FILE, got '{}'", value)),
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directories searched, in order, for source files that are not existing paths
    #[serde(default = "default_search_dirs")]
    pub search_dirs: Vec<String>,
    /// CSV file receiving rejected roster rows; empty disables the log
    #[serde(default = "default_rejection_log")]
    pub rejection_log: String,
    #[serde(default)]
    pub programs: Vec<SourceSheet>,
    #[serde(default)]
    pub results: Vec<SourceSheet>,
}

fn default_search_dirs() -> Vec<String> {
    vec![
        ".".to_string(),
        "programas".to_string(),
        "resultados".to_string(),
    ]
}

fn default_rejection_log() -> String {
    "rechazos_programa.csv".to_string()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            search_dirs: default_search_dirs(),
            rejection_log: default_rejection_log(),
            programs: Vec::new(),
            results: Vec::new(),
        }
    }
}

/// Lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Minimum similarity for "did you mean" suggestions
    #[serde(default = "default_suggestion_cutoff")]
    pub suggestion_cutoff: f64,
}

fn default_suggestion_cutoff() -> f64 {
    0.7
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            suggestion_cutoff: default_suggestion_cutoff(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("turf-form").required(false))
            // Override with environment variables (TURF_STORAGE__DATABASE_PATH, etc.)
            .add_source(
                config::Environment::with_prefix("TURF")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
