//! Configuration loading from TOML files
//!
//! Every setting has a default, so a missing config file still yields a
//! runnable local setup. Parse failures abort before any I/O happens.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// Global configuration for papercode
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub warehouse: WarehouseConfig,
    pub source: SourceConfig,
    pub storage: StorageConfig,
    pub github: GithubConfig,
    pub throttle: ThrottleConfig,
    pub pipeline: PipelineConfig,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub path: PathBuf,
    pub catalog_dataset: String,
    pub archive_dataset: String,
    /// Externally maintained push-event source table
    pub archive_source: String,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./papercode.duckdb"),
            catalog_dataset: "papers_and_code".to_string(),
            archive_dataset: "gha".to_string(),
            archive_source: "gharchive.events".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL serving the two fixed gzip JSON dumps
    pub base_url: String,
    /// Paginated catalog REST API
    pub api_url: String,
    pub items_per_page: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://production-media.paperswithcode.com/about".to_string(),
            api_url: "https://paperswithcode.com/api/v1".to_string(),
            items_per_page: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub bucket: String,
    pub papers_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data"),
            bucket: "papercode-lake".to_string(),
            papers_dir: "papers_and_code".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub token: Option<String>,
    pub max_retries: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token: std::env::var("GITHUB_TOKEN").ok(),
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Repository fetches admitted per interval
    pub max_requests: usize,
    pub interval_secs: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_requests: 2,
            interval_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Start of the full historical range on bootstrap runs
    pub start_date: NaiveDate,
    pub transfer_settle_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid date"),
            transfer_settle_secs: 180,
        }
    }
}

/// Cron expressions for the external scheduler; carried as configuration,
/// never executed here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub catalog_cron: String,
    pub pipeline_cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            catalog_cron: "0 6 * * 1".to_string(),
            pipeline_cron: "0 6 * * *".to_string(),
        }
    }
}

/// Deserialize a string that may contain an environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./papercode.toml (current directory)
    /// 2. ~/.config/papercode/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("papercode.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "papercode") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
