use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::metrics::{NOT_RUNNING_METRIC, RUNNING_METRIC};
use crate::providers::circleci;
use crate::sinks;

/// Configuration file structure for QueueLens.
///
/// Holds the same settings as the command line; flags override file values.
/// Configuration files are loaded from the current directory, the user
/// configuration directory, or a specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// CircleCI source settings
    #[serde(default)]
    pub circleci: CircleCiConfig,

    /// Datadog destination settings
    #[serde(default)]
    pub datadog: DatadogConfig,

    /// Polling schedule
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Queue aggregation settings
    #[serde(default)]
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CircleCiConfig {
    /// CircleCI personal API token
    pub token: Option<String>,

    /// CircleCI instance base URL
    #[serde(default = "default_circleci_base_url")]
    pub base_url: String,

    /// Number of recent builds requested per poll
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatadogConfig {
    /// Datadog API key
    pub api_key: Option<String>,

    /// Datadog API base URL (e.g. https://api.datadoghq.eu for the EU site)
    #[serde(default = "default_datadog_base_url")]
    pub base_url: String,

    /// Metric name for running jobs
    #[serde(default = "default_running_metric")]
    pub running_metric: String,

    /// Metric name for jobs waiting to run
    #[serde(default = "default_not_running_metric")]
    pub not_running_metric: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScheduleConfig {
    /// Seconds between polls
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Poll once and exit
    #[serde(default)]
    pub once: bool,

    /// Upper bound on cycles in flight; unbounded when unset
    #[serde(default)]
    pub max_concurrent_cycles: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QueueConfig {
    /// Accounts whose jobs are counted; empty means all
    #[serde(default)]
    pub usernames: Vec<String>,

    /// Report a zero for the opposite lifecycle of every queue seen
    #[serde(default = "default_zero_fill")]
    pub zero_fill: bool,
}

impl Default for CircleCiConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_circleci_base_url(),
            limit: default_limit(),
        }
    }
}

impl Default for DatadogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_datadog_base_url(),
            running_metric: default_running_metric(),
            not_running_metric: default_not_running_metric(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            once: false,
            max_concurrent_cycles: None,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            usernames: Vec::new(),
            zero_fill: default_zero_fill(),
        }
    }
}

fn default_circleci_base_url() -> String {
    circleci::DEFAULT_BASE_URL.to_string()
}

fn default_datadog_base_url() -> String {
    sinks::DEFAULT_BASE_URL.to_string()
}

fn default_limit() -> usize {
    circleci::DEFAULT_LIMIT
}

fn default_running_metric() -> String {
    RUNNING_METRIC.to_string()
}

fn default_not_running_metric() -> String {
    NOT_RUNNING_METRIC.to_string()
}

fn default_interval() -> u64 {
    60
}

fn default_zero_fill() -> bool {
    true
}

const CANDIDATES: [&str; 4] = [
    "queuelens.toml",
    "queuelens.json",
    "queuelens.yaml",
    "queuelens.yml",
];

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./queuelens.toml
    /// 3. ./queuelens.json
    /// 4. ./queuelens.yaml
    /// 5. ./queuelens.yml
    /// 6. `<config dir>/queuelens/queuelens.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                log::warn!("Config file not found: {}, using defaults", path.display());
                return Ok(Self::default());
            }
            return Self::load_from_path(path);
        }

        let found = CANDIDATES
            .iter()
            .map(PathBuf::from)
            .chain(user_config_file())
            .find(|path| path.exists());

        match found {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        log::debug!("Loading config from {}", path.display());

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }
}

fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("queuelens").join("queuelens.toml"))
}
