use crate::engine::FilterList;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Root for everything written to disk. Filter caches go to `<data_dir>/filters`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub filters: FiltersConfig,

    #[serde(default)]
    pub video: VideoConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub updates: UpdateConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FiltersConfig {
    #[serde(default = "default_staleness_days")]
    pub staleness_days: u64,
    #[serde(default = "default_filter_lists")]
    pub lists: HashMap<String, FilterListConfig>,
    /// Upper bound on how long early requests wait for the first rule build.
    #[serde(default = "default_init_wait_ms")]
    pub init_wait_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FilterListConfig {
    pub url: String,
    pub file_name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_list_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VideoConfig {
    /// Cancel recognised ad streams on the video CDN. Can break playback.
    #[serde(default = "default_aggressive_adblock")]
    pub aggressive_adblock: bool,
    #[serde(default = "default_inject_dom_cleaner")]
    pub inject_dom_cleaner: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpdateConfig {
    /// 0 keeps the rules built at startup for the whole process lifetime.
    #[serde(default)]
    pub interval_hours: u64,
    #[serde(default = "default_concurrent_downloads")]
    pub concurrent_downloads: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_enable")]
    pub enable: bool,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_blocked")]
    pub log_blocked: bool,
    #[serde(default)]
    pub log_all_requests: bool,
    #[serde(default = "default_decision_log_sinks")]
    pub decision_log_sinks: Vec<String>,
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enable")]
    pub enable: bool,
    #[serde(default = "default_log_interval")]
    pub log_interval_seconds: u64,
}

// Defaults
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_staleness_days() -> u64 {
    7
}
fn default_init_wait_ms() -> u64 {
    2000
}
fn default_list_enabled() -> bool {
    true
}
fn default_aggressive_adblock() -> bool {
    true
}
fn default_inject_dom_cleaner() -> bool {
    true
}
fn default_user_agent() -> String {
    concat!("adsieve/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_concurrent_downloads() -> usize {
    2
}
fn default_log_enable() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_log_blocked() -> bool {
    true
}
fn default_decision_log_sinks() -> Vec<String> {
    vec!["console".to_string()]
}
fn default_memory_capacity() -> usize {
    100
}
fn default_stats_enable() -> bool {
    true
}
fn default_log_interval() -> u64 {
    300
}
fn default_filter_lists() -> HashMap<String, FilterListConfig> {
    let mut m = HashMap::new();
    m.insert(
        "easylist".to_string(),
        FilterListConfig {
            url: "https://easylist.to/easylist/easylist.txt".to_string(),
            file_name: "easylist.txt".to_string(),
            label: Some("EasyList".to_string()),
            enabled: true,
        },
    );
    m.insert(
        "easyprivacy".to_string(),
        FilterListConfig {
            url: "https://easylist.to/easylist/easyprivacy.txt".to_string(),
            file_name: "easyprivacy.txt".to_string(),
            label: Some("EasyPrivacy".to_string()),
            enabled: true,
        },
    );
    // Regional list ships switched off.
    m.insert(
        "easylist_japan".to_string(),
        FilterListConfig {
            url: "https://easylist.to/easylist/easylistjapan.txt".to_string(),
            file_name: "easylist_jp.txt".to_string(),
            label: Some("EasyList Japan".to_string()),
            enabled: false,
        },
    );
    m
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            filters: FiltersConfig::default(),
            video: VideoConfig::default(),
            http: HttpConfig::default(),
            updates: UpdateConfig::default(),
            logging: LoggingConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            staleness_days: default_staleness_days(),
            lists: default_filter_lists(),
            init_wait_ms: default_init_wait_ms(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            aggressive_adblock: default_aggressive_adblock(),
            inject_dom_cleaner: default_inject_dom_cleaner(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: None,
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            interval_hours: 0,
            concurrent_downloads: default_concurrent_downloads(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable: default_log_enable(),
            level: default_log_level(),
            format: default_log_format(),
            log_blocked: default_log_blocked(),
            log_all_requests: false,
            decision_log_sinks: default_decision_log_sinks(),
            memory_capacity: default_memory_capacity(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enable: default_stats_enable(),
            log_interval_seconds: default_log_interval(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse config TOML")
    }

    pub fn filters_dir(&self) -> PathBuf {
        self.data_dir.join("filters")
    }

    pub fn staleness_threshold(&self) -> Duration {
        Duration::from_secs(self.filters.staleness_days.saturating_mul(24 * 60 * 60))
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.updates.interval_hours > 0)
            .then(|| Duration::from_secs(self.updates.interval_hours.saturating_mul(3600)))
    }

    pub fn init_wait(&self) -> Duration {
        Duration::from_millis(self.filters.init_wait_ms)
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        self.http.timeout_secs.map(Duration::from_secs)
    }

    /// Resolves the configured lists into cache locations, ordered by name
    /// so rule concatenation order is stable across runs.
    pub fn get_filter_lists_sorted(&self) -> Vec<FilterList> {
        let dir = self.filters_dir();
        let max_age = self.staleness_threshold();
        let mut lists: Vec<FilterList> = self
            .filters
            .lists
            .iter()
            .map(|(name, list)| FilterList {
                name: name.clone(),
                label: list.label.clone().unwrap_or_else(|| name.clone()),
                url: list.url.clone(),
                path: dir.join(&list.file_name),
                max_age,
                enabled: list.enabled,
            })
            .collect();
        lists.sort_by(|a, b| a.name.cmp(&b.name));
        lists
    }
}
