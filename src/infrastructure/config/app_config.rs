//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::services::{DEFAULT_CONCURRENT_LIMIT, DEFAULT_IDEAL_TOTAL};
use crate::infrastructure::image::http_fetcher::DEFAULT_TIMEOUT_SECS;
use crate::infrastructure::image::memory_cache::{DEFAULT_MAX_BYTES, DEFAULT_MAX_ENTRIES};

pub(crate) const APP_NAME: &str = "stock-search";
pub(crate) const APP_QUALIFIER: &str = "org";
pub(crate) const APP_ORGANIZATION: &str = "stock-search";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, from `config.toml` overlaid with CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Search fan-out settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Thumbnail cache limits.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Attachment download settings.
    #[serde(default)]
    pub download: DownloadConfig,
}

/// Search configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum number of provider calls in flight.
    #[serde(default = "default_concurrent_limit")]
    pub concurrent_limit: usize,

    /// Results wanted from the first round across all providers.
    #[serde(default = "default_ideal_total")]
    pub ideal_total: usize,

    /// Provider identifiers excluded from searches.
    #[serde(default)]
    pub disabled_providers: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: DEFAULT_CONCURRENT_LIMIT,
            ideal_total: DEFAULT_IDEAL_TOTAL,
            disabled_providers: Vec::new(),
        }
    }
}

/// Thumbnail cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Budget for decoded pixel data in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Attachment download configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Where finished attachments are placed. Defaults to the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_dir: Option<PathBuf>,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            attachment_dir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

const fn default_concurrent_limit() -> usize {
    DEFAULT_CONCURRENT_LIMIT
}

const fn default_ideal_total() -> usize {
    DEFAULT_IDEAL_TOTAL
}

const fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

const fn default_max_bytes() -> usize {
    DEFAULT_MAX_BYTES
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

use super::args::CliArgs;

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(limit) = args.concurrent_limit {
            self.search.concurrent_limit = limit;
        }
        if let Some(ideal_total) = args.ideal_total {
            self.search.ideal_total = ideal_total;
        }
        if let Some(dir) = &args.attachment_dir {
            self.download.attachment_dir = Some(dir.clone());
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default data directory, home of the photo lists.
    #[must_use]
    pub fn default_data_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        Self::default_data_dir().map(|dir| dir.join("stock-search.log"))
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }

    /// Returns the directory finished downloads go to.
    #[must_use]
    pub fn effective_attachment_dir(&self) -> Option<PathBuf> {
        self.download
            .attachment_dir
            .clone()
            .or_else(|| Self::default_data_dir().map(|dir| dir.join("attachments")))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            log_level: LogLevel::Info,
            search: SearchConfig::default(),
            cache: CacheConfig::default(),
            download: DownloadConfig::default(),
        }
    }
}
