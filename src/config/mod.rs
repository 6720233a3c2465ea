//! Configuration management for the herald engine
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Scheduling configuration
    pub scheduler: SchedulerConfig,

    /// Per-account run configuration
    pub runner: RunnerConfig,

    /// Content generation endpoint configuration
    pub generator: GeneratorConfig,

    /// Publishing endpoint configuration
    pub poster: PosterConfig,

    /// On-disk data layout
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Shared cron descriptor for batch firing (seconds granularity)
    pub cron: String,

    /// Arm one timer per account daily slot instead of the shared descriptor
    pub use_daily_slots: bool,

    /// Minimum gap between accounts inside a batch, minutes
    pub delay_min_minutes: u64,

    /// Maximum gap between accounts inside a batch, minutes
    pub delay_max_minutes: u64,
}

/// Per-account run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// When false, runs stop after generation and record a test skip
    pub posting_enabled: bool,
}

/// Content generation endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Completion server base URL
    pub endpoint: String,

    /// Model name passed to the completion endpoint
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Completion token budget per request
    pub max_tokens: u32,

    /// Client-side rate limit for completion requests
    pub requests_per_minute: u32,

    /// Retry attempts for transient completion failures
    pub max_retries: u32,

    /// Optional directory of per-account corpus files for voice reference
    pub corpus_dir: Option<PathBuf>,
}

/// Publishing endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PosterConfig {
    /// Publishing service base URL
    pub endpoint: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Verify TLS certificates on the publishing endpoint
    pub verify_tls: bool,
}

/// On-disk data layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for accounts, history, run flag, and images
    pub data_dir: PathBuf,
}

impl StorageConfig {
    #[must_use]
    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join("accounts.json")
    }

    #[must_use]
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.jsonl")
    }

    #[must_use]
    pub fn run_flag_path(&self) -> PathBuf {
        self.data_dir.join("run_flag.json")
    }

    #[must_use]
    pub fn images_root(&self) -> PathBuf {
        self.data_dir.join("images")
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let cron = std::env::var("HERALD_CRON").unwrap_or_else(|_| String::from(DEFAULT_CRON));

        let use_daily_slots = std::env::var("HERALD_USE_DAILY_SLOTS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        let delay_min_minutes = std::env::var("HERALD_DELAY_MIN_MINUTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(2);

        let delay_max_minutes = std::env::var("HERALD_DELAY_MAX_MINUTES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5);

        let posting_enabled = std::env::var("HERALD_POSTING_ENABLED")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        let generator_endpoint = std::env::var("HERALD_GENERATOR_ENDPOINT")
            .unwrap_or_else(|_| String::from("http://localhost:11434"));

        let generator_model =
            std::env::var("HERALD_GENERATOR_MODEL").unwrap_or_else(|_| String::from("gemma3n:e4b"));

        let generator_timeout_secs = std::env::var("HERALD_GENERATOR_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(120);

        let max_tokens = std::env::var("HERALD_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(700);

        let requests_per_minute = std::env::var("HERALD_REQUESTS_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(6);

        let max_retries = std::env::var("HERALD_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(3);

        let corpus_dir = std::env::var("HERALD_CORPUS_DIR").ok().map(PathBuf::from);

        let poster_endpoint = std::env::var("HERALD_POSTER_ENDPOINT")
            .unwrap_or_else(|_| String::from("http://localhost:8080"));

        let poster_timeout_secs = std::env::var("HERALD_POSTER_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let verify_tls = std::env::var("HERALD_VERIFY_TLS")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(true);

        let data_dir = std::env::var("HERALD_DATA_DIR")
            .unwrap_or_else(|_| String::from("data"))
            .into();

        let log_level = std::env::var("HERALD_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format =
            std::env::var("HERALD_LOG_FORMAT").unwrap_or_else(|_| String::from("text"));

        Ok(Self {
            scheduler: SchedulerConfig {
                cron,
                use_daily_slots,
                delay_min_minutes,
                delay_max_minutes,
            },
            runner: RunnerConfig { posting_enabled },
            generator: GeneratorConfig {
                endpoint: generator_endpoint,
                model: generator_model,
                timeout_secs: generator_timeout_secs,
                max_tokens,
                requests_per_minute,
                max_retries,
                corpus_dir,
            },
            poster: PosterConfig {
                endpoint: poster_endpoint,
                timeout_secs: poster_timeout_secs,
                verify_tls,
            },
            storage: StorageConfig { data_dir },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from an explicit file when given, otherwise from the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// The cron descriptor is deliberately not checked here: arming the
    /// scheduler reports descriptor problems, and status rendering works
    /// with any descriptor string.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.cron.trim().is_empty() {
            anyhow::bail!("scheduler.cron must not be empty");
        }

        if self.scheduler.delay_min_minutes > self.scheduler.delay_max_minutes {
            anyhow::bail!("delay_min_minutes must not exceed delay_max_minutes");
        }

        if self.generator.endpoint.is_empty() {
            anyhow::bail!("generator.endpoint must not be empty");
        }

        if self.generator.max_tokens == 0 {
            anyhow::bail!("generator.max_tokens must be greater than 0");
        }

        if self.generator.requests_per_minute == 0 {
            anyhow::bail!("generator.requests_per_minute must be greater than 0");
        }

        if self.poster.endpoint.is_empty() {
            anyhow::bail!("poster.endpoint must not be empty");
        }

        Ok(())
    }

    /// Get generator request timeout as Duration
    #[must_use]
    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator.timeout_secs)
    }

    /// Get poster request timeout as Duration
    #[must_use]
    pub fn poster_timeout(&self) -> Duration {
        Duration::from_secs(self.poster.timeout_secs)
    }
}

const DEFAULT_CRON: &str = "0 0 9 * * *";

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cron: String::from(DEFAULT_CRON),
            use_daily_slots: false,
            delay_min_minutes: 2,
            delay_max_minutes: 5,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            // Opt in to real publishing; a fresh install must not post
            posting_enabled: false,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("http://localhost:11434"),
            model: String::from("gemma3n:e4b"),
            timeout_secs: 120,
            max_tokens: 700,
            requests_per_minute: 6,
            max_retries: 3,
            corpus_dir: None,
        }
    }
}

impl Default for PosterConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("http://localhost:8080"),
            timeout_secs: 30,
            verify_tls: true,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}
