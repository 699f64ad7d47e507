//! TOML configuration for chargewatch.
//!
//! Layered like the rest of the appliance tooling: an explicit path (flag or
//! `CHARGEWATCH_CONFIG`), then `./chargewatch.toml`, then compiled-in
//! defaults. Secrets can be supplied through environment variables so they
//! stay out of the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::clock::parse_utc_offset;
use crate::storage::Segmenting;

pub const ENV_CONFIG: &str = "CHARGEWATCH_CONFIG";
pub const ENV_API_TOKEN: &str = "CHARGEWATCH_API_TOKEN";
pub const ENV_TELEGRAM_TOKEN: &str = "CHARGEWATCH_TELEGRAM_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "CHARGEWATCH_TELEGRAM_CHAT_ID";

const LOCAL_CONFIG: &str = "chargewatch.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// File this config was read from; `None` for compiled-in defaults.
    #[serde(skip)]
    pub origin: Option<PathBuf>,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config.origin = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the config file, apply env overrides, and validate.
    ///
    /// An explicitly requested file must exist; the local fallback is optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None if Path::new(LOCAL_CONFIG).is_file() => Self::load(Path::new(LOCAL_CONFIG))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override secrets from the environment. `lookup` is injectable for tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(ENV_API_TOKEN) {
            self.source.bearer_token = v;
        }
        if let Some(v) = lookup(ENV_TELEGRAM_TOKEN) {
            self.telegram.bot_token = Some(v);
        }
        if let Some(v) = lookup(ENV_TELEGRAM_CHAT_ID) {
            self.telegram.chat_id = Some(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.monitor.poll_interval_secs == 0 {
            bail!("monitor.poll_interval_secs must be greater than zero");
        }
        if self.monitor.batch_size == 0 {
            bail!("monitor.batch_size must be greater than zero");
        }
        if self.monitor.failure_threshold == 0 {
            bail!("monitor.failure_threshold must be greater than zero");
        }
        if self.log.path.as_os_str().is_empty() {
            bail!("log.path must not be empty");
        }
        self.log.offset()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Status source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Connector listing endpoint.
    pub url: String,
    pub bearer_token: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            bearer_token: String::new(),
            timeout_secs: 15,
            user_agent: concat!("chargewatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 15,
        }
    }
}

impl TelegramConfig {
    /// Token and chat id, when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.bot_token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => Some((token, chat)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base path; monthly segments are written next to it.
    pub path: PathBuf,
    pub segmenting: Segmenting,
    /// Fixed UTC offset used for every timestamp, e.g. `+08:00`.
    pub utc_offset: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("charger_log.csv"),
            segmenting: Segmenting::Monthly,
            utc_offset: "+08:00".to_string(),
        }
    }
}

impl LogConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset).context("invalid log.utc_offset")
    }
}

// ---------------------------------------------------------------------------
// Monitor loop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    pub batch_size: usize,
    pub failure_threshold: u32,
    /// Pause between alert batches, to stay under the transport's rate limit.
    pub batch_pause_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 180,
            batch_size: 10,
            failure_threshold: 3,
            batch_pause_ms: 1000,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

// ---------------------------------------------------------------------------
// Status API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address for the read-only status API; disabled when unset.
    pub bind: Option<String>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
