//! Outreach configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{OutreachError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachConfig {
    /// Path of the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Seconds between dispatcher ticks in `outreach run`.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
}

fn default_db_path() -> String {
    OutreachConfig::home_dir()
        .join("outreach.db")
        .to_string_lossy()
        .into_owned()
}
fn default_poll_interval() -> u64 {
    60
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            poll_interval_secs: default_poll_interval(),
            smtp: SmtpConfig::default(),
            sequence: SequenceConfig::default(),
        }
    }
}

impl OutreachConfig {
    /// Load config from the default path (~/.outreach/config.toml).
    /// Missing file is not an error — defaults apply.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OutreachError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| OutreachError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| OutreachError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Outreach home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".outreach")
    }
}

/// SMTP transport configuration.
///
/// When disabled, or when credentials are left empty, the binary falls back
/// to the console mailer (simulation mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// From address; falls back to `username` when empty.
    #[serde(default)]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_from_name() -> String {
    "The Hiring Team".into()
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_smtp_host(),
            port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
            from_name: default_from_name(),
        }
    }
}

impl SmtpConfig {
    /// True when real SMTP delivery is both enabled and fully configured.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.username.is_empty() && !self.password.is_empty()
    }

    pub fn from_address(&self) -> &str {
        if self.from_email.is_empty() {
            &self.username
        } else {
            &self.from_email
        }
    }
}

/// Sequence tuning. The templates themselves are built in; only the day
/// offsets are operator-tunable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceConfig {
    /// Day offsets per step, ascending (default 0, 2, 5).
    #[serde(default)]
    pub delay_days: Option<Vec<i64>>,
}
