//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{SiteTarget, default_targets};
use crate::services::ExtractionRule;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Title keywords that make a new article worth reporting
    #[serde(default = "defaults::keywords")]
    pub keywords: Vec<String>,

    /// Retry, timing and scheduling behavior
    #[serde(default)]
    pub task: TaskConfig,

    /// Snapshot persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Telegram transport credentials
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// SMTP transport settings
    #[serde(default)]
    pub email: EmailConfig,

    /// Monitored sites
    #[serde(default = "default_targets")]
    pub targets: Vec<SiteTarget>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.keywords.is_empty() {
            return Err(AppError::validation("No keywords defined"));
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(AppError::validation("keywords must not contain blank entries"));
        }
        if self.task.request_timeout_secs == 0 {
            return Err(AppError::validation("task.request_timeout_secs must be > 0"));
        }
        if self.task.min_delay_ms > self.task.max_delay_ms {
            return Err(AppError::validation(
                "task.min_delay_ms must not exceed task.max_delay_ms",
            ));
        }
        if self.task.snapshot_size == 0 {
            return Err(AppError::validation("task.snapshot_size must be > 0"));
        }
        self.task.run_time()?;

        if self.targets.is_empty() {
            return Err(AppError::validation("No targets defined"));
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.key.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate target key: {}",
                    target.key
                )));
            }
            url::Url::parse(&target.url).map_err(|e| {
                AppError::validation(format!("Invalid URL for {}: {e}", target.key))
            })?;
            if ExtractionRule::for_key(&target.key).is_none() {
                log::warn!(
                    "Target '{}' has no extraction rule; it will always report an empty parse result",
                    target.key
                );
            }
        }
        Ok(())
    }

    /// Look up a target by key.
    pub fn target(&self, key: &str) -> Option<&SiteTarget> {
        self.targets.iter().find(|t| t.key == key)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keywords: defaults::keywords(),
            task: TaskConfig::default(),
            storage: StorageConfig::default(),
            telegram: TelegramConfig::default(),
            email: EmailConfig::default(),
            targets: default_targets(),
        }
    }
}

/// Retry, timing and scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Retries after the first failed attempt
    #[serde(default = "defaults::retry_count")]
    pub retry_count: u32,

    /// Wait between attempts in seconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_secs: u64,

    /// HTTP request timeout in seconds
    #[serde(default = "defaults::request_timeout")]
    pub request_timeout_secs: u64,

    /// Lower bound of the random pause before each fetch
    #[serde(default = "defaults::min_delay")]
    pub min_delay_ms: u64,

    /// Upper bound of the random pause before each fetch
    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,

    /// Time given to scripts before a rendered page is read
    #[serde(default = "defaults::render_settle")]
    pub render_settle_secs: u64,

    /// Number of most recent articles kept per site
    #[serde(default = "defaults::snapshot_size")]
    pub snapshot_size: usize,

    /// Local time of the daily run, `HH:MM`
    #[serde(default = "defaults::run_time")]
    pub run_time: String,
}

impl TaskConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn render_settle(&self) -> Duration {
        Duration::from_secs(self.render_settle_secs)
    }

    /// Parse `run_time`.
    pub fn run_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.run_time.trim(), "%H:%M").map_err(|e| {
            AppError::validation(format!(
                "task.run_time '{}' is not HH:MM: {e}",
                self.run_time
            ))
        })
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            retry_count: defaults::retry_count(),
            retry_delay_secs: defaults::retry_delay(),
            request_timeout_secs: defaults::request_timeout(),
            min_delay_ms: defaults::min_delay(),
            max_delay_ms: defaults::max_delay(),
            render_settle_secs: defaults::render_settle(),
            snapshot_size: defaults::snapshot_size(),
            run_time: defaults::run_time(),
        }
    }
}

/// Snapshot persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON document holding the per-site snapshots
    #[serde(default = "defaults::data_file")]
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: defaults::data_file(),
        }
    }
}

/// Telegram bot credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,

    #[serde(default)]
    pub chat_id: String,
}

impl TelegramConfig {
    /// Both the token and the chat are set.
    pub fn is_configured(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

/// SMTP server, account and recipients for HTML mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Sender address; the account name when unset
    #[serde(default)]
    pub from_email: Option<String>,

    #[serde(default)]
    pub to_emails: Vec<String>,

    /// Implicit TLS, usually port 465
    #[serde(default)]
    pub use_ssl: bool,

    /// STARTTLS upgrade when `use_ssl` is off
    #[serde(default = "defaults::use_tls")]
    pub use_tls: bool,
}

impl EmailConfig {
    /// Server, account and at least one recipient are set.
    pub fn is_configured(&self) -> bool {
        !self.smtp_host.trim().is_empty()
            && !self.username.trim().is_empty()
            && !self.password.is_empty()
            && self.to_emails.iter().any(|to| !to.trim().is_empty())
    }

    pub fn sender(&self) -> &str {
        self.from_email
            .as_deref()
            .filter(|from| !from.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: defaults::smtp_port(),
            username: String::new(),
            password: String::new(),
            from_email: None,
            to_emails: Vec::new(),
            use_ssl: false,
            use_tls: defaults::use_tls(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn keywords() -> Vec<String> {
        vec!["CNC".into(), "MACHINING".into()]
    }

    // Task defaults
    pub fn retry_count() -> u32 {
        3
    }
    pub fn retry_delay() -> u64 {
        600
    }
    pub fn request_timeout() -> u64 {
        30
    }
    pub fn min_delay() -> u64 {
        2_000
    }
    pub fn max_delay() -> u64 {
        5_000
    }
    pub fn render_settle() -> u64 {
        5
    }
    pub fn snapshot_size() -> usize {
        3
    }
    pub fn run_time() -> String {
        "08:00".into()
    }

    // Storage defaults
    pub fn data_file() -> PathBuf {
        PathBuf::from("data/data.json")
    }

    // Email defaults
    pub fn smtp_port() -> u16 {
        587
    }
    pub fn use_tls() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn bundled_config_is_valid() {
        let config = Config::from_toml(include_str!("../../data/config.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.targets.len(), 11);
        assert_eq!(config.task.run_time().unwrap().to_string(), "08:00:00");
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config = Config::from_toml(
            r#"
            keywords = ["cnc", "Anodizing"]

            [task]
            retry_count = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.keywords, vec!["cnc", "Anodizing"]);
        assert_eq!(config.task.retry_count, 1);
        assert_eq!(config.task.retry_delay_secs, 600);
        assert_eq!(config.task.snapshot_size, 3);
        assert_eq!(config.targets.len(), 11);
        assert!(!config.telegram.is_configured());
        assert!(!config.email.is_configured());
        assert_eq!(config.email.smtp_port, 587);
    }

    #[test]
    fn targets_can_be_overridden() {
        let config = Config::from_toml(
            r#"
            [[targets]]
            key = "fictiv"
            name = "Fictiv"
            url = "https://fictiv.com/articles"
            requires_rendering = true
            "#,
        )
        .unwrap();

        assert_eq!(config.targets.len(), 1);
        assert!(config.targets[0].requires_rendering);
        assert!(config.target("fictiv").is_some());
        assert!(config.target("3erp").is_none());
    }

    #[test]
    fn validate_rejects_inverted_delay_bounds() {
        let mut config = Config::default();
        config.task.min_delay_ms = 6_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_run_time() {
        let mut config = Config::default();
        config.task.run_time = "8 o'clock".into();
        assert!(config.validate().is_err());

        config.task.run_time = "25:00".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_keyword() {
        let mut config = Config::default();
        config.keywords.push("  ".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_keys() {
        let mut config = Config::default();
        let first = config.targets[0].clone();
        config.targets.push(first);
        assert!(config.validate().is_err());
    }

    #[test]
    fn telegram_needs_token_and_chat() {
        let telegram = TelegramConfig {
            bot_token: "123:abc".into(),
            chat_id: String::new(),
        };
        assert!(!telegram.is_configured());
    }

    #[test]
    fn email_section_parses() {
        let config = Config::from_toml(
            r#"
            [email]
            smtp_host = "smtp.qq.com"
            smtp_port = 465
            username = "monitor@qq.com"
            password = "app-password"
            to_emails = ["sales@example.com"]
            use_ssl = true
            "#,
        )
        .unwrap();

        assert!(config.email.is_configured());
        assert!(config.email.use_ssl);
        assert_eq!(config.email.smtp_port, 465);
        assert_eq!(config.email.sender(), "monitor@qq.com");
    }

    #[test]
    fn email_needs_recipients_and_prefers_from_address() {
        let mut email = EmailConfig {
            smtp_host: "smtp.example.com".into(),
            username: "account".into(),
            password: "secret".into(),
            to_emails: vec!["  ".into()],
            ..EmailConfig::default()
        };
        assert!(!email.is_configured());

        email.to_emails.push("ops@example.com".into());
        assert!(email.is_configured());

        email.from_email = Some("monitor@example.com".into());
        assert_eq!(email.sender(), "monitor@example.com");
    }
}
