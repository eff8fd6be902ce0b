use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::utils::retry::RetryPolicy;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Environment variables read for backwards compatibility with existing
/// `.env` files, mapped onto their configuration keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("MANGABUFF_EMAIL", "site.email"),
    ("MANGABUFF_PASSWORD", "site.password"),
    ("ALLIANCE_ID", "site.alliance_id"),
    ("TELEGRAM_BOT_TOKEN", "telegram.bot_token"),
    ("TELEGRAM_CHAT_ID", "telegram.chat_id"),
    ("CHECK_INTERVAL", "monitor.check_interval_secs"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub telegram: TelegramConfig,
    pub monitor: MonitorConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
    pub alliance_id: String,
    pub email: String,
    pub password: String,
    pub user_agent: String,
    pub accept_language: String,
    pub login_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
    pub chat_id: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub check_interval_secs: u64,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub network_backoff_secs: u64,
    pub error_backoff_secs: u64,
    pub heartbeat_every: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub history_file: PathBuf,
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
    pub console_filter: String,
    pub file_level: String,
}

impl SiteConfig {
    pub fn root_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn login_url(&self) -> String {
        format!("{}/login", self.root_url())
    }

    pub fn alliance_url(&self) -> String {
        format!("{}/alliances/{}/boost", self.root_url(), self.alliance_id)
    }

    pub fn item_url(&self, slug: &str) -> String {
        format!("{}/manga/{}", self.root_url(), slug)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl TelegramConfig {
    pub fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_url.trim_end_matches('/'),
            self.bot_token,
            method
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MonitorConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn network_backoff(&self) -> Duration {
        Duration::from_secs(self.network_backoff_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }
}

impl AppConfig {
    /// Load `.env`, the optional `config/monitor` file and the environment,
    /// in increasing order of precedence. Validation is left to the caller so
    /// logging can be installed before a configuration error is reported.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut builder = Self::defaults()?
            .add_source(File::with_name("config/monitor").required(false))
            .add_source(
                Environment::with_prefix("ALLIANCE_MONITOR")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(*key, env::var(var).ok())?;
        }

        builder.build()?.try_deserialize()
    }

    /// Built-in defaults every other source is layered over.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("site.base_url", "https://mangabuff.ru")?
            .set_default("site.alliance_id", "10")?
            .set_default("site.email", "")?
            .set_default("site.password", "")?
            .set_default("site.user_agent", DEFAULT_USER_AGENT)?
            .set_default("site.accept_language", "ru-RU,ru;q=0.9,en;q=0.8")?
            .set_default("site.login_timeout_secs", 10)?
            .set_default("site.request_timeout_secs", 15)?
            .set_default("telegram.api_url", "https://api.telegram.org")?
            .set_default("telegram.bot_token", "")?
            .set_default("telegram.chat_id", "")?
            .set_default("telegram.timeout_secs", 10)?
            .set_default("monitor.check_interval_secs", 1)?
            .set_default("monitor.retry_attempts", 3)?
            .set_default("monitor.retry_delay_ms", 5000)?
            .set_default("monitor.network_backoff_secs", 30)?
            .set_default("monitor.error_backoff_secs", 5)?
            .set_default("monitor.heartbeat_every", 60)?
            .set_default("storage.history_file", "manga_history.json")?
            .set_default("storage.history_limit", 100)?
            .set_default("logging.directory", "logs")?
            .set_default("logging.file_name", "monitor.log")?
            .set_default("logging.console_filter", "alliance_monitor=info")?
            .set_default("logging.file_level", "warn")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("MANGABUFF_EMAIL", &self.site.email),
            ("MANGABUFF_PASSWORD", &self.site.password),
            ("TELEGRAM_BOT_TOKEN", &self.telegram.bot_token),
            ("TELEGRAM_CHAT_ID", &self.telegram.chat_id),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::Message(format!(
                "Missing required settings: {}",
                missing.join(", ")
            )));
        }

        if Url::parse(&self.site.base_url).is_err() {
            return Err(ConfigError::Message("Invalid site base URL format".into()));
        }

        if Url::parse(&self.telegram.api_url).is_err() {
            return Err(ConfigError::Message("Invalid Telegram API URL format".into()));
        }

        if self.site.alliance_id.trim().is_empty() {
            return Err(ConfigError::Message("Site alliance_id must not be empty".into()));
        }

        if self.monitor.check_interval_secs == 0 {
            return Err(ConfigError::Message("Monitor check_interval_secs must be greater than 0".into()));
        }

        if self.monitor.retry_attempts == 0 {
            return Err(ConfigError::Message("Monitor retry_attempts must be greater than 0".into()));
        }

        if self.monitor.heartbeat_every == 0 {
            return Err(ConfigError::Message("Monitor heartbeat_every must be greater than 0".into()));
        }

        if self.storage.history_limit == 0 {
            return Err(ConfigError::Message("Storage history_limit must be greater than 0".into()));
        }

        Ok(())
    }
}
