use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::alerts::AlertRules;

/// Runtime settings for the whole service
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub log_filter: String,
    pub schedule: ScheduleConfig,
    pub alerts: AlertRules,
    pub price_source: PriceSourceConfig,
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub initial_delay_secs: u64,
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceSourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub timeout_secs: u64,
}

/// Defaults for every key, lowest priority source
pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("database_url", "sqlite://watchbot.db")?
        .set_default("log_filter", "watchbot=info")?
        .set_default("schedule.interval_secs", 3600)?
        .set_default("schedule.initial_delay_secs", 10)?
        .set_default("alerts.drop_threshold_pct", 5.0)?
        .set_default("price_source.base_url", "https://query1.finance.yahoo.com")?
        .set_default("price_source.timeout_secs", 10)?
        .set_default("price_source.max_retries", 3)?
        .set_default("price_source.initial_backoff_ms", 2000)?
        .set_default("price_source.requests_per_minute", 60)?
        .set_default("telegram.api_base", "https://api.telegram.org")?
        .set_default("telegram.timeout_secs", 10)
}

impl Settings {
    /// Load settings from defaults, an optional TOML file and `WATCHBOT_*` env vars.
    ///
    /// Without an explicit path, `watchbot.toml` in the working directory is
    /// read if present. Nested keys use `__`, e.g. `WATCHBOT_SCHEDULE__INTERVAL_SECS`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name("watchbot").required(false),
        };

        let builder = defaults()?.add_source(file).add_source(
            Environment::with_prefix("WATCHBOT")
                .prefix_separator("_")
                .separator("__"),
        );

        let mut settings = Self::from_builder(builder)?;

        // Legacy variable name from the original bot deployment
        if settings.telegram.bot_token.is_none() {
            settings.telegram.bot_token = std::env::var("BOT_TOKEN").ok().filter(|t| !t.is_empty());
        }

        Ok(settings)
    }

    /// Build and validate settings from a prepared builder
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::Message(
                "schedule.interval_secs must be greater than zero".to_string(),
            ));
        }
        let threshold = self.alerts.drop_threshold_pct;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::Message(format!(
                "alerts.drop_threshold_pct must be positive, got {}",
                threshold
            )));
        }
        if self.price_source.max_retries == 0 {
            return Err(ConfigError::Message(
                "price_source.max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
