use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

use super::Notifier;
use crate::config::TelegramConfig;
use crate::error::NotifyError;

/// Telegram Bot API client for `sendMessage`
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, bot_token: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                bot_token
            ),
        })
    }

    /// Build from settings; fails when no bot token is configured
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .context("No bot token configured (set WATCHBOT_TELEGRAM__BOT_TOKEN or BOT_TOKEN)")?;

        Self::new(
            &config.api_base,
            token,
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, user_id: i64, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: user_id,
                text,
            })
            .send()
            .await
            // The endpoint embeds the bot token
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();

        match body {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => {
                tracing::debug!(user_id, "Delivered Telegram message");
                Ok(())
            }
            other => Err(NotifyError::Rejected {
                user_id,
                status: status.as_u16(),
                description: other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| "Unknown error".to_string()),
            }),
        }
    }
}
