pub mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;

use crate::error::NotifyError;

/// Delivers a text message to a user
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user_id: i64, text: &str) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, user_id: i64, text: &str) -> Result<(), NotifyError> {
        tracing::info!(user_id, "[dry-run] {}", text.replace('\n', " | "));
        Ok(())
    }
}
