//! Notification delivery
//!
//! The poller only knows the [`Notifier`] trait; the Telegram Bot API
//! implementation lives in [`telegram`].

pub mod telegram;

pub use telegram::{TelegramConfig, TelegramNotifier};

use crate::error::Result;
use async_trait::async_trait;

/// Trait for delivering a message to a destination
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message` to `destination` under a `subject` line (the server name)
    async fn send(&self, destination: &str, subject: &str, message: &str) -> Result<()>;
}
