//! Telegram Bot API notifier

use crate::error::{Result, WatchError};
use crate::notify::Notifier;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Public Bot API endpoint
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Configuration for the Telegram notifier
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_token: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl TelegramConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends messages through `sendMessage`
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    http: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http, config })
    }

    /// Chat text: subject on its own line above the message
    fn render_text(subject: &str, message: &str) -> String {
        if subject.is_empty() {
            message.to_string()
        } else {
            format!("{}\n{}", subject, message)
        }
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_token
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, destination: &str, subject: &str, message: &str) -> Result<()> {
        let failed = |reason: String| WatchError::NotificationFailed {
            destination: destination.to_string(),
            reason,
        };

        let chat_text = Self::render_text(subject, message);
        let body = SendMessageRequest {
            chat_id: destination,
            text: &chat_text,
        };

        // The URL carries the bot token, so it is never logged
        let resp = self
            .http
            .post(self.send_message_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| failed(format!("request error: {}", e.without_url())))?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(failed(format!("HTTP {} body={}", status, text)).into());
        }

        let parsed: ApiResponse = serde_json::from_str(&text)
            .map_err(|e| failed(format!("unreadable API response: {}", e)))?;
        if !parsed.ok {
            return Err(failed(parsed.description.unwrap_or_else(|| "ok=false".to_string())).into());
        }

        debug!("Delivered notification to chat {}", destination);
        Ok(())
    }
}
