//! Main application configuration
//!
//! This module defines the primary configuration structures for the player
//! watch service: TOML file loading, first-run template bootstrap,
//! environment variable overrides and validation.

use crate::error::WatchError;
use crate::rcon::DEFAULT_PLAYERS_COMMAND;
use crate::types::{NotificationProfile, ServerProfile};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Template written on first run when no config file exists
pub const CONFIG_TEMPLATE: &str = include_str!("../../cfg.toml.example");

/// Default config file name
pub const DEFAULT_CONFIG_PATH: &str = "cfg.toml";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerSettings>,
    pub notify: NotifySettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health and metrics endpoints
    pub health_port: u16,
    /// Whether to serve health and metrics endpoints
    pub enable_health_server: bool,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Dial and authenticate every server before polling starts
    pub verify_servers_on_startup: bool,
}

/// One `[servers.<key>]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Display name; the table key is used when empty
    #[serde(default)]
    pub name: String,
    /// RCON address in `host:port` form
    pub address: String,
    /// RCON password
    #[serde(default)]
    pub password: String,
    /// Player names never reported
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Poll interval in seconds
    pub seconds: u64,
    /// RCON I/O timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Player-list command
    #[serde(default = "default_command")]
    pub command: String,
}

/// `[notify]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifySettings {
    /// Telegram bot API token
    #[serde(default)]
    pub api: String,
    /// Telegram chat id
    #[serde(default)]
    pub chat: i64,
    /// Text placed before the list of names
    #[serde(default)]
    pub prefix: String,
}

fn default_timeout_seconds() -> u64 {
    5
}

fn default_command() -> String {
    DEFAULT_PLAYERS_COMMAND.to_string()
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            health_port: 8080,
            enable_health_server: true,
            shutdown_timeout_seconds: 10,
            verify_servers_on_startup: true,
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Self::load(path)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file and apply environment overrides,
    /// leaving validation to the caller.
    ///
    /// A missing file is replaced with the bundled template and reported as
    /// a configuration error so the operator can fill it in.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            bootstrap_config(path)?;
            return Err(WatchError::ConfigurationError {
                message: format!(
                    "{} not found, created it from the template, please fill it in",
                    path.display()
                ),
            }
            .into());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Parse configuration from TOML text without validating it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| {
            WatchError::ConfigurationError {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(log_level) = lookup("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Some(port) = lookup("HEALTH_PORT") {
            self.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }
        if let Some(token) = lookup("NOTIFY_API_TOKEN") {
            self.notify.api = token;
        }
        if let Some(chat) = lookup("NOTIFY_CHAT_ID") {
            self.notify.chat = chat
                .parse()
                .map_err(|_| anyhow!("Invalid NOTIFY_CHAT_ID value: {}", chat))?;
        }
        Ok(())
    }

    /// Resolved per-server profiles, in table key order
    pub fn server_profiles(&self) -> Vec<ServerProfile> {
        self.servers
            .iter()
            .map(|(key, server)| ServerProfile {
                name: if server.name.is_empty() {
                    key.clone()
                } else {
                    server.name.clone()
                },
                address: server.address.clone(),
                password: server.password.clone(),
                poll_interval_seconds: server.seconds,
                ignore: server.ignore.iter().cloned().collect(),
                timeout_seconds: server.timeout_seconds,
                command: server.command.clone(),
            })
            .collect()
    }

    /// Destination and wording for announcements
    pub fn notification_profile(&self) -> NotificationProfile {
        NotificationProfile {
            destination: self.notify.chat.to_string(),
            prefix: self.notify.prefix.clone(),
        }
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }
}

/// Write the bundled template to `path`, creating parent directories
pub fn bootstrap_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config template to {}", path.display()))?;
    warn!("Wrote configuration template to {}", path.display());
    Ok(())
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    if config.service.enable_health_server && config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate servers
    if config.servers.is_empty() {
        return Err(anyhow!("At least one [servers.<name>] entry is required"));
    }
    let mut names = HashSet::new();
    for profile in config.server_profiles() {
        if profile.name.is_empty() {
            return Err(anyhow!("Server name cannot be empty"));
        }
        if !names.insert(profile.name.clone()) {
            return Err(anyhow!("Duplicate server name: {}", profile.name));
        }
        if profile.address.is_empty() {
            return Err(anyhow!("Server '{}' has no address", profile.name));
        }
        if profile.poll_interval_seconds == 0 {
            return Err(anyhow!(
                "Server '{}' poll interval must be at least 1 second",
                profile.name
            ));
        }
        if profile.timeout_seconds == 0 {
            return Err(anyhow!(
                "Server '{}' timeout must be greater than 0",
                profile.name
            ));
        }
        if profile.command.is_empty() {
            return Err(anyhow!("Server '{}' command cannot be empty", profile.name));
        }
    }

    // Validate notification settings
    if config.notify.api.is_empty() {
        return Err(anyhow!("Notify API token cannot be empty"));
    }
    if config.notify.chat == 0 {
        return Err(anyhow!("Notify chat id must be set"));
    }
    if config.notify.prefix.is_empty() {
        info!("Notify prefix is empty, messages will start with a space");
    }

    Ok(())
}
