//! Configuration management for the player-watch service
//!
//! This module handles configuration loading from the TOML file and
//! environment variables, validation, and default values.

pub mod app;

// Re-export commonly used types
pub use app::{
    bootstrap_config, validate_config, AppConfig, NotifySettings, ServerSettings,
    ServiceSettings, CONFIG_TEMPLATE, DEFAULT_CONFIG_PATH,
};
