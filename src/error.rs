//! Error types for the player watch service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific polling and notification scenarios
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("RCON connection to {address} failed: {message}")]
    RconConnectionFailed { address: String, message: String },

    #[error("RCON authentication rejected by {address}")]
    RconAuthenticationFailed { address: String },

    #[error("RCON protocol violation: {reason}")]
    RconProtocol { reason: String },

    #[error("RCON request to {address} timed out after {seconds}s")]
    RconTimeout { address: String, seconds: u64 },

    #[error("Notification to {destination} failed: {reason}")]
    NotificationFailed { destination: String, reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}
