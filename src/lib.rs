//! Player Watch - RCON player presence notifier
//!
//! This crate polls game servers over the Source RCON protocol, works out
//! which players have newly come online, and announces them through a
//! chat notifier (Telegram).

pub mod config;
pub mod error;
pub mod metrics;
pub mod notify;
pub mod poller;
pub mod presence;
pub mod rcon;
pub mod scheduler;
pub mod service;
pub mod types;

// Re-export commonly used types and traits
pub use error::{Result, WatchError};
pub use types::*;

// Re-export key components
pub use notify::{Notifier, TelegramNotifier};
pub use poller::ServerPoller;
pub use presence::{parse_players, PresenceTracker};
pub use rcon::{PlayerQuery, RconPlayerQuery};
pub use scheduler::Scheduler;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
