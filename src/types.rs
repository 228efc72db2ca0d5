//! Common types used throughout the player watch service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Player name exactly as the game server reports it
pub type PlayerName = String;

/// Connection and polling parameters for one game server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerProfile {
    /// Display name, also used as the metrics label
    pub name: String,
    /// RCON endpoint in `host:port` form
    pub address: String,
    /// RCON password
    pub password: String,
    /// Seconds between polls
    pub poll_interval_seconds: u64,
    /// Names that are never reported
    pub ignore: HashSet<PlayerName>,
    /// RCON I/O timeout in seconds
    pub timeout_seconds: u64,
    /// Command that asks the server for its online player listing
    pub command: String,
}

impl ServerProfile {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Where announcements go and how they are worded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationProfile {
    /// Notifier destination (a Telegram chat id)
    pub destination: String,
    /// Text placed before the list of names
    pub prefix: String,
}

impl NotificationProfile {
    /// Build the announcement for a batch of new players
    pub fn format_message(&self, new_players: &[PlayerName]) -> String {
        format!("{} {}", self.prefix, new_players.join(", "))
    }
}

/// Result of a single poll cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// The remote query failed; nothing was changed
    QueryFailed { reason: String },
    /// The query succeeded but every reported player was already known
    NoNewPlayers { online: usize },
    /// New players were found and announced
    Notified { new_players: Vec<PlayerName> },
    /// New players were found and committed, but the announcement failed
    NotifyFailed {
        new_players: Vec<PlayerName>,
        reason: String,
    },
}

impl PollOutcome {
    /// Short label used for metrics and stats
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::QueryFailed { .. } => "query_failed",
            PollOutcome::NoNewPlayers { .. } => "no_new_players",
            PollOutcome::Notified { .. } => "notified",
            PollOutcome::NotifyFailed { .. } => "notify_failed",
        }
    }

    /// Players discovered in this cycle, if any
    pub fn new_players(&self) -> &[PlayerName] {
        match self {
            PollOutcome::Notified { new_players } | PollOutcome::NotifyFailed { new_players, .. } => {
                new_players
            }
            _ => &[],
        }
    }
}

/// Running counters for one server, readable by health and stats endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerStats {
    pub polls: u64,
    pub query_failures: u64,
    pub notifications_sent: u64,
    pub notification_failures: u64,
    pub known_players: usize,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<String>,
}

impl ServerStats {
    /// Fold one cycle's outcome into the counters
    pub fn record(&mut self, outcome: &PollOutcome, known_players: usize) {
        self.polls += 1;
        match outcome {
            PollOutcome::QueryFailed { .. } => self.query_failures += 1,
            PollOutcome::Notified { .. } => self.notifications_sent += 1,
            PollOutcome::NotifyFailed { .. } => self.notification_failures += 1,
            PollOutcome::NoNewPlayers { .. } => {}
        }
        self.known_players = known_players;
        self.last_poll_at = Some(Utc::now());
        self.last_outcome = Some(outcome.label().to_string());
    }
}
