//! Player presence detection
//!
//! This module turns raw RCON player listings into names and keeps the
//! per-server record of who has already been seen online.

pub mod parser;
pub mod tracker;

pub use parser::{parse_players, ONLINE_MARKER, ONLINE_SUFFIX};
pub use tracker::PresenceTracker;
