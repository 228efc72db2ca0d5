//! Player listing parser
//!
//! Extracts player names from the reply to the online-players command.
//! The reply is a header line starting with [`ONLINE_MARKER`] followed by
//! one entry per line, each optionally suffixed with [`ONLINE_SUFFIX`].

use crate::types::PlayerName;
use std::collections::HashSet;

/// Header line that precedes the player entries
pub const ONLINE_MARKER: &str = "Online players";

/// Suffix appended to each entry by the server
pub const ONLINE_SUFFIX: &str = " (online)";

/// Parse a raw player listing into names, dropping anything in `ignore`.
///
/// A reply without the marker line is not an error: it simply lists nobody.
/// Entries are not trimmed and duplicates are kept in order.
pub fn parse_players(raw: &str, ignore: &HashSet<PlayerName>) -> Vec<PlayerName> {
    let mut lines = raw.split('\n');

    if !lines.by_ref().any(|line| line.starts_with(ONLINE_MARKER)) {
        return Vec::new();
    }

    lines
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.strip_suffix(ONLINE_SUFFIX).unwrap_or(entry))
        .filter(|name| !ignore.contains(*name))
        .map(str::to_string)
        .collect()
}
