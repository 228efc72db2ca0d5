//! RCON Query CLI Tool
//!
//! One-shot tool for checking a game server's RCON setup by hand.
//!
//! Usage:
//!   cargo run --bin rcon-query -- --help
//!   cargo run --bin rcon-query -- --address 127.0.0.1:27015 --password secret check
//!   cargo run --bin rcon-query -- --address 127.0.0.1:27015 --password secret players --ignore bot1
//!   cargo run --bin rcon-query -- --address 127.0.0.1:27015 --password secret exec "/time"

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use player_watch::rcon::DEFAULT_PLAYERS_COMMAND;
use player_watch::{parse_players, PlayerQuery, RconPlayerQuery};

#[derive(Parser)]
#[command(name = "rcon-query")]
#[command(about = "Send one command to a game server over RCON and print the reply")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server address (host:port)
    #[arg(short, long)]
    address: String,

    /// RCON password
    #[arg(short, long)]
    password: String,

    /// Seconds allowed for connect, login and reply
    #[arg(short, long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and authenticate only
    Check,
    /// List online players the way the watcher sees them
    Players {
        /// Player-list command
        #[arg(long, default_value = DEFAULT_PLAYERS_COMMAND)]
        command: String,
        /// Names to leave out, may be repeated
        #[arg(short, long)]
        ignore: Vec<String>,
        /// Also print the server's raw reply
        #[arg(long)]
        raw: bool,
    },
    /// Run an arbitrary command and print the reply
    Exec {
        /// Command text
        command: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Commands::Check => {
            let query =
                RconPlayerQuery::new(&cli.address, &cli.password, DEFAULT_PLAYERS_COMMAND, timeout);
            query.check().await?;
            println!("✅ {} accepted the password", cli.address);
        }
        Commands::Players {
            command,
            ignore,
            raw,
        } => {
            let query = RconPlayerQuery::new(&cli.address, &cli.password, command, timeout);
            let reply = query.query_players().await?;
            if raw {
                println!("--- raw reply ---");
                println!("{}", reply);
                println!("-----------------");
            }

            let ignore: HashSet<String> = ignore.into_iter().collect();
            let players = parse_players(&reply, &ignore);
            println!("{} player(s) online", players.len());
            for player in players {
                println!("  {}", player);
            }
        }
        Commands::Exec { command } => {
            let query = RconPlayerQuery::new(&cli.address, &cli.password, command, timeout);
            println!("{}", query.query_players().await?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_must_be_positive() {
        let base = ["rcon-query", "--address", "127.0.0.1:27015", "--password", "pw"];

        let zero = Cli::try_parse_from(base.iter().copied().chain(["--timeout", "0", "check"]));
        assert!(zero.is_err());

        let cli = Cli::try_parse_from(base.iter().copied().chain(["check"])).unwrap();
        assert_eq!(cli.timeout, 5);

        let cli =
            Cli::try_parse_from(base.iter().copied().chain(["--timeout", "2", "check"])).unwrap();
        assert_eq!(cli.timeout, 2);
    }
}
