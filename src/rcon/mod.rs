//! Remote console access to game servers
//!
//! This module holds the Source RCON codec and client, plus the
//! [`PlayerQuery`] boundary the poller uses to fetch player listings.

pub mod client;
pub mod packet;

pub use client::RconClient;
pub use packet::Packet;

use crate::error::{Result, WatchError};
use crate::types::ServerProfile;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Default command for a formatted online-player listing
pub const DEFAULT_PLAYERS_COMMAND: &str = "/players o";

/// Trait for fetching the raw player listing of one server
#[async_trait]
pub trait PlayerQuery: Send + Sync {
    /// Return the server's raw reply to the player-list command
    async fn query_players(&self) -> Result<String>;

    /// Verify the server is reachable and accepts the credential
    async fn check(&self) -> Result<()>;
}

/// [`PlayerQuery`] that opens a fresh RCON session per call
#[derive(Debug, Clone)]
pub struct RconPlayerQuery {
    address: String,
    password: String,
    command: String,
    timeout: Duration,
}

impl RconPlayerQuery {
    pub fn new(
        address: impl Into<String>,
        password: impl Into<String>,
        command: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            address: address.into(),
            password: password.into(),
            command: command.into(),
            timeout,
        }
    }

    pub fn from_profile(profile: &ServerProfile) -> Self {
        Self::new(
            &profile.address,
            &profile.password,
            &profile.command,
            profile.timeout(),
        )
    }

    async fn with_timeout<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| WatchError::RconTimeout {
                address: self.address.clone(),
                seconds: self.timeout.as_secs(),
            })?
    }
}

#[async_trait]
impl PlayerQuery for RconPlayerQuery {
    async fn query_players(&self) -> Result<String> {
        self.with_timeout(async {
            let mut client = RconClient::connect(&self.address, &self.password).await?;
            client.execute(&self.command).await
        })
        .await
    }

    async fn check(&self) -> Result<()> {
        self.with_timeout(async {
            RconClient::connect(&self.address, &self.password).await?;
            Ok(())
        })
        .await
    }
}
