//! Source RCON client
//!
//! Works over any async byte stream so the handshake can be exercised
//! against scripted I/O in tests; [`RconClient::connect`] opens a TCP stream.

use crate::error::{Result, WatchError};
use crate::rcon::packet::{
    Packet, AUTH_FAILED_ID, SERVERDATA_AUTH, SERVERDATA_AUTH_RESPONSE, SERVERDATA_EXECCOMMAND,
    SERVERDATA_RESPONSE_VALUE,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// An authenticated-or-not RCON session over `S`
pub struct RconClient<S> {
    stream: S,
    address: String,
    next_id: i32,
}

impl RconClient<TcpStream> {
    /// Dial `address` and authenticate with `password`
    pub async fn connect(address: &str, password: &str) -> Result<Self> {
        let stream = TcpStream::connect(address).await.map_err(|e| {
            WatchError::RconConnectionFailed {
                address: address.to_string(),
                message: e.to_string(),
            }
        })?;
        stream.set_nodelay(true)?;

        let mut client = Self::new(stream, address);
        client.authenticate(password).await?;
        Ok(client)
    }
}

impl<S> RconClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already connected stream
    pub fn new(stream: S, address: impl Into<String>) -> Self {
        Self {
            stream,
            address: address.into(),
            next_id: 1,
        }
    }

    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = if self.next_id == i32::MAX {
            1
        } else {
            self.next_id + 1
        };
        id
    }

    /// Perform the auth handshake
    pub async fn authenticate(&mut self, password: &str) -> Result<()> {
        let id = self.allocate_id();
        Packet::new(id, SERVERDATA_AUTH, password)
            .write_to(&mut self.stream)
            .await?;

        let mut reply = Packet::read_from(&mut self.stream).await?;
        // Some servers send an empty response value ahead of the auth response
        if reply.kind == SERVERDATA_RESPONSE_VALUE {
            reply = Packet::read_from(&mut self.stream).await?;
        }

        if reply.kind != SERVERDATA_AUTH_RESPONSE {
            return Err(WatchError::RconProtocol {
                reason: format!("expected auth response, got packet type {}", reply.kind),
            }
            .into());
        }
        if reply.id == AUTH_FAILED_ID {
            return Err(WatchError::RconAuthenticationFailed {
                address: self.address.clone(),
            }
            .into());
        }
        if reply.id != id {
            return Err(WatchError::RconProtocol {
                reason: format!("auth response id {} does not match request {}", reply.id, id),
            }
            .into());
        }

        debug!("Authenticated RCON session with {}", self.address);
        Ok(())
    }

    /// Run a command and return the reply body
    pub async fn execute(&mut self, command: &str) -> Result<String> {
        let id = self.allocate_id();
        Packet::new(id, SERVERDATA_EXECCOMMAND, command)
            .write_to(&mut self.stream)
            .await?;

        let reply = Packet::read_from(&mut self.stream).await?;
        if reply.kind != SERVERDATA_RESPONSE_VALUE {
            return Err(WatchError::RconProtocol {
                reason: format!("expected response value, got packet type {}", reply.kind),
            }
            .into());
        }
        if reply.id != id {
            return Err(WatchError::RconProtocol {
                reason: format!("response id {} does not match request {}", reply.id, id),
            }
            .into());
        }

        debug!(
            "RCON command '{}' on {} returned {} bytes",
            command,
            self.address,
            reply.body.len()
        );
        Ok(reply.body)
    }
}
