//! Source RCON packet codec
//!
//! Wire layout (little-endian): `size:i32`, `id:i32`, `type:i32`, body,
//! two NUL bytes. `size` counts everything after itself.

use crate::error::{Result, WatchError};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Id the server puts in the auth response when the password is wrong
pub const AUTH_FAILED_ID: i32 = -1;

/// id + type + two terminators
pub const MIN_PACKET_SIZE: i32 = 10;

/// Largest body a client may send
pub const MAX_COMMAND_BODY: usize = 4096;

/// Largest packet accepted from a server
pub const MAX_RESPONSE_SIZE: i32 = 64 * 1024;

/// A single RCON packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// Value of the leading size field
    pub fn size(&self) -> i32 {
        MIN_PACKET_SIZE + self.body.len() as i32
    }

    /// Serialize to wire bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.body.len() > MAX_COMMAND_BODY {
            return Err(WatchError::RconProtocol {
                reason: format!(
                    "body of {} bytes exceeds the {} byte limit",
                    self.body.len(),
                    MAX_COMMAND_BODY
                ),
            }
            .into());
        }

        let mut buf = Vec::with_capacity(self.size() as usize + 4);
        buf.extend_from_slice(&self.size().to_le_bytes());
        buf.extend_from_slice(&self.id.to_le_bytes());
        buf.extend_from_slice(&self.kind.to_le_bytes());
        buf.extend_from_slice(self.body.as_bytes());
        buf.extend_from_slice(&[0, 0]);
        Ok(buf)
    }

    /// Write the packet and flush
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = self.encode()?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read one packet from the stream
    pub async fn read_from<R>(reader: &mut R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let size = reader.read_i32_le().await?;
        if !(MIN_PACKET_SIZE..=MAX_RESPONSE_SIZE).contains(&size) {
            return Err(WatchError::RconProtocol {
                reason: format!("invalid packet size {}", size),
            }
            .into());
        }

        let mut payload = vec![0u8; size as usize];
        reader.read_exact(&mut payload).await?;

        let id = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let kind = i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);

        let body = &payload[8..];
        let end = body
            .iter()
            .rposition(|&b| b != 0)
            .map(|pos| pos + 1)
            .unwrap_or(0);

        Ok(Self {
            id,
            kind,
            body: String::from_utf8_lossy(&body[..end]).into_owned(),
        })
    }
}
