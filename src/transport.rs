//! UDP channel to a single fixture.

use std::time::Duration;

use crate::errors::Error;
use crate::runtime::{self, AsyncUdpSocket, UdpSocket};

type Result<T> = std::result::Result<T, Error>;

/// Owns the datagram socket associated with one fixture.
///
/// The socket is bound once at construction and lives for the lifetime
/// of the instance; there is no per-message socket churn and no retry at
/// this layer. Retry policy belongs to the callers (the poller retries by
/// virtue of its next tick, property setters surface the failure).
pub(crate) struct Channel {
    socket: UdpSocket,
}

impl Channel {
    /// How long a single receive waits before handing control back so the
    /// receive loop can observe shutdown.
    const RECV_SLICE_MS: u64 = 500;

    /// Bind an ephemeral local socket and associate it with the fixture.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| Error::socket("bind", e))?;

        let target = format!("{host}:{port}");
        socket
            .connect(&target)
            .await
            .map_err(|e| Error::connect(&target, e))?;

        Ok(Channel { socket })
    }

    /// Re-associate the socket with a new address for the same fixture.
    pub async fn reconnect(&self, host: &str, port: u16) -> Result<()> {
        let target = format!("{host}:{port}");
        self.socket
            .connect(&target)
            .await
            .map_err(|e| Error::connect(&target, e))
    }

    /// Send one datagram.
    pub async fn send(&self, payload: &[u8]) -> Result<()> {
        self.socket
            .send(payload)
            .await
            .map_err(|e| Error::socket("send", e))?;
        Ok(())
    }

    /// Receive one datagram, waiting at most one timeout slice.
    ///
    /// `Ok(None)` means the slice elapsed with nothing received.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<Option<usize>> {
        let slice = Duration::from_millis(Self::RECV_SLICE_MS);
        match runtime::timeout(slice, self.socket.recv(buf)).await {
            Ok(Ok(size)) => Ok(Some(size)),
            Ok(Err(e)) => Err(Error::socket("receive", e)),
            Err(_) => Ok(None),
        }
    }
}
