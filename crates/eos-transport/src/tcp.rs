//! Newline-delimited TCP connection using `tokio::net`.
//!
//! This is the legacy socket the game server exposes next to its HTTP API.
//! Each message is one line of UTF-8 JSON terminated by `\n`.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;

use crate::inbox::{Inbox, InboxSender};
use crate::{Connection, ConnectionId, TransportError};

/// Frames longer than this, delimiter included, are treated as a protocol
/// violation.
const MAX_FRAME_LEN: usize = 64 * 1024;

/// A persistent TCP connection with newline framing.
pub struct TcpLineConnection {
    id: ConnectionId,
    peer: SocketAddr,
    writer: Mutex<OwnedWriteHalf>,
    inbox: Inbox,
}

impl TcpLineConnection {
    /// Connects to `addr`, giving up after `timeout`.
    ///
    /// A failed or timed-out connect holds no resources afterwards.
    pub async fn connect(
        addr: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let stream =
            match tokio::time::timeout(timeout, TcpStream::connect(addr)).await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    tracing::warn!(addr, error = %e, "TCP connect failed");
                    return Err(TransportError::Connect(e));
                }
                Err(_) => {
                    tracing::warn!(addr, ?timeout, "TCP connect timed out");
                    return Err(TransportError::Connect(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("connect to {addr} timed out"),
                    )));
                }
            };
        Self::from_stream(stream)
    }

    /// Wraps an already-connected stream (either side of a connection).
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        let peer = stream.peer_addr().map_err(TransportError::Connect)?;
        let id = ConnectionId::next();
        // Login frames are small and latency matters more than batching.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%id, error = %e, "could not set TCP_NODELAY");
        }
        let (read, write) = stream.into_split();

        tracing::debug!(%id, %peer, "TCP connection established");

        Ok(Self {
            id,
            peer,
            writer: Mutex::new(write),
            inbox: Inbox::spawn(move |tx| read_frames(id, read, tx)),
        })
    }

    /// Address of the remote peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// Reads `\n`-terminated frames until EOF or an error.
///
/// Frames are forwarded with their delimiter; stripping it is the codec's
/// job. Blank keep-alive lines are skipped. At most one byte past
/// [`MAX_FRAME_LEN`] is buffered before an oversized frame is rejected.
async fn read_frames(id: ConnectionId, read: OwnedReadHalf, tx: InboxSender) {
    let mut reader = BufReader::new(read);
    let limit = MAX_FRAME_LEN as u64 + 1;
    loop {
        let mut frame = Vec::new();
        match (&mut reader).take(limit).read_until(b'\n', &mut frame).await {
            Ok(0) => {
                tracing::debug!(%id, "TCP peer closed");
                return;
            }
            Ok(_) if frame.len() > MAX_FRAME_LEN => {
                tracing::warn!(%id, len = frame.len(), "oversized frame");
                let _ = tx.send(Err(TransportError::Receive(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "frame exceeds maximum length",
                    ),
                )));
                return;
            }
            Ok(_) => {
                if frame.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                if frame.last() != Some(&b'\n') {
                    tracing::debug!(%id, "partial frame at EOF");
                }
                if tx.send(Ok(frame)).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::debug!(%id, error = %e, "TCP read failed");
                let _ = tx.send(Err(TransportError::Receive(e)));
                return;
            }
        }
    }
}

impl Connection for TcpLineConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await.map_err(TransportError::Send)?;
        if data.last() != Some(&b'\n') {
            writer.write_all(b"\n").await.map_err(TransportError::Send)?;
        }
        writer.flush().await.map_err(TransportError::Send)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.inbox.recv().await
    }

    fn poll(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.inbox.poll()
    }

    async fn close(&self) -> Result<(), TransportError> {
        tracing::debug!(id = %self.id, "closing TCP connection");
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::Send)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
