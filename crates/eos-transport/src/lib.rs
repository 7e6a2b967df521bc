//! Transport layer for the EOS client.
//!
//! Two ways of talking to the login service are supported:
//!
//! - **Persistent connections** ([`Connection`]): a socket that stays open
//!   and carries framed messages in both directions. [`TcpLineConnection`]
//!   speaks newline-delimited frames over plain TCP, [`WebSocketConnection`]
//!   uses one WebSocket message per frame.
//! - **Request/response calls** ([`RequestTransport`]): one request body in,
//!   one response body out. [`HttpTransport`] issues `POST` calls, and
//!   [`LineRequester`] runs the same contract over a persistent connection.
//!
//! Everything here deals in opaque byte payloads. Encoding and decoding
//! belong to `eos-protocol`.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket connection via `tokio-tungstenite`
//! - `http` (default): HTTP transport via `reqwest`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;
mod inbox;
mod pipeline;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use pipeline::{FrameRoute, FrameRouter, LineRequester, PushFrames};
pub use tcp::TcpLineConnection;
#[cfg(feature = "websocket")]
pub use websocket::WebSocketConnection;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide connection ID.
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A persistent connection that carries framed byte messages.
///
/// Implementations own a background reader that splits the incoming stream
/// into frames. Dropping the connection releases the socket and stops the
/// reader, whichever way the owner exits.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Waits for the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Non-blocking check for an available frame.
    ///
    /// Returns `Ok(None)` when nothing has arrived yet and
    /// `Err(TransportError::Closed)` once the peer has closed and every
    /// buffered frame has been consumed.
    fn poll(&self) -> Result<Option<Vec<u8>>, TransportError>;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

/// A single-shot request/response transport.
pub trait RequestTransport: Send + Sync + 'static {
    /// Sends `body` to `path` and resolves with the response body.
    ///
    /// A response that arrives with an error status is reported as
    /// [`TransportError::Status`], body included.
    fn request(
        &self,
        path: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}
