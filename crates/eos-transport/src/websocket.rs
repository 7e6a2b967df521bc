//! WebSocket connection using `tokio-tungstenite`.
//!
//! One WebSocket message carries one frame, so no delimiter is needed.
//! Text messages are sent when the payload is valid UTF-8 (the login
//! protocol is JSON), binary otherwise.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::inbox::{Inbox, InboxSender};
use crate::{Connection, ConnectionId, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A client-side WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    inbox: Inbox,
}

impl WebSocketConnection {
    /// Opens a WebSocket connection to `url` (`ws://` or `wss://`).
    pub async fn connect(
        url: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let ws = match tokio::time::timeout(
            timeout,
            tokio_tungstenite::connect_async(url),
        )
        .await
        {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => {
                tracing::warn!(url, error = %e, "WebSocket connect failed");
                return Err(TransportError::Connect(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                )));
            }
            Err(_) => {
                return Err(TransportError::Connect(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connect to {url} timed out"),
                )));
            }
        };

        let id = ConnectionId::next();
        tracing::debug!(%id, url, "WebSocket connection established");

        let (sink, stream) = ws.split();
        Ok(Self {
            id,
            sink: Mutex::new(sink),
            inbox: Inbox::spawn(move |tx| read_messages(id, stream, tx)),
        })
    }
}

async fn read_messages(
    id: ConnectionId,
    mut stream: SplitStream<WsStream>,
    tx: InboxSender,
) {
    while let Some(msg) = stream.next().await {
        let frame = match msg {
            Ok(Message::Text(text)) => text.as_bytes().to_vec(),
            Ok(Message::Binary(data)) => data.to_vec(),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue, // ping/pong/raw frame
            Err(e) => {
                tracing::debug!(%id, error = %e, "WebSocket read failed");
                let _ = tx.send(Err(TransportError::Receive(
                    std::io::Error::new(std::io::ErrorKind::ConnectionReset, e),
                )));
                return;
            }
        };
        if tx.send(Ok(frame)).is_err() {
            return;
        }
    }
    tracing::debug!(%id, "WebSocket peer closed");
}

impl Connection for WebSocketConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let msg = match std::str::from_utf8(data) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(data.to_vec().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(|e| {
            TransportError::Send(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.inbox.recv().await
    }

    fn poll(&self) -> Result<Option<Vec<u8>>, TransportError> {
        self.inbox.poll()
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::Send(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
