/// Errors that can occur in the transport layer.
///
/// Every failure a socket or HTTP call can produce is surfaced as one of
/// these variants. The session layer decides what to show the player and
/// whether a retry makes sense; the transport never panics on I/O.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote service could not be reached (refused, unresolvable,
    /// or the connect timed out).
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Writing to an established connection failed.
    #[error("send failed: {0}")]
    Send(#[source] std::io::Error),

    /// Reading from an established connection failed (reset, partial read).
    #[error("receive failed: {0}")]
    Receive(#[source] std::io::Error),

    /// A request/response call failed before a response body was read.
    #[error("request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    ///
    /// The body is kept because the login service still sends a parsable
    /// response document alongside error statuses.
    #[error("unexpected status {status}")]
    Status { status: u16, body: Vec<u8> },

    /// No response arrived within the allotted time.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The connection was closed by either side.
    #[error("connection closed")]
    Closed,
}

impl TransportError {
    /// Returns the response body carried by a [`TransportError::Status`].
    ///
    /// `None` for every other variant, and for a status error whose body
    /// is empty.
    pub fn status_body(&self) -> Option<&[u8]> {
        match self {
            Self::Status { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        }
    }
}
