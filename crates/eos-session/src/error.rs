//! Error types for the session layer.

use std::time::Duration;

use eos_protocol::ProtocolError;
use eos_transport::TransportError;

use crate::{HandoffError, RequestId, SessionState};

/// Errors that can occur while logging in and out.
///
/// None of these are fatal: after a failed login the session is back in
/// [`SessionState::Ready`] and a new attempt may be submitted.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server answered and refused the login. Carries the server's
    /// message.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A login was submitted while the session was not idle.
    #[error("login already in progress (session is {0})")]
    AlreadyInProgress(SessionState),

    /// A login was submitted before a transport was available.
    #[error("not connected")]
    NotConnected,

    /// No response arrived within the configured timeout.
    #[error("login timed out after {0:?}")]
    TimedOut(Duration),

    /// A response arrived for a request that is no longer in flight.
    /// It was discarded and the session state is untouched.
    #[error("stale response for {0}")]
    StaleResponse(RequestId),

    /// A spawn acknowledgement named a login whose spawn is no longer the
    /// one waiting. It was discarded and the session state is untouched.
    #[error("stale spawn acknowledgement for {0}")]
    StaleSpawn(RequestId),

    /// The operation does not apply to the current state, e.g. logging out
    /// while idle.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),

    /// The session task has stopped.
    #[error("session task is not running")]
    Unavailable,
}
