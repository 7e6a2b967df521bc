//! Session types: the state a client moves through while logging in, and
//! the knobs that control it.

use std::fmt;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for the login session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a login request may stay unanswered before the session
    /// gives up on it and returns to [`SessionState::Ready`].
    ///
    /// Default: 10 seconds.
    pub response_timeout: Duration,

    /// Capacity of the command channel into the session task. Callers
    /// wait when it is full.
    ///
    /// Default: 32.
    pub command_channel_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(10),
            command_channel_size: 32,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the client is in the login lifecycle.
///
/// ```text
///  Disconnected ──connect──→ Ready ──submit──→ AwaitingResponse
///                              ↑                 │        │
///                              │  fail/timeout   │        │ success
///                              ├─────────────────┘        ↓
///                              │                    Authenticated
///                              │                          │ (auto)
///                              │                          ↓
///                          LoggedOut ←──logout──── SpawnPending
///                              ↑                          │ spawn ack
///                              └───────logout──────── InWorld
/// ```
///
/// `Authenticated` and `LoggedOut` are passed through within a single
/// transition; outside observers see `SpawnPending` and `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No transport to talk to.
    Disconnected,
    /// Idle and able to accept a login.
    Ready,
    /// A login request is in flight.
    AwaitingResponse,
    /// The server accepted the login; identity is stored.
    Authenticated,
    /// A spawn has been handed to the privileged context.
    SpawnPending,
    /// The local player entity exists.
    InWorld,
    /// The player logged out; identity has been cleared.
    LoggedOut,
}

impl SessionState {
    /// Whether a login may be submitted.
    pub fn is_idle(self) -> bool {
        self == Self::Ready
    }

    /// Whether the session holds an identity.
    pub fn is_logged_in(self) -> bool {
        matches!(self, Self::Authenticated | Self::SpawnPending | Self::InWorld)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Ready => "ready",
            Self::AwaitingResponse => "awaiting_response",
            Self::Authenticated => "authenticated",
            Self::SpawnPending => "spawn_pending",
            Self::InWorld => "in_world",
            Self::LoggedOut => "logged_out",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// RequestId / LoginTicket
// ---------------------------------------------------------------------------

/// Generation number of a login request.
///
/// Every request the session issues gets the next id. A response is only
/// applied if it carries the id of the request currently in flight, so an
/// answer to a request that already timed out cannot overwrite newer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// What the caller needs to actually send an issued login request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginTicket {
    pub id: RequestId,
    /// Encoded request body.
    pub payload: Vec<u8>,
    /// After this instant the request is expired.
    pub deadline: Instant,
}
