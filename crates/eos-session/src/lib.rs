//! Login session for the EOS client.
//!
//! This crate takes the client from "not logged in" to "player in the
//! world":
//!
//! 1. **State machine** ([`SessionMachine`]): validates transitions, issues
//!    login requests, applies responses, expires requests that take too
//!    long, and discards answers to requests that are no longer current.
//! 2. **Handoff queue** ([`handoff`]): carries spawn and despawn intents
//!    from the session to the privileged context that owns the scene.
//! 3. **Session actor** ([`spawn_session`], [`SessionHandle`]): runs the
//!    machine on a Tokio task against a [`RequestTransport`] and publishes
//!    [`SessionEvent`]s.
//!
//! # How it fits in the stack
//!
//! ```text
//! World (above)     ← drains intents, acknowledges spawns
//!     ↕
//! Session (this crate)
//!     ↕
//! Protocol / Transport (below)
//! ```
//!
//! [`RequestTransport`]: eos_transport::RequestTransport

mod driver;
mod error;
pub mod handoff;
mod machine;
mod push;
mod session;

pub use driver::{
    SessionEvent, SessionEvents, SessionHandle, SessionSnapshot, spawn_session,
    spawn_session_with_pushes,
};
pub use error::SessionError;
pub use handoff::{
    DespawnIntent, DespawnReason, EntityHandle, HandoffError, Intent,
    IntentReceiver, IntentSender, SpawnIntent,
};
pub use machine::SessionMachine;
pub use push::route_socket_frame;
pub use session::{LoginTicket, RequestId, SessionConfig, SessionState};
