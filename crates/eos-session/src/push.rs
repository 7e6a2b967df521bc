//! Server pushes on the login socket.
//!
//! The TCP socket the login service exposes carries messages the server
//! sends on its own next to login answers. [`route_socket_frame`] keeps
//! those out of the request queue; the session actor turns them into
//! [`SessionEvent::ServerPush`].

use eos_protocol::{MessageKind, answers_login, frame_kind, strip_frame};
use eos_transport::FrameRoute;

use crate::SessionEvent;

/// [`FrameRouter`](eos_transport::FrameRouter) for the login socket:
/// login answers go to the waiting request, everything else is a push.
pub fn route_socket_frame(frame: &[u8]) -> FrameRoute {
    if answers_login(frame) {
        FrameRoute::Response
    } else {
        FrameRoute::Push
    }
}

/// The event a pushed frame becomes, if any.
///
/// A login answer nobody asked for carries no request to match it against,
/// so it is dropped.
pub(crate) fn push_event(frame: &[u8]) -> Option<SessionEvent> {
    match frame_kind(frame) {
        Ok(Some(kind)) if kind != MessageKind::LoginResponse.as_str() => {
            let body = String::from_utf8_lossy(strip_frame(frame)).into_owned();
            tracing::info!(%kind, "server push received");
            Some(SessionEvent::ServerPush { kind, body })
        }
        Ok(_) => {
            tracing::debug!("ignoring login response with no request waiting");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, bytes = frame.len(), "ignoring undecodable push frame");
            None
        }
    }
}
