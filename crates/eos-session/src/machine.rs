//! The login state machine.
//!
//! [`SessionMachine`] is synchronous and does no I/O. It decides what to
//! send, validates what comes back, and posts spawn/despawn intents for the
//! privileged context. Time is passed in, so every transition (including
//! timeouts) is testable without a runtime.

use std::time::Instant;

use eos_protocol::{
    Credentials, Identity, LoginResult, decode_login_result, encode_login_request,
};
use eos_transport::TransportError;

use crate::handoff::{
    DespawnIntent, DespawnReason, EntityHandle, IntentSender, SpawnIntent,
};
use crate::{LoginTicket, RequestId, SessionConfig, SessionError, SessionState};

/// The request currently waiting for a response.
#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: RequestId,
    deadline: Instant,
}

/// Owns the session state, the player identity, and the producing half of
/// the handoff queue.
#[derive(Debug)]
pub struct SessionMachine {
    state: SessionState,
    config: SessionConfig,
    next_request: u64,
    in_flight: Option<InFlight>,
    identity: Option<Identity>,
    /// Generation of the spawn the world has not acknowledged yet.
    pending_spawn: Option<RequestId>,
    player: Option<EntityHandle>,
    intents: IntentSender,
}

impl SessionMachine {
    /// Creates a machine in [`SessionState::Disconnected`].
    pub fn new(config: SessionConfig, intents: IntentSender) -> Self {
        Self {
            state: SessionState::Disconnected,
            config,
            next_request: 1,
            in_flight: None,
            identity: None,
            pending_spawn: None,
            player: None,
            intents,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The identity assigned by the last successful login, until logout.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The local player entity, once the spawn has been acknowledged.
    pub fn player(&self) -> Option<EntityHandle> {
        self.player
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight.map(|f| f.id)
    }

    /// When the in-flight request expires, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.in_flight.map(|f| f.deadline)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    /// A transport became available. `Disconnected → Ready`; a no-op in any
    /// other state.
    pub fn mark_connected(&mut self) {
        if self.state == SessionState::Disconnected {
            self.transition(SessionState::Ready);
        }
    }

    /// The transport went away. Any in-flight request is forgotten (its
    /// result will be stale) and a spawned or pending player is released.
    pub fn mark_disconnected(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            tracing::debug!(request_id = %flight.id, "dropping in-flight request on disconnect");
        }
        if self.state.is_logged_in() {
            self.release_player(DespawnReason::Disconnected);
        }
        self.transition(SessionState::Disconnected);
    }

    // -----------------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------------

    /// Issues a login request. `Ready → AwaitingResponse`.
    ///
    /// # Errors
    /// - [`SessionError::NotConnected`] from `Disconnected`.
    /// - [`SessionError::AlreadyInProgress`] from any other non-idle state.
    /// - [`SessionError::Protocol`] if the request cannot be encoded; the
    ///   state is unchanged.
    pub fn submit_login(
        &mut self,
        credentials: &Credentials,
        now: Instant,
    ) -> Result<LoginTicket, SessionError> {
        match self.state {
            SessionState::Ready => {}
            SessionState::Disconnected => return Err(SessionError::NotConnected),
            other => return Err(SessionError::AlreadyInProgress(other)),
        }

        let payload = encode_login_request(credentials)?;
        let id = RequestId::new(self.next_request);
        self.next_request += 1;
        let deadline = now + self.config.response_timeout;
        self.in_flight = Some(InFlight { id, deadline });
        self.transition(SessionState::AwaitingResponse);

        tracing::info!(
            request_id = %id,
            user_id = credentials.user_id(),
            "login request issued"
        );
        Ok(LoginTicket {
            id,
            payload,
            deadline,
        })
    }

    /// Applies the outcome of request `id`.
    ///
    /// On success the identity is stored, a [`SpawnIntent`] is queued and
    /// the state ends in `SpawnPending`; the returned identity is a copy.
    /// Every failure returns the session to `Ready`.
    ///
    /// A `Status` transport error that carries a body is decoded like a
    /// normal response, so the server's rejection message is kept.
    ///
    /// # Errors
    /// - [`SessionError::StaleResponse`] if `id` is not the request in
    ///   flight. Nothing changes.
    /// - [`SessionError::AuthenticationFailed`] for `success: false`.
    /// - [`SessionError::Transport`] / [`SessionError::Protocol`] for
    ///   network or decode failures.
    /// - [`SessionError::Handoff`] if the spawn could not be queued.
    pub fn complete(
        &mut self,
        id: RequestId,
        result: Result<Vec<u8>, TransportError>,
    ) -> Result<Identity, SessionError> {
        match self.in_flight {
            Some(flight) if flight.id == id => {}
            _ => {
                tracing::debug!(
                    request_id = %id,
                    state = %self.state,
                    "discarding stale login response"
                );
                return Err(SessionError::StaleResponse(id));
            }
        }
        self.in_flight = None;

        let decoded = match result {
            Ok(bytes) => decode_login_result(&bytes).map_err(SessionError::from),
            Err(err) => match err.status_body().map(decode_login_result) {
                Some(Ok(result)) => Ok(result),
                _ => Err(SessionError::Transport(err)),
            },
        };

        let result = match decoded {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(request_id = %id, error = %err, "login request failed");
                self.transition(SessionState::Ready);
                return Err(err);
            }
        };

        match result {
            LoginResult::Rejected { message } => {
                tracing::info!(request_id = %id, %message, "login rejected");
                self.transition(SessionState::Ready);
                Err(SessionError::AuthenticationFailed(message))
            }
            LoginResult::Accepted { message, identity } => {
                tracing::info!(
                    request_id = %id,
                    user_no = identity.user_no,
                    nickname = %identity.nickname,
                    %message,
                    "login accepted"
                );
                self.identity = Some(identity.clone());
                self.transition(SessionState::Authenticated);
                self.begin_spawn(id, identity)
            }
        }
    }

    /// `Authenticated → SpawnPending`, queueing the spawn.
    fn begin_spawn(
        &mut self,
        generation: RequestId,
        identity: Identity,
    ) -> Result<Identity, SessionError> {
        let intent = SpawnIntent {
            generation,
            position: identity.last_position,
            identity: identity.clone(),
        };
        if let Err(err) = self.intents.spawn(intent) {
            tracing::warn!(error = %err, "could not queue player spawn");
            self.identity = None;
            self.transition(SessionState::Ready);
            return Err(err.into());
        }
        self.pending_spawn = Some(generation);
        self.transition(SessionState::SpawnPending);
        Ok(identity)
    }

    /// Expires the in-flight request if `now` is past its deadline.
    ///
    /// `Ok(())` when nothing expired.
    ///
    /// # Errors
    /// [`SessionError::TimedOut`] when the request was expired; the session
    /// is back in `Ready` and a late response will be stale.
    pub fn expire(&mut self, now: Instant) -> Result<(), SessionError> {
        let Some(flight) = self.in_flight else {
            return Ok(());
        };
        if now < flight.deadline {
            return Ok(());
        }

        self.in_flight = None;
        tracing::warn!(
            request_id = %flight.id,
            timeout = ?self.config.response_timeout,
            "login request timed out"
        );
        self.transition(SessionState::Ready);
        Err(SessionError::TimedOut(self.config.response_timeout))
    }

    // -----------------------------------------------------------------------
    // World
    // -----------------------------------------------------------------------

    /// The privileged context created the player for the spawn queued by
    /// login `generation`. `SpawnPending → InWorld`.
    ///
    /// # Errors
    /// [`SessionError::StaleSpawn`] unless `generation` is the spawn still
    /// waiting for its ack, e.g. an ack for a player that already logged
    /// out, arriving after the next login queued its own spawn. Nothing
    /// changes.
    pub fn acknowledge_spawn(
        &mut self,
        generation: RequestId,
        entity: EntityHandle,
    ) -> Result<(), SessionError> {
        if self.pending_spawn != Some(generation) {
            tracing::debug!(
                %generation,
                %entity,
                state = %self.state,
                "discarding stale spawn acknowledgement"
            );
            return Err(SessionError::StaleSpawn(generation));
        }
        self.pending_spawn = None;
        self.player = Some(entity);
        self.transition(SessionState::InWorld);
        Ok(())
    }

    /// Logs the player out. `InWorld | SpawnPending → LoggedOut → Ready`.
    ///
    /// Clears the identity and queues a despawn. From `SpawnPending` the
    /// despawn is queued behind the spawn, so the player is created and then
    /// removed.
    ///
    /// # Errors
    /// [`SessionError::InvalidState`] when nobody is logged in.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::InWorld | SessionState::SpawnPending) {
            return Err(SessionError::InvalidState(format!(
                "cannot log out while {}",
                self.state
            )));
        }

        self.release_player(DespawnReason::Logout);
        self.transition(SessionState::LoggedOut);
        self.transition(SessionState::Ready);
        Ok(())
    }

    fn release_player(&mut self, reason: DespawnReason) {
        self.identity = None;
        self.pending_spawn = None;
        self.player = None;
        if let Err(err) = self.intents.despawn(DespawnIntent { reason }) {
            // Without a consumer there is no scene left to clean up.
            tracing::debug!(error = %err, %reason, "despawn not queued");
        }
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            tracing::debug!(from = %self.state, %to, "session state changed");
            self.state = to;
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use eos_protocol::{Position, ProtocolError};

    use super::*;
    use crate::handoff::{self, HandoffError, Intent, IntentReceiver};

    const ACCEPTED: &[u8] = br#"{"type":"LOGIN_RESPONSE","success":true,"message":"ok","userData":{"userNo":1,"userId":"abc","nickname":"Rin","gold":100,"lastX":3.0,"lastY":4.0}}"#;
    const REJECTED: &[u8] =
        br#"{"type":"LOGIN_RESPONSE","success":false,"message":"no such user"}"#;

    fn ready_machine() -> (SessionMachine, IntentReceiver) {
        let (tx, rx) = handoff::channel();
        let mut machine = SessionMachine::new(SessionConfig::default(), tx);
        machine.mark_connected();
        (machine, rx)
    }

    fn creds() -> Credentials {
        Credentials::new("abc").unwrap()
    }

    /// Drives a machine to `InWorld` with entity 7.
    fn in_world() -> (SessionMachine, IntentReceiver) {
        let (mut m, mut rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();
        m.complete(ticket.id, Ok(ACCEPTED.to_vec())).unwrap();
        rx.drain();
        m.acknowledge_spawn(ticket.id, EntityHandle::new(7)).unwrap();
        (m, rx)
    }

    // =====================================================================
    // Connection
    // =====================================================================

    #[test]
    fn test_new_machine_starts_disconnected() {
        let (tx, _rx) = handoff::channel();
        let m = SessionMachine::new(SessionConfig::default(), tx);
        assert_eq!(m.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_submit_login_while_disconnected_is_not_connected() {
        let (tx, _rx) = handoff::channel();
        let mut m = SessionMachine::new(SessionConfig::default(), tx);

        let err = m.submit_login(&creds(), Instant::now()).unwrap_err();

        assert!(matches!(err, SessionError::NotConnected));
        assert_eq!(m.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_mark_connected_twice_is_noop() {
        let (mut m, _rx) = ready_machine();
        m.mark_connected();
        assert_eq!(m.state(), SessionState::Ready);
    }

    // =====================================================================
    // submit_login
    // =====================================================================

    #[test]
    fn test_submit_login_from_ready_awaits_response() {
        let (mut m, _rx) = ready_machine();
        let now = Instant::now();

        let ticket = m.submit_login(&creds(), now).unwrap();

        assert_eq!(m.state(), SessionState::AwaitingResponse);
        assert_eq!(m.in_flight(), Some(ticket.id));
        assert_eq!(ticket.payload, br#"{"type":"LOGIN","userId":"abc"}"#);
        assert_eq!(ticket.deadline, now + Duration::from_secs(10));
    }

    #[test]
    fn test_submit_login_twice_is_already_in_progress() {
        let (mut m, _rx) = ready_machine();
        let first = m.submit_login(&creds(), Instant::now()).unwrap();

        let err = m.submit_login(&creds(), Instant::now()).unwrap_err();

        assert!(matches!(
            err,
            SessionError::AlreadyInProgress(SessionState::AwaitingResponse)
        ));
        // The first request is still the one in flight.
        assert_eq!(m.in_flight(), Some(first.id));
    }

    #[test]
    fn test_submit_login_while_in_world_is_already_in_progress() {
        let (mut m, _rx) = in_world();
        let err = m.submit_login(&creds(), Instant::now()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::AlreadyInProgress(SessionState::InWorld)
        ));
    }

    #[test]
    fn test_request_ids_increase() {
        let (mut m, _rx) = ready_machine();
        let a = m.submit_login(&creds(), Instant::now()).unwrap().id;
        m.complete(a, Ok(REJECTED.to_vec())).unwrap_err();
        let b = m.submit_login(&creds(), Instant::now()).unwrap().id;
        assert!(b > a);
    }

    // =====================================================================
    // complete
    // =====================================================================

    #[test]
    fn test_complete_success_stores_identity_and_queues_spawn() {
        let (mut m, mut rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();

        let identity = m.complete(ticket.id, Ok(ACCEPTED.to_vec())).unwrap();

        assert_eq!(identity.user_no, 1);
        assert_eq!(identity.nickname, "Rin");
        assert_eq!(identity.gold, 100);
        assert_eq!(m.state(), SessionState::SpawnPending);
        assert_eq!(m.identity(), Some(&identity));
        assert_eq!(m.in_flight(), None);

        let intents = rx.drain();
        assert_eq!(intents.len(), 1);
        match &intents[0] {
            Intent::Spawn(spawn) => {
                assert_eq!(spawn.generation, ticket.id);
                assert_eq!(spawn.position, Position::new(3.0, 4.0));
                assert_eq!(spawn.identity, identity);
            }
            other => panic!("expected spawn, got {other:?}"),
        }
    }

    #[test]
    fn test_complete_rejection_returns_to_ready_without_spawn() {
        let (mut m, mut rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();

        let err = m.complete(ticket.id, Ok(REJECTED.to_vec())).unwrap_err();

        match err {
            SessionError::AuthenticationFailed(msg) => assert_eq!(msg, "no such user"),
            other => panic!("expected AuthenticationFailed, got {other:?}"),
        }
        assert_eq!(m.state(), SessionState::Ready);
        assert!(m.identity().is_none());
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_complete_missing_user_data_is_protocol_error() {
        let (mut m, mut rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();

        let err = m
            .complete(ticket.id, Ok(br#"{"success":true,"userData":null}"#.to_vec()))
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::Protocol(ProtocolError::MissingUserData)
        ));
        assert_eq!(m.state(), SessionState::Ready);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_complete_transport_error_is_retryable() {
        let (mut m, _rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();

        let err = m.complete(ticket.id, Err(TransportError::Closed)).unwrap_err();

        assert!(matches!(err, SessionError::Transport(TransportError::Closed)));
        assert_eq!(m.state(), SessionState::Ready);
        assert!(m.submit_login(&creds(), Instant::now()).is_ok());
    }

    #[test]
    fn test_complete_status_error_body_is_decoded() {
        let (mut m, _rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();

        let err = m
            .complete(
                ticket.id,
                Err(TransportError::Status {
                    status: 401,
                    body: REJECTED.to_vec(),
                }),
            )
            .unwrap_err();

        assert!(
            matches!(err, SessionError::AuthenticationFailed(ref m) if m == "no such user"),
            "got {err:?}"
        );
    }

    #[test]
    fn test_complete_status_error_with_garbage_body_keeps_transport_error() {
        let (mut m, _rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();

        let err = m
            .complete(
                ticket.id,
                Err(TransportError::Status {
                    status: 502,
                    body: b"<html>bad gateway</html>".to_vec(),
                }),
            )
            .unwrap_err();

        assert!(matches!(
            err,
            SessionError::Transport(TransportError::Status { status: 502, .. })
        ));
        assert_eq!(m.state(), SessionState::Ready);
    }

    #[test]
    fn test_complete_unknown_id_is_stale_and_changes_nothing() {
        let (mut m, mut rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();
        let bogus = RequestId::new(ticket.id.into_inner() + 100);

        let err = m.complete(bogus, Ok(ACCEPTED.to_vec())).unwrap_err();

        assert!(matches!(err, SessionError::StaleResponse(id) if id == bogus));
        assert_eq!(m.state(), SessionState::AwaitingResponse);
        assert_eq!(m.in_flight(), Some(ticket.id));
        assert!(rx.drain().is_empty());
    }

    // =====================================================================
    // expire
    // =====================================================================

    #[test]
    fn test_expire_before_deadline_does_nothing() {
        let (mut m, _rx) = ready_machine();
        let now = Instant::now();
        m.submit_login(&creds(), now).unwrap();

        assert!(m.expire(now + Duration::from_secs(9)).is_ok());
        assert_eq!(m.state(), SessionState::AwaitingResponse);
    }

    #[test]
    fn test_expire_after_deadline_times_out_to_ready() {
        let (mut m, _rx) = ready_machine();
        let now = Instant::now();
        m.submit_login(&creds(), now).unwrap();

        let err = m.expire(now + Duration::from_secs(10)).unwrap_err();

        assert!(matches!(err, SessionError::TimedOut(d) if d == Duration::from_secs(10)));
        assert_eq!(m.state(), SessionState::Ready);
        assert_eq!(m.in_flight(), None);
    }

    #[test]
    fn test_late_response_after_timeout_is_stale() {
        let (mut m, mut rx) = ready_machine();
        let now = Instant::now();
        let old = m.submit_login(&creds(), now).unwrap();
        m.expire(now + Duration::from_secs(11)).unwrap_err();

        // A new attempt is under way when the old answer finally shows up.
        let new = m.submit_login(&creds(), now + Duration::from_secs(12)).unwrap();
        let err = m.complete(old.id, Ok(ACCEPTED.to_vec())).unwrap_err();

        assert!(matches!(err, SessionError::StaleResponse(_)));
        assert_eq!(m.state(), SessionState::AwaitingResponse);
        assert_eq!(m.in_flight(), Some(new.id));
        assert!(m.identity().is_none());
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_expire_without_request_is_noop() {
        let (mut m, _rx) = ready_machine();
        assert!(m.expire(Instant::now()).is_ok());
    }

    // =====================================================================
    // acknowledge_spawn / logout
    // =====================================================================

    #[test]
    fn test_acknowledge_spawn_enters_world() {
        let (m, _rx) = in_world();
        assert_eq!(m.state(), SessionState::InWorld);
        assert_eq!(m.player(), Some(EntityHandle::new(7)));
    }

    #[test]
    fn test_acknowledge_spawn_outside_spawn_pending_is_stale() {
        let (mut m, _rx) = ready_machine();
        let err = m
            .acknowledge_spawn(RequestId::new(1), EntityHandle::new(1))
            .unwrap_err();
        assert!(matches!(err, SessionError::StaleSpawn(_)));
        assert_eq!(m.state(), SessionState::Ready);
        assert!(m.player().is_none());
    }

    #[test]
    fn test_acknowledge_spawn_for_previous_login_is_stale() {
        let (mut m, mut rx) = ready_machine();
        let first = m.submit_login(&creds(), Instant::now()).unwrap();
        m.complete(first.id, Ok(ACCEPTED.to_vec())).unwrap();
        m.logout().unwrap();
        // The world takes the first spawn and the despawn, but its ack is
        // still queued when the next login lands.
        rx.drain();
        let second = m.submit_login(&creds(), Instant::now()).unwrap();
        m.complete(second.id, Ok(ACCEPTED.to_vec())).unwrap();

        let err = m
            .acknowledge_spawn(first.id, EntityHandle::new(1))
            .unwrap_err();

        assert!(matches!(err, SessionError::StaleSpawn(id) if id == first.id));
        assert_eq!(m.state(), SessionState::SpawnPending);
        assert!(m.player().is_none());

        m.acknowledge_spawn(second.id, EntityHandle::new(2)).unwrap();
        assert_eq!(m.state(), SessionState::InWorld);
        assert_eq!(m.player(), Some(EntityHandle::new(2)));
    }

    #[test]
    fn test_acknowledge_spawn_twice_is_stale() {
        let (mut m, _rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();
        m.complete(ticket.id, Ok(ACCEPTED.to_vec())).unwrap();
        m.acknowledge_spawn(ticket.id, EntityHandle::new(1)).unwrap();

        let err = m
            .acknowledge_spawn(ticket.id, EntityHandle::new(9))
            .unwrap_err();

        assert!(matches!(err, SessionError::StaleSpawn(_)));
        assert_eq!(m.player(), Some(EntityHandle::new(1)));
    }

    #[test]
    fn test_logout_from_world_clears_identity_and_queues_despawn() {
        let (mut m, mut rx) = in_world();

        m.logout().unwrap();

        assert_eq!(m.state(), SessionState::Ready);
        assert!(m.identity().is_none());
        assert!(m.player().is_none());
        assert_eq!(
            rx.drain(),
            vec![Intent::Despawn(DespawnIntent {
                reason: DespawnReason::Logout
            })]
        );
    }

    #[test]
    fn test_logout_while_spawn_pending_queues_despawn_after_spawn() {
        let (mut m, mut rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();
        m.complete(ticket.id, Ok(ACCEPTED.to_vec())).unwrap();

        m.logout().unwrap();

        let intents = rx.drain();
        assert_eq!(intents.len(), 2);
        assert!(matches!(intents[0], Intent::Spawn(_)));
        assert!(matches!(intents[1], Intent::Despawn(_)));

        // The ack for the spawn that was undone arrives late.
        assert!(m.acknowledge_spawn(ticket.id, EntityHandle::new(1)).is_err());
        assert_eq!(m.state(), SessionState::Ready);
    }

    #[test]
    fn test_logout_while_idle_is_invalid() {
        let (mut m, _rx) = ready_machine();
        assert!(matches!(m.logout(), Err(SessionError::InvalidState(_))));
    }

    #[test]
    fn test_login_again_after_logout() {
        let (mut m, mut rx) = in_world();
        m.logout().unwrap();
        rx.drain();

        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();
        m.complete(ticket.id, Ok(ACCEPTED.to_vec())).unwrap();

        assert_eq!(m.state(), SessionState::SpawnPending);
    }

    #[test]
    fn test_second_spawn_before_consumer_drains_is_handoff_error() {
        let (mut m, _rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();
        m.complete(ticket.id, Ok(ACCEPTED.to_vec())).unwrap();
        m.logout().unwrap();

        // Nobody drained the first spawn yet.
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();
        let err = m.complete(ticket.id, Ok(ACCEPTED.to_vec())).unwrap_err();

        assert!(matches!(
            err,
            SessionError::Handoff(HandoffError::SpawnAlreadyPending)
        ));
        assert_eq!(m.state(), SessionState::Ready);
        assert!(m.identity().is_none());
    }

    // =====================================================================
    // mark_disconnected
    // =====================================================================

    #[test]
    fn test_mark_disconnected_drops_in_flight_request() {
        let (mut m, _rx) = ready_machine();
        let ticket = m.submit_login(&creds(), Instant::now()).unwrap();

        m.mark_disconnected();

        assert_eq!(m.state(), SessionState::Disconnected);
        assert!(matches!(
            m.complete(ticket.id, Ok(ACCEPTED.to_vec())),
            Err(SessionError::StaleResponse(_))
        ));
    }

    #[test]
    fn test_mark_disconnected_in_world_releases_player() {
        let (mut m, mut rx) = in_world();

        m.mark_disconnected();

        assert!(m.identity().is_none());
        assert_eq!(
            rx.drain(),
            vec![Intent::Despawn(DespawnIntent {
                reason: DespawnReason::Disconnected
            })]
        );
    }
}
