//! Session actor: a Tokio task that owns the [`SessionMachine`].
//!
//! The outside world talks to it through a [`SessionHandle`]. Login requests
//! run on their own tasks and report back with their [`RequestId`], so the
//! actor never waits on the network and a late answer is recognised as
//! stale. Outcomes are published as [`SessionEvent`]s for a UI to consume,
//! together with any server pushes from the login socket.

use std::sync::Arc;

use eos_protocol::{Credentials, Identity, LOGIN_PATH};
use eos_transport::{PushFrames, RequestTransport, TransportError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::handoff::{self, EntityHandle, IntentReceiver};
use crate::push::push_event;
use crate::{
    RequestId, SessionConfig, SessionError, SessionMachine, SessionState,
};

/// Something the UI should know about.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoginSucceeded { identity: Identity },
    /// The login did not go through; the session is idle again.
    LoginFailed { reason: String },
    LoggedOut,
    /// A message the server sent on its own. `body` is the frame without
    /// its delimiter.
    ServerPush { kind: String, body: String },
}

/// Receiving end of the session's event stream.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;

/// A point-in-time view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub identity: Option<Identity>,
    pub in_flight: Option<RequestId>,
    pub player: Option<EntityHandle>,
}

/// Commands sent to the session actor.
enum SessionCommand {
    SubmitLogin {
        credentials: Credentials,
        reply: oneshot::Sender<Result<RequestId, SessionError>>,
    },
    Logout {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
    Shutdown,
}

type Completion = (RequestId, Result<Vec<u8>, TransportError>);

/// A spawn acknowledgement: the login generation and the entity created.
type SpawnAck = (RequestId, EntityHandle);

/// Handle to a running session actor.
///
/// Cheap to clone. Every method fails with [`SessionError::Unavailable`]
/// once the actor has stopped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionCommand>,
    acks: mpsc::UnboundedSender<SpawnAck>,
}

impl SessionHandle {
    /// Submits a login and returns as soon as the request is issued.
    ///
    /// The outcome arrives later as a [`SessionEvent`].
    pub async fn submit_login(
        &self,
        credentials: Credentials,
    ) -> Result<RequestId, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::SubmitLogin {
                credentials,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)?
    }

    pub async fn logout(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Logout { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)?
    }

    /// Marks the transport as gone; an in-flight login is abandoned.
    pub async fn disconnect(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Disconnect { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Unavailable)?;
        reply_rx.await.map_err(|_| SessionError::Unavailable)
    }

    pub async fn state(&self) -> Result<SessionState, SessionError> {
        Ok(self.snapshot().await?.state)
    }

    /// Reports that `entity` was created for the spawn queued by login
    /// `generation` (see [`SpawnIntent::generation`]).
    ///
    /// Never waits, so the privileged context can call it mid-frame. An
    /// ack for a spawn that is no longer pending is discarded by the actor.
    ///
    /// [`SpawnIntent::generation`]: crate::SpawnIntent::generation
    pub fn acknowledge_spawn(
        &self,
        generation: RequestId,
        entity: EntityHandle,
    ) -> Result<(), SessionError> {
        self.acks
            .send((generation, entity))
            .map_err(|_| SessionError::Unavailable)
    }

    /// Tells the actor to stop. Requests still in flight are aborted.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.sender
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::Unavailable)
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct SessionActor<T: RequestTransport> {
    machine: SessionMachine,
    transport: Arc<T>,
    receiver: mpsc::Receiver<SessionCommand>,
    acks: mpsc::UnboundedReceiver<SpawnAck>,
    pushes: Option<PushFrames>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    events: mpsc::UnboundedSender<SessionEvent>,
    requests: JoinSet<()>,
}

impl<T: RequestTransport> SessionActor<T> {
    async fn run(mut self) {
        tracing::info!("session actor started");
        self.machine.mark_connected();

        loop {
            let deadline = self.machine.deadline().map(Instant::from_std);

            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Some((generation, entity)) = self.acks.recv() => {
                    self.handle_ack(generation, entity);
                }
                frame = next_push(&mut self.pushes) => match frame {
                    Some(frame) => {
                        if let Some(event) = push_event(&frame) {
                            self.emit(event);
                        }
                    }
                    None => {
                        tracing::info!("push channel closed");
                        self.pushes = None;
                    }
                },
                Some((id, result)) = self.completions.recv() => {
                    self.handle_completion(id, result);
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() =>
                {
                    self.handle_deadline();
                }
            }

            while self.requests.try_join_next().is_some() {}
        }

        self.requests.abort_all();
        tracing::info!("session actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::SubmitLogin { credentials, reply } => {
                let _ = reply.send(self.handle_submit(&credentials));
            }
            SessionCommand::Logout { reply } => {
                let result = self.machine.logout();
                if result.is_ok() {
                    self.emit(SessionEvent::LoggedOut);
                }
                let _ = reply.send(result);
            }
            SessionCommand::Disconnect { reply } => {
                self.machine.mark_disconnected();
                let _ = reply.send(());
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SessionCommand::Shutdown => {
                tracing::info!("session shutting down");
                return false;
            }
        }
        true
    }

    fn handle_submit(
        &mut self,
        credentials: &Credentials,
    ) -> Result<RequestId, SessionError> {
        let now = Instant::now().into_std();
        let ticket = self.machine.submit_login(credentials, now)?;

        let id = ticket.id;
        let transport = Arc::clone(&self.transport);
        let completions = self.completions_tx.clone();
        self.requests.spawn(async move {
            let result = transport.request(LOGIN_PATH, ticket.payload).await;
            let _ = completions.send((id, result));
        });
        Ok(id)
    }

    fn handle_completion(
        &mut self,
        id: RequestId,
        result: Result<Vec<u8>, TransportError>,
    ) {
        match self.machine.complete(id, result) {
            Ok(identity) => self.emit(SessionEvent::LoginSucceeded { identity }),
            Err(SessionError::StaleResponse(_)) => {}
            Err(err) => self.emit_failure(&err),
        }
    }

    fn handle_deadline(&mut self) {
        if let Err(err) = self.machine.expire(Instant::now().into_std()) {
            self.emit_failure(&err);
        }
    }

    fn handle_ack(&mut self, generation: RequestId, entity: EntityHandle) {
        if let Err(err) = self.machine.acknowledge_spawn(generation, entity) {
            tracing::debug!(%entity, error = %err, "ignoring spawn ack");
        }
    }

    fn emit_failure(&self, err: &SessionError) {
        let reason = match err {
            SessionError::AuthenticationFailed(message) => message.clone(),
            other => other.to_string(),
        };
        self.emit(SessionEvent::LoginFailed { reason });
    }

    fn emit(&self, event: SessionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.machine.state(),
            identity: self.machine.identity().cloned(),
            in_flight: self.machine.in_flight(),
            player: self.machine.player(),
        }
    }
}

/// Waits for the next push frame; never resolves without a push channel.
async fn next_push(pushes: &mut Option<PushFrames>) -> Option<Vec<u8>> {
    match pushes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Spawns a session actor on `transport`.
///
/// Returns the handle for commands, the event stream for the UI, and the
/// consuming half of the handoff queue for the privileged context.
pub fn spawn_session<T: RequestTransport>(
    transport: T,
    config: SessionConfig,
) -> (SessionHandle, SessionEvents, IntentReceiver) {
    start(transport, None, config)
}

/// Like [`spawn_session`], and also publishes the frames on `pushes` as
/// [`SessionEvent::ServerPush`].
pub fn spawn_session_with_pushes<T: RequestTransport>(
    transport: T,
    pushes: PushFrames,
    config: SessionConfig,
) -> (SessionHandle, SessionEvents, IntentReceiver) {
    start(transport, Some(pushes), config)
}

fn start<T: RequestTransport>(
    transport: T,
    pushes: Option<PushFrames>,
    config: SessionConfig,
) -> (SessionHandle, SessionEvents, IntentReceiver) {
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_size.max(1));
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();
    let (completions_tx, completions) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (intent_tx, intent_rx) = handoff::channel();

    let actor = SessionActor {
        machine: SessionMachine::new(config, intent_tx),
        transport: Arc::new(transport),
        receiver: cmd_rx,
        acks: ack_rx,
        pushes,
        completions_tx,
        completions,
        events: event_tx,
        requests: JoinSet::new(),
    };
    tokio::spawn(actor.run());

    let handle = SessionHandle {
        sender: cmd_tx,
        acks: ack_tx,
    };
    (handle, event_rx, intent_rx)
}
