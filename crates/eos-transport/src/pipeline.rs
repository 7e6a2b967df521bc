//! Request/response over a persistent connection.
//!
//! The socket protocol has no request identifiers on the wire. The server
//! answers every request exactly once and the stream preserves order, so the
//! n-th response frame belongs to the n-th request written. [`LineRequester`]
//! keeps a FIFO of waiting callers and hands each response frame to the
//! oldest one. A caller that stopped caring (its request was superseded)
//! still receives its own late answer, so it never leaks into a newer call.
//!
//! The same socket also carries server pushes. A [`FrameRouter`] tells the
//! two apart; pushes, and responses nobody is waiting for, go to the
//! [`PushFrames`] stream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{Connection, RequestTransport, TransportError};

type Reply = oneshot::Sender<Result<Vec<u8>, TransportError>>;

/// Where an incoming frame belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRoute {
    /// The answer to the oldest outstanding request.
    Response,
    /// A server-initiated message.
    Push,
}

/// Classifies a raw frame, delimiter included.
pub type FrameRouter = fn(&[u8]) -> FrameRoute;

/// Frames the server sent on its own.
pub type PushFrames = mpsc::UnboundedReceiver<Vec<u8>>;

#[derive(Default)]
struct Waiters {
    queue: VecDeque<Reply>,
    closed: bool,
}

type SharedWaiters = Arc<Mutex<Waiters>>;

fn lock(waiters: &SharedWaiters) -> std::sync::MutexGuard<'_, Waiters> {
    waiters.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Adapts a [`Connection`] to the [`RequestTransport`] contract.
pub struct LineRequester<C: Connection> {
    conn: Arc<C>,
    waiters: SharedWaiters,
    /// Serializes "register waiter + write frame" so FIFO order matches
    /// the order frames hit the wire.
    send_lock: tokio::sync::Mutex<()>,
    dispatcher: JoinHandle<()>,
}

impl<C: Connection> LineRequester<C> {
    /// Takes ownership of `conn` and starts dispatching its frames.
    ///
    /// Every frame is treated as a response and unsolicited frames are
    /// logged and dropped.
    pub fn new(conn: C) -> Self {
        let (requester, _pushes) =
            Self::with_router(conn, |_: &[u8]| FrameRoute::Response);
        requester
    }

    /// Like [`new`](Self::new), but frames `router` marks as
    /// [`FrameRoute::Push`] skip the request queue and are delivered on
    /// the returned stream.
    pub fn with_router(conn: C, router: FrameRouter) -> (Self, PushFrames) {
        let conn = Arc::new(conn);
        let waiters = SharedWaiters::default();
        let (push_tx, push_rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch(
            Arc::clone(&conn),
            Arc::clone(&waiters),
            router,
            push_tx,
        ));
        let requester = Self {
            conn,
            waiters,
            send_lock: tokio::sync::Mutex::new(()),
            dispatcher,
        };
        (requester, push_rx)
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.conn
    }

    /// Number of requests written but not yet answered.
    pub fn in_flight(&self) -> usize {
        lock(&self.waiters).queue.len()
    }
}

impl<C: Connection> Drop for LineRequester<C> {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

async fn dispatch<C: Connection>(
    conn: Arc<C>,
    waiters: SharedWaiters,
    router: FrameRouter,
    pushes: mpsc::UnboundedSender<Vec<u8>>,
) {
    let id = conn.id();
    let failure = loop {
        match conn.recv().await {
            Ok(Some(frame)) => {
                let waiter = match router(&frame) {
                    FrameRoute::Response => lock(&waiters).queue.pop_front(),
                    FrameRoute::Push => None,
                };
                match waiter {
                    Some(reply) => {
                        let _ = reply.send(Ok(frame));
                    }
                    None => {
                        let bytes = frame.len();
                        if pushes.send(frame).is_err() {
                            tracing::info!(
                                %id,
                                bytes,
                                "unsolicited frame with no push listener, ignoring"
                            );
                        }
                    }
                }
            }
            Ok(None) => break None,
            Err(e) => break Some(e),
        }
    };

    let pending = {
        let mut w = lock(&waiters);
        w.closed = true;
        std::mem::take(&mut w.queue)
    };
    tracing::debug!(%id, pending = pending.len(), "push channel ended");

    let mut failure = failure;
    for reply in pending {
        let err = failure.take().unwrap_or(TransportError::Closed);
        let _ = reply.send(Err(err));
    }
}

impl<C: Connection> RequestTransport for LineRequester<C> {
    async fn request(
        &self,
        _path: &str,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, TransportError> {
        let rx = {
            let _guard = self.send_lock.lock().await;
            let (tx, rx) = oneshot::channel();
            {
                let mut w = lock(&self.waiters);
                if w.closed {
                    return Err(TransportError::Closed);
                }
                // Register before writing so a fast reply can't overtake us.
                w.queue.push_back(tx);
            }
            if let Err(e) = self.conn.send(&body).await {
                // We still hold the send lock, so ours is the newest entry.
                lock(&self.waiters).queue.pop_back();
                return Err(e);
            }
            rx
        };
        rx.await.map_err(|_| TransportError::Closed)?
    }
}
