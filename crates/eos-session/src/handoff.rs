//! Execution handoff queue.
//!
//! Login results arrive on network tasks, but entities may only be created
//! on the privileged context that owns the scene. The session posts
//! [`Intent`]s into this queue and the privileged context drains it once
//! per frame.
//!
//! The queue is FIFO: a spawn followed by a logout is applied as spawn then
//! despawn, never the other way round. At most one spawn can be waiting at a
//! time; the flag is cleared when the consumer takes the spawn off the queue.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eos_protocol::{Identity, Position};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::RequestId;

/// Opaque reference to an entity created by the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(u64);

impl EntityHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

/// Create the local player at `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnIntent {
    /// The login that produced this spawn. Echoed back with the spawn
    /// acknowledgement so a late ack for an earlier login is recognised.
    pub generation: RequestId,
    pub position: Position,
    pub identity: Identity,
}

/// Remove the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DespawnIntent {
    pub reason: DespawnReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DespawnReason {
    Logout,
    Disconnected,
}

impl fmt::Display for DespawnReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Logout => f.write_str("logout"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// A unit of work for the privileged context.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Spawn(SpawnIntent),
    Despawn(DespawnIntent),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandoffError {
    /// A spawn is already queued and has not been taken yet.
    #[error("a spawn is already pending")]
    SpawnAlreadyPending,

    /// The consuming side has been dropped.
    #[error("handoff queue is closed")]
    Closed,
}

/// Creates a connected sender/receiver pair.
pub fn channel() -> (IntentSender, IntentReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawn_pending = Arc::new(AtomicBool::new(false));
    (
        IntentSender {
            tx,
            spawn_pending: Arc::clone(&spawn_pending),
        },
        IntentReceiver { rx, spawn_pending },
    )
}

/// Producing half, owned by the session.
#[derive(Debug)]
pub struct IntentSender {
    tx: mpsc::UnboundedSender<Intent>,
    spawn_pending: Arc<AtomicBool>,
}

impl IntentSender {
    /// Queues a spawn.
    ///
    /// # Errors
    /// [`HandoffError::SpawnAlreadyPending`] if an earlier spawn is still
    /// waiting, [`HandoffError::Closed`] if the receiver is gone.
    pub fn spawn(&self, intent: SpawnIntent) -> Result<(), HandoffError> {
        if self
            .spawn_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(HandoffError::SpawnAlreadyPending);
        }
        if self.tx.send(Intent::Spawn(intent)).is_err() {
            self.spawn_pending.store(false, Ordering::Release);
            return Err(HandoffError::Closed);
        }
        Ok(())
    }

    /// Queues a despawn.
    pub fn despawn(&self, intent: DespawnIntent) -> Result<(), HandoffError> {
        self.tx
            .send(Intent::Despawn(intent))
            .map_err(|_| HandoffError::Closed)
    }

    /// Whether a spawn is queued and not yet taken.
    pub fn is_spawn_pending(&self) -> bool {
        self.spawn_pending.load(Ordering::Acquire)
    }
}

/// Consuming half, owned by the privileged context.
#[derive(Debug)]
pub struct IntentReceiver {
    rx: mpsc::UnboundedReceiver<Intent>,
    spawn_pending: Arc<AtomicBool>,
}

impl IntentReceiver {
    /// Takes the next intent without waiting.
    ///
    /// `None` when the queue is empty or the sender has been dropped.
    pub fn try_next(&mut self) -> Option<Intent> {
        match self.rx.try_recv() {
            Ok(intent) => {
                if matches!(intent, Intent::Spawn(_)) {
                    self.spawn_pending.store(false, Ordering::Release);
                }
                Some(intent)
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Takes everything currently queued, in enqueue order.
    pub fn drain(&mut self) -> Vec<Intent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_intent(nickname: &str) -> SpawnIntent {
        SpawnIntent {
            generation: RequestId::new(1),
            position: Position::new(3.0, 4.0),
            identity: Identity {
                user_no: 1,
                user_id: "abc".into(),
                nickname: nickname.into(),
                gold: 0,
                last_position: Position::new(3.0, 4.0),
            },
        }
    }

    const LOGOUT: DespawnIntent = DespawnIntent {
        reason: DespawnReason::Logout,
    };

    #[test]
    fn test_drain_returns_intents_in_enqueue_order() {
        let (tx, mut rx) = channel();
        tx.spawn(spawn_intent("Rin")).unwrap();
        tx.despawn(LOGOUT).unwrap();

        let intents = rx.drain();

        assert_eq!(intents.len(), 2);
        assert!(matches!(intents[0], Intent::Spawn(_)));
        assert_eq!(intents[1], Intent::Despawn(LOGOUT));
    }

    #[test]
    fn test_drain_empty_queue_returns_nothing() {
        let (_tx, mut rx) = channel();
        assert!(rx.drain().is_empty());
        assert!(rx.try_next().is_none());
    }

    #[test]
    fn test_spawn_rejects_second_pending_spawn() {
        let (tx, _rx) = channel();
        tx.spawn(spawn_intent("Rin")).unwrap();

        assert_eq!(
            tx.spawn(spawn_intent("Rin")),
            Err(HandoffError::SpawnAlreadyPending)
        );
    }

    #[test]
    fn test_spawn_allowed_again_after_consumer_takes_it() {
        let (tx, mut rx) = channel();
        tx.spawn(spawn_intent("Rin")).unwrap();
        assert!(tx.is_spawn_pending());

        assert!(matches!(rx.try_next(), Some(Intent::Spawn(_))));
        assert!(!tx.is_spawn_pending());

        tx.spawn(spawn_intent("Kai")).unwrap();
    }

    #[test]
    fn test_send_after_receiver_dropped_is_closed() {
        let (tx, rx) = channel();
        drop(rx);

        assert_eq!(tx.spawn(spawn_intent("Rin")), Err(HandoffError::Closed));
        assert!(!tx.is_spawn_pending(), "failed spawn must not stay pending");
        assert_eq!(tx.despawn(LOGOUT), Err(HandoffError::Closed));
    }

    #[test]
    fn test_receiver_drains_remaining_after_sender_dropped() {
        let (tx, mut rx) = channel();
        tx.despawn(LOGOUT).unwrap();
        drop(tx);

        assert_eq!(rx.drain(), vec![Intent::Despawn(LOGOUT)]);
        assert!(rx.try_next().is_none());
    }

    #[test]
    fn test_entity_handle_display() {
        assert_eq!(EntityHandle::new(12).to_string(), "E-12");
    }
}
