//! Frame inbox shared by the persistent connection types.
//!
//! A connection's reader task pushes frames into an unbounded channel; the
//! owner pulls them out with [`Inbox::recv`] (awaiting) or [`Inbox::poll`]
//! (non-blocking). The reader task is aborted when the inbox drops.

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;

use crate::TransportError;

/// Item produced by a reader task: a frame or the error that ended it.
pub(crate) type InboxItem = Result<Vec<u8>, TransportError>;

/// Sending half handed to a reader task.
pub(crate) type InboxSender = mpsc::UnboundedSender<InboxItem>;

pub(crate) struct Inbox {
    rx: Mutex<mpsc::UnboundedReceiver<InboxItem>>,
    reader: JoinHandle<()>,
}

impl Inbox {
    /// Spawns `reader` with a fresh sender and returns the receiving side.
    pub(crate) fn spawn<F, Fut>(reader: F) -> Self
    where
        F: FnOnce(InboxSender) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(reader(tx));
        Self {
            rx: Mutex::new(rx),
            reader,
        }
    }

    pub(crate) async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        match self.rx.lock().await.recv().await {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    pub(crate) fn poll(&self) -> Result<Option<Vec<u8>>, TransportError> {
        // Someone is already awaiting `recv`; they will get the frame.
        let Ok(mut rx) = self.rx.try_lock() else {
            return Ok(None);
        };
        match rx.try_recv() {
            Ok(Ok(frame)) => Ok(Some(frame)),
            Ok(Err(e)) => Err(e),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
