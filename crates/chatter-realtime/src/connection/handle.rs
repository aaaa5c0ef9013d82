//! Individual connection handle.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::signal::ServerSignal;

/// Unique connection identifier, assigned at connect time, never reused.
pub type ConnectionId = Uuid;

/// A handle to a single live client connection.
///
/// Holds the sender half of the connection's outbound queue plus the
/// transient session state: which user (if any) has joined on it. Group
/// channel membership lives in the channel registry, keyed by this
/// handle's id.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// User identity claimed via the join signal, if any.
    pub user_id: tokio::sync::RwLock<Option<Uuid>>,
    /// Sender for outbound signals. Taken on close so the transport's
    /// forwarder observes end-of-queue and can shut the socket.
    sender: Mutex<Option<mpsc::Sender<ServerSignal>>>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Creates a handle with a fresh ID wrapping the given outbound sender.
    pub fn new(sender: mpsc::Sender<ServerSignal>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: tokio::sync::RwLock::new(None),
            sender: Mutex::new(Some(sender)),
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
        }
    }

    /// Pushes a signal onto this connection's outbound queue.
    ///
    /// Best-effort: a full queue drops the signal with a warning, a closed
    /// queue marks the connection dead. Returns whether the signal was
    /// enqueued.
    pub fn send(&self, signal: ServerSignal) -> bool {
        if !self.is_alive() {
            return false;
        }
        let guard = self.sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(sender) = guard.as_ref() else {
            return false;
        };
        match sender.try_send(signal) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "outbound queue full, dropping signal");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// The joined user identity, if the connection has joined.
    pub async fn joined_user(&self) -> Option<Uuid> {
        *self.user_id.read().await
    }

    /// Records the user identity claimed by a join signal.
    pub async fn set_joined_user(&self, user_id: Uuid) {
        *self.user_id.write().await = Some(user_id);
    }

    /// Whether the connection is still alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Marks the connection dead so no further signals are enqueued.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Closes the connection: marks it dead and drops the outbound sender.
    ///
    /// Signals already queued remain deliverable; once the transport drains
    /// them its receiver ends, which is its cue to shut the socket.
    pub fn close(&self) {
        self.mark_dead();
        self.sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_after_receiver_dropped_marks_dead() {
        let (tx, rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(tx);
        drop(rx);

        assert!(!handle.send(ServerSignal::PresenceSnapshot { online: vec![] }));
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn close_delivers_queued_signals_then_ends_the_queue() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(tx);

        assert!(handle.send(ServerSignal::PresenceSnapshot { online: vec![] }));
        handle.close();

        assert!(!handle.is_alive());
        assert!(!handle.send(ServerSignal::PresenceSnapshot { online: vec![] }));
        assert!(matches!(
            rx.recv().await,
            Some(ServerSignal::PresenceSnapshot { .. })
        ));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn join_identity_is_recorded() {
        let (tx, _rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(tx);

        assert_eq!(handle.joined_user().await, None);
        let user = Uuid::new_v4();
        handle.set_joined_user(user).await;
        assert_eq!(handle.joined_user().await, Some(user));
    }
}
