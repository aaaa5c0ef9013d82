//! Transient typing state with bounded server-side expiry.

use dashmap::DashMap;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Where a typing indicator is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypingScope {
    /// Typing in a direct chat with this user.
    Direct(Uuid),
    /// Typing in this group's chat.
    Group(Uuid),
}

impl TypingScope {
    /// The group ID carried on outbound typing signals, absent for direct
    /// chats.
    pub fn group_id(&self) -> Option<Uuid> {
        match self {
            TypingScope::Direct(_) => None,
            TypingScope::Group(group_id) => Some(*group_id),
        }
    }
}

/// Tracks who is typing where, never persisted.
///
/// Each entry owns the abort handle of its expiry timer so a crashed
/// client cannot leave a permanent typing ghost. Starting again within the
/// window restarts the timer.
#[derive(Debug, Default)]
pub struct TypingTracker {
    entries: DashMap<(Uuid, TypingScope), AbortHandle>,
}

impl TypingTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `sender` is typing in `scope`, replacing and cancelling
    /// any previous expiry timer for the same entry.
    pub fn start(&self, sender: Uuid, scope: TypingScope, expiry: AbortHandle) {
        if let Some(previous) = self.entries.insert((sender, scope), expiry) {
            previous.abort();
        }
    }

    /// Clears the entry for `sender` in `scope`, cancelling its expiry
    /// timer. Returns whether an entry existed.
    pub fn stop(&self, sender: Uuid, scope: TypingScope) -> bool {
        match self.entries.remove(&(sender, scope)) {
            Some((_, expiry)) => {
                expiry.abort();
                true
            }
            None => false,
        }
    }

    /// Clears the entry only if its timer is the calling task.
    ///
    /// Lets an expiry task remove its own entry without racing a restart
    /// that installed a fresh timer in the meantime. Must be called from
    /// within the timer task.
    pub fn expire(&self, sender: Uuid, scope: TypingScope) -> bool {
        let current = tokio::task::try_id();
        self.entries
            .remove_if(&(sender, scope), |_, expiry| current == Some(expiry.id()))
            .is_some()
    }

    /// Clears every entry belonging to `sender`, cancelling all timers.
    /// Called on disconnect.
    pub fn clear_sender(&self, sender: Uuid) {
        self.entries.retain(|(entry_sender, _), expiry| {
            if *entry_sender == sender {
                expiry.abort();
                false
            } else {
                true
            }
        });
    }

    /// Whether `sender` is currently typing in `scope`.
    pub fn is_typing(&self, sender: Uuid, scope: TypingScope) -> bool {
        self.entries.contains_key(&(sender, scope))
    }

    /// Number of live typing entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no one is typing anywhere.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_handle() -> AbortHandle {
        tokio::spawn(std::future::pending::<()>()).abort_handle()
    }

    #[tokio::test]
    async fn start_then_stop_leaves_no_entry() {
        let tracker = TypingTracker::new();
        let sender = Uuid::new_v4();
        let scope = TypingScope::Direct(Uuid::new_v4());

        tracker.start(sender, scope, dummy_handle());
        assert!(tracker.is_typing(sender, scope));

        assert!(tracker.stop(sender, scope));
        assert!(tracker.is_empty());
    }

    #[tokio::test]
    async fn restart_replaces_previous_timer() {
        let tracker = TypingTracker::new();
        let sender = Uuid::new_v4();
        let scope = TypingScope::Group(Uuid::new_v4());

        let first = tokio::spawn(std::future::pending::<()>());
        tracker.start(sender, scope, first.abort_handle());
        tracker.start(sender, scope, dummy_handle());

        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test]
    async fn clear_sender_removes_all_scopes() {
        let tracker = TypingTracker::new();
        let sender = Uuid::new_v4();
        let other = Uuid::new_v4();

        tracker.start(sender, TypingScope::Direct(Uuid::new_v4()), dummy_handle());
        tracker.start(sender, TypingScope::Group(Uuid::new_v4()), dummy_handle());
        tracker.start(other, TypingScope::Direct(Uuid::new_v4()), dummy_handle());

        tracker.clear_sender(sender);
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test]
    async fn stop_without_start_is_false() {
        let tracker = TypingTracker::new();
        assert!(!tracker.stop(Uuid::new_v4(), TypingScope::Direct(Uuid::new_v4())));
    }
}
