//! Presence table mapping users to their one authoritative connection.

use dashmap::DashMap;
use uuid::Uuid;

use crate::connection::handle::ConnectionId;

/// In-memory source of truth for who is reachable right now and where.
///
/// A user has at most one live connection. Registering a second connection
/// for the same user supersedes the first, and the caller is expected to
/// close the superseded connection explicitly. A reverse index keeps
/// `unregister` O(1) in connected-user count.
#[derive(Debug, Default)]
pub struct PresenceTable {
    /// User ID -> authoritative connection.
    by_user: DashMap<Uuid, ConnectionId>,
    /// Connection ID -> user, reverse index for disconnect cleanup.
    by_conn: DashMap<ConnectionId, Uuid>,
}

impl PresenceTable {
    /// Creates an empty presence table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `conn_id` as the authoritative connection for `user_id`.
    ///
    /// A connection re-registering under a different user abandons its
    /// earlier identity, so no two users ever map to the same connection.
    /// Returns the superseded connection ID when the user was already
    /// registered elsewhere, so the caller can close it.
    pub fn register(&self, user_id: Uuid, conn_id: ConnectionId) -> Option<ConnectionId> {
        if let Some(prior_user) = self.by_conn.insert(conn_id, user_id) {
            if prior_user != user_id {
                self.by_user
                    .remove_if(&prior_user, |_, current| *current == conn_id);
            }
        }
        let previous = self.by_user.insert(user_id, conn_id);
        if let Some(old_conn) = previous {
            if old_conn != conn_id {
                self.by_conn.remove(&old_conn);
            }
        }
        previous.filter(|old| *old != conn_id)
    }

    /// Returns the connection currently routing for `user_id`, if any.
    pub fn lookup(&self, user_id: Uuid) -> Option<ConnectionId> {
        self.by_user.get(&user_id).map(|entry| *entry.value())
    }

    /// Removes the entry owned by `conn_id` and returns the user it
    /// represented.
    ///
    /// Returns `None` when the connection never joined, or when its entry
    /// was already superseded by a newer connection for the same user.
    pub fn unregister(&self, conn_id: ConnectionId) -> Option<Uuid> {
        let (_, user_id) = self.by_conn.remove(&conn_id)?;
        // Only drop the forward entry if it still points at this connection.
        self.by_user
            .remove_if(&user_id, |_, current| *current == conn_id);
        Some(user_id)
    }

    /// Returns all currently registered user IDs.
    pub fn snapshot(&self) -> Vec<Uuid> {
        self.by_user.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of online users.
    pub fn online_count(&self) -> usize {
        self.by_user.len()
    }

    /// Whether a user is currently registered.
    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.by_user.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_unregister_clears_lookup() {
        let table = PresenceTable::new();
        let user = Uuid::new_v4();
        let conn = Uuid::new_v4();

        assert!(table.register(user, conn).is_none());
        assert_eq!(table.lookup(user), Some(conn));

        assert_eq!(table.unregister(conn), Some(user));
        assert_eq!(table.lookup(user), None);
        assert!(table.snapshot().is_empty());
    }

    #[test]
    fn duplicate_join_supersedes_and_reports_old_connection() {
        let table = PresenceTable::new();
        let user = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert!(table.register(user, first).is_none());
        assert_eq!(table.register(user, second), Some(first));
        assert_eq!(table.lookup(user), Some(second));
        assert_eq!(table.online_count(), 1);
    }

    #[test]
    fn stale_unregister_does_not_evict_newer_connection() {
        let table = PresenceTable::new();
        let user = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        table.register(user, first);
        table.register(user, second);

        // The superseded connection disconnecting must not remove the
        // newer connection's entry.
        assert_eq!(table.unregister(first), None);
        assert_eq!(table.lookup(user), Some(second));
    }

    #[test]
    fn rejoining_as_a_different_user_drops_the_old_identity() {
        let table = PresenceTable::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let conn = Uuid::new_v4();

        table.register(alice, conn);
        table.register(bob, conn);

        assert_eq!(table.lookup(alice), None);
        assert_eq!(table.lookup(bob), Some(conn));
        assert_eq!(table.online_count(), 1);

        // The connection going away must not leave the first identity
        // online.
        assert_eq!(table.unregister(conn), Some(bob));
        assert!(table.snapshot().is_empty());
    }

    #[test]
    fn unregister_of_never_joined_connection_is_none() {
        let table = PresenceTable::new();
        assert_eq!(table.unregister(Uuid::new_v4()), None);
    }

    #[test]
    fn re_register_same_connection_reports_no_supersede() {
        let table = PresenceTable::new();
        let user = Uuid::new_v4();
        let conn = Uuid::new_v4();

        table.register(user, conn);
        assert!(table.register(user, conn).is_none());
        assert_eq!(table.lookup(user), Some(conn));
    }
}
