//! Reverse index from connections to the channels they joined.

use std::collections::HashSet;

use dashmap::DashMap;
use uuid::Uuid;

use crate::connection::handle::ConnectionId;

/// Tracks which group channels each connection has joined, so disconnect
/// cleanup is O(joined channels) instead of a scan of every channel.
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    conn_to_groups: DashMap<ConnectionId, HashSet<Uuid>>,
}

impl SubscriptionTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a channel join.
    pub fn add(&self, conn_id: ConnectionId, group_id: Uuid) {
        self.conn_to_groups
            .entry(conn_id)
            .or_default()
            .insert(group_id);
    }

    /// Records a channel leave.
    pub fn remove(&self, conn_id: ConnectionId, group_id: Uuid) {
        if let Some(mut groups) = self.conn_to_groups.get_mut(&conn_id) {
            groups.remove(&group_id);
        }
    }

    /// All channels a connection has joined.
    pub fn joined_groups(&self, conn_id: ConnectionId) -> HashSet<Uuid> {
        self.conn_to_groups
            .get(&conn_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of channels a connection has joined.
    pub fn count(&self, conn_id: ConnectionId) -> usize {
        self.conn_to_groups
            .get(&conn_id)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Removes and returns every channel a connection had joined.
    pub fn remove_all(&self, conn_id: ConnectionId) -> HashSet<Uuid> {
        self.conn_to_groups
            .remove(&conn_id)
            .map(|(_, groups)| groups)
            .unwrap_or_default()
    }
}
