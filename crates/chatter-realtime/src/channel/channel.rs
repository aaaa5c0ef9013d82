//! A single group channel with its member connections.

use std::collections::HashSet;
use uuid::Uuid;

use crate::connection::handle::ConnectionId;

/// The set of connections that have opted in to one group's fan-out.
///
/// Distinct from the group's persisted membership: a connection must join
/// the channel explicitly after connecting to receive live delivery.
#[derive(Debug, Clone)]
pub struct Channel {
    /// The group this channel fans out for.
    pub group_id: Uuid,
    /// Member connection IDs.
    members: HashSet<ConnectionId>,
}

impl Channel {
    /// Creates an empty channel for a group.
    pub fn new(group_id: Uuid) -> Self {
        Self {
            group_id,
            members: HashSet::new(),
        }
    }

    /// Adds a member connection.
    pub fn join(&mut self, conn_id: ConnectionId) {
        self.members.insert(conn_id);
    }

    /// Removes a member connection. No-op if not a member.
    pub fn leave(&mut self, conn_id: ConnectionId) {
        self.members.remove(&conn_id);
    }

    /// Whether the given connection is a member.
    pub fn contains(&self, conn_id: ConnectionId) -> bool {
        self.members.contains(&conn_id)
    }

    /// Whether the channel has no members left.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of member connections.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Returns all member connection IDs.
    pub fn members(&self) -> Vec<ConnectionId> {
        self.members.iter().copied().collect()
    }
}
