//! Channel registry managing every group channel and its memberships.

use dashmap::DashMap;
use uuid::Uuid;

use crate::connection::handle::ConnectionId;

use super::channel::Channel;
use super::subscription::SubscriptionTracker;

/// Registry of all active group channels.
///
/// Channels are created lazily on first join and dropped when their last
/// member leaves. A [`SubscriptionTracker`] reverse index makes the
/// disconnect path cheap.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    /// Group ID -> channel.
    channels: DashMap<Uuid, Channel>,
    /// Reverse index, connection -> joined groups.
    subscriptions: SubscriptionTracker,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins a connection to a group's channel.
    pub fn join(&self, group_id: Uuid, conn_id: ConnectionId) {
        self.channels
            .entry(group_id)
            .or_insert_with(|| Channel::new(group_id))
            .join(conn_id);
        self.subscriptions.add(conn_id, group_id);
    }

    /// Removes a connection from a group's channel. Safe when the
    /// connection never joined.
    pub fn leave(&self, group_id: Uuid, conn_id: ConnectionId) {
        if let Some(mut channel) = self.channels.get_mut(&group_id) {
            channel.leave(conn_id);
            if channel.is_empty() {
                drop(channel);
                self.channels.remove(&group_id);
            }
        }
        self.subscriptions.remove(conn_id, group_id);
    }

    /// Removes a connection from every channel it had joined and returns
    /// those group IDs.
    pub fn leave_all(&self, conn_id: ConnectionId) -> Vec<Uuid> {
        let groups = self.subscriptions.remove_all(conn_id);
        for group_id in &groups {
            if let Some(mut channel) = self.channels.get_mut(group_id) {
                channel.leave(conn_id);
                if channel.is_empty() {
                    drop(channel);
                    self.channels.remove(group_id);
                }
            }
        }
        groups.into_iter().collect()
    }

    /// All member connection IDs of a group's channel.
    pub fn members(&self, group_id: Uuid) -> Vec<ConnectionId> {
        self.channels
            .get(&group_id)
            .map(|channel| channel.members())
            .unwrap_or_default()
    }

    /// Number of channels a connection has joined.
    pub fn joined_count(&self, conn_id: ConnectionId) -> usize {
        self.subscriptions.count(conn_id)
    }

    /// Number of active channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
