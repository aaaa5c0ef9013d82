//! Delivery router fanning out events to exactly the right connections.

use std::sync::Arc;

use chatter_entity::message::{Message, MessageTarget};
use uuid::Uuid;

use crate::channel::ChannelRegistry;
use crate::connection::handle::ConnectionId;
use crate::connection::registry::ConnectionRegistry;
use crate::presence::PresenceTable;
use crate::signal::ServerSignal;
use crate::typing::TypingScope;

/// Routes outbound events using presence, connection, and channel state.
///
/// Delivery is best-effort: an unreachable recipient is normal and silent,
/// never an error. Per-connection order is preserved because each incoming
/// event is persisted and dispatched synchronously before the next one is
/// handled.
#[derive(Debug)]
pub struct DeliveryRouter {
    presence: Arc<PresenceTable>,
    connections: Arc<ConnectionRegistry>,
    channels: Arc<ChannelRegistry>,
}

impl DeliveryRouter {
    /// Builds a router over shared presence, connection, and channel state.
    pub fn new(
        presence: Arc<PresenceTable>,
        connections: Arc<ConnectionRegistry>,
        channels: Arc<ChannelRegistry>,
    ) -> Self {
        Self {
            presence,
            connections,
            channels,
        }
    }

    /// Pushes a signal to one connection if it is still registered.
    pub fn send_to_conn(&self, conn_id: ConnectionId, signal: ServerSignal) -> bool {
        match self.connections.get(conn_id) {
            Some(handle) => handle.send(signal),
            None => false,
        }
    }

    /// Pushes a signal to a user's authoritative connection if present.
    pub fn send_to_user(&self, user_id: Uuid, signal: ServerSignal) -> bool {
        match self.presence.lookup(user_id) {
            Some(conn_id) => self.send_to_conn(conn_id, signal),
            None => false,
        }
    }

    /// Routes a persisted message to every connection that should see it.
    ///
    /// Group messages fan out to the group's channel members, the sender
    /// included if they joined the channel. Direct messages go to the
    /// sender's connection (so their view updates from the stable persisted
    /// record) and to the receiver's connection when the receiver is
    /// present.
    pub fn route_message(&self, sender_conn: ConnectionId, message: &Message) {
        match message.target() {
            MessageTarget::Group(group_id) => {
                for conn_id in self.channels.members(group_id) {
                    self.send_to_conn(
                        conn_id,
                        ServerSignal::ReceiveMessage {
                            message: message.clone(),
                        },
                    );
                }
            }
            MessageTarget::Direct(receiver_id) => {
                self.send_to_conn(
                    sender_conn,
                    ServerSignal::ReceiveMessage {
                        message: message.clone(),
                    },
                );
                if let Some(receiver_conn) = self.presence.lookup(receiver_id) {
                    if receiver_conn != sender_conn {
                        self.send_to_conn(
                            receiver_conn,
                            ServerSignal::ReceiveMessage {
                                message: message.clone(),
                            },
                        );
                    }
                }
            }
            MessageTarget::Invalid => {
                // Rejected before persistence; nothing to route.
                tracing::error!(message_id = %message.id, "refusing to route untargeted message");
            }
        }
    }

    /// Routes a typing indicator.
    ///
    /// Group scope notifies every channel member except the sender's own
    /// connection. Direct scope notifies only the addressed user, if
    /// present.
    pub fn route_typing(
        &self,
        sender_conn: ConnectionId,
        sender_user: Uuid,
        scope: TypingScope,
        starting: bool,
    ) {
        let signal = |group_id: Option<Uuid>| {
            if starting {
                ServerSignal::UserTyping {
                    user_id: sender_user,
                    group_id,
                }
            } else {
                ServerSignal::UserStopTyping {
                    user_id: sender_user,
                    group_id,
                }
            }
        };

        match scope {
            TypingScope::Group(group_id) => {
                for conn_id in self.channels.members(group_id) {
                    if conn_id != sender_conn {
                        self.send_to_conn(conn_id, signal(Some(group_id)));
                    }
                }
            }
            TypingScope::Direct(receiver_id) => {
                self.send_to_user(receiver_id, signal(None));
            }
        }
    }

    /// Broadcasts the full current online-user list to every connection,
    /// joined or not.
    pub fn broadcast_presence(&self) {
        let online = self.presence.snapshot();
        for handle in self.connections.all() {
            handle.send(ServerSignal::PresenceUpdate {
                online: online.clone(),
            });
        }
    }
}
