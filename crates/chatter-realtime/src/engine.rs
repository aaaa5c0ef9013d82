//! The chat engine: connection lifecycle, signal handling, and the glue
//! between presence, channels, typing, routing, and the stores.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use chatter_core::config::realtime::RealtimeConfig;
use chatter_entity::message::NewMessage;
use chatter_entity::store::{IdentityStore, MessageStore};

use crate::channel::ChannelRegistry;
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::registry::ConnectionRegistry;
use crate::presence::PresenceTable;
use crate::router::DeliveryRouter;
use crate::signal::{ClientSignal, ServerSignal};
use crate::typing::{TypingScope, TypingTracker};

/// Process-wide chat engine.
///
/// One instance per server. All presence and channel mutations happen
/// through its lifecycle methods in response to connection events, so the
/// transport layer stays a thin shell around `connect`, `handle_signal`,
/// and `disconnect`.
pub struct ChatEngine {
    config: RealtimeConfig,
    presence: Arc<PresenceTable>,
    connections: Arc<ConnectionRegistry>,
    channels: Arc<ChannelRegistry>,
    typing: Arc<TypingTracker>,
    router: Arc<DeliveryRouter>,
    identity: Arc<dyn IdentityStore>,
    messages: Arc<dyn MessageStore>,
}

impl ChatEngine {
    /// Builds an engine over the given stores.
    pub fn new(
        config: RealtimeConfig,
        identity: Arc<dyn IdentityStore>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        let presence = Arc::new(PresenceTable::new());
        let connections = Arc::new(ConnectionRegistry::new());
        let channels = Arc::new(ChannelRegistry::new());
        let router = Arc::new(DeliveryRouter::new(
            presence.clone(),
            connections.clone(),
            channels.clone(),
        ));

        Self {
            config,
            presence,
            connections,
            channels,
            typing: Arc::new(TypingTracker::new()),
            router,
            identity,
            messages,
        }
    }

    /// Accepts a new connection.
    ///
    /// Returns the session handle and the receiver half of its outbound
    /// queue. The full presence snapshot is queued immediately so the
    /// client can render online users before completing its own join.
    pub fn connect(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerSignal>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(tx));
        self.connections.add(handle.clone());

        handle.send(ServerSignal::PresenceSnapshot {
            online: self.presence.snapshot(),
        });

        tracing::debug!(conn_id = %handle.id, "connection accepted");
        (handle, rx)
    }

    /// Dispatches one inbound signal from a connection.
    ///
    /// Signals from a single connection must be fed in the order received;
    /// the transport layer guarantees this by processing its read stream
    /// sequentially.
    pub async fn handle_signal(&self, conn: &Arc<ConnectionHandle>, signal: ClientSignal) {
        // A closed connection (for example one superseded by a duplicate
        // join) gets no further say in routing state.
        if !conn.is_alive() {
            return;
        }
        match signal {
            ClientSignal::Join { user_id } => self.join(conn, user_id).await,
            ClientSignal::SendMessage {
                sender_id,
                receiver_id,
                group_id,
                text,
            } => {
                self.send_message(conn, sender_id, receiver_id, group_id, text)
                    .await
            }
            ClientSignal::TypingStart {
                sender_id,
                receiver_id,
                group_id,
            } => self.typing_start(conn, sender_id, receiver_id, group_id),
            ClientSignal::TypingStop {
                sender_id,
                receiver_id,
                group_id,
            } => self.typing_stop(conn, sender_id, receiver_id, group_id),
            ClientSignal::JoinGroup { group_id } => self.join_group(conn, group_id).await,
            ClientSignal::LeaveGroup { group_id } => self.leave_group(conn, group_id),
        }
    }

    /// Registers a user identity on this connection.
    ///
    /// A duplicate join for an already-online user supersedes the earlier
    /// connection: it is told why and closed explicitly rather than left
    /// silently orphaned from routing.
    async fn join(&self, conn: &Arc<ConnectionHandle>, user_id: Uuid) {
        let previous_identity = conn.joined_user().await;
        conn.set_joined_user(user_id).await;

        // Re-joining as a different user abandons the earlier identity;
        // the presence table drops it, this clears its leftovers.
        if let Some(prev) = previous_identity.filter(|prev| *prev != user_id) {
            self.typing.clear_sender(prev);
            if let Err(err) = self.identity.set_offline(prev, Utc::now()).await {
                tracing::warn!(user_id = %prev, error = %err, "failed to persist offline flag");
            }
            tracing::info!(
                old_user = %prev,
                new_user = %user_id,
                conn_id = %conn.id,
                "connection re-joined as a different user"
            );
        }

        if let Some(old_conn_id) = self.presence.register(user_id, conn.id) {
            if let Some(old_handle) = self.connections.remove(old_conn_id) {
                old_handle.send(ServerSignal::SessionReplaced { user_id });
                old_handle.close();
            }
            self.channels.leave_all(old_conn_id);
            tracing::info!(
                user_id = %user_id,
                old_conn = %old_conn_id,
                new_conn = %conn.id,
                "duplicate join, superseded earlier connection"
            );
        }

        // Best-effort: live routing state is authoritative, the persisted
        // flag is a cache of it.
        if let Err(err) = self.identity.set_online(user_id).await {
            tracing::warn!(user_id = %user_id, error = %err, "failed to persist online flag");
        }

        self.router.broadcast_presence();
        tracing::debug!(user_id = %user_id, conn_id = %conn.id, "user joined");
    }

    /// Persists a message, then routes it. Persistence failures surface to
    /// the sender only.
    async fn send_message(
        &self,
        conn: &Arc<ConnectionHandle>,
        sender_id: Uuid,
        receiver_id: Option<Uuid>,
        group_id: Option<Uuid>,
        text: String,
    ) {
        let draft = match NewMessage::new(sender_id, receiver_id, group_id, text) {
            Ok(draft) => draft,
            Err(err) => {
                conn.send(ServerSignal::SendFailed {
                    reason: err.message,
                });
                return;
            }
        };

        let saved = match self.messages.save(draft).await {
            Ok(saved) => saved,
            Err(err) => {
                tracing::warn!(sender_id = %sender_id, error = %err, "message save failed");
                conn.send(ServerSignal::SendFailed {
                    reason: "Message could not be saved".to_string(),
                });
                return;
            }
        };

        self.router.route_message(conn.id, &saved);
    }

    /// Records typing state, routes the indicator, and arms a bounded
    /// expiry timer so a vanished client cannot stay "typing" forever.
    fn typing_start(
        &self,
        conn: &Arc<ConnectionHandle>,
        sender_id: Uuid,
        receiver_id: Option<Uuid>,
        group_id: Option<Uuid>,
    ) {
        let Some(scope) = Self::typing_scope(receiver_id, group_id) else {
            tracing::debug!(sender_id = %sender_id, "ignoring typing signal without a single target");
            return;
        };

        let ttl = Duration::from_secs(self.config.typing_ttl_seconds);
        let typing = self.typing.clone();
        let router = self.router.clone();
        let conn_id = conn.id;
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if typing.expire(sender_id, scope) {
                router.route_typing(conn_id, sender_id, scope, false);
            }
        });

        self.typing.start(sender_id, scope, expiry.abort_handle());
        self.router.route_typing(conn.id, sender_id, scope, true);
    }

    /// Clears typing state and routes the stop indicator if the sender was
    /// actually typing.
    fn typing_stop(
        &self,
        conn: &Arc<ConnectionHandle>,
        sender_id: Uuid,
        receiver_id: Option<Uuid>,
        group_id: Option<Uuid>,
    ) {
        let Some(scope) = Self::typing_scope(receiver_id, group_id) else {
            return;
        };

        if self.typing.stop(sender_id, scope) {
            self.router.route_typing(conn.id, sender_id, scope, false);
        }
    }

    /// Admits a connection to a group's fan-out channel after re-checking
    /// persisted membership. A store failure denies rather than admits.
    async fn join_group(&self, conn: &Arc<ConnectionHandle>, group_id: Uuid) {
        let Some(user_id) = conn.joined_user().await else {
            conn.send(ServerSignal::ChannelDenied {
                group_id,
                reason: "Join before subscribing to group channels".to_string(),
            });
            return;
        };

        if self.channels.joined_count(conn.id) >= self.config.max_channels_per_connection {
            conn.send(ServerSignal::ChannelDenied {
                group_id,
                reason: "Channel limit reached for this connection".to_string(),
            });
            return;
        }

        match self.identity.is_group_member(group_id, user_id).await {
            Ok(true) => {
                self.channels.join(group_id, conn.id);
                conn.send(ServerSignal::GroupJoined { group_id });
                tracing::debug!(user_id = %user_id, group_id = %group_id, "joined group channel");
            }
            Ok(false) => {
                conn.send(ServerSignal::ChannelDenied {
                    group_id,
                    reason: "Not a member of this group".to_string(),
                });
            }
            Err(err) => {
                tracing::warn!(group_id = %group_id, error = %err, "membership check failed");
                conn.send(ServerSignal::ChannelDenied {
                    group_id,
                    reason: "Membership could not be verified".to_string(),
                });
            }
        }
    }

    /// Removes the connection from a group's channel. Safe when it never
    /// joined.
    fn leave_group(&self, conn: &Arc<ConnectionHandle>, group_id: Uuid) {
        self.channels.leave(group_id, conn.id);
    }

    /// Tears down a connection: channel memberships, presence entry,
    /// typing state, persisted offline flag, presence broadcast.
    ///
    /// Idempotent; a connection already removed (for example one
    /// superseded by a duplicate join) is a no-op.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        // Channel membership can outlive the registry entry when this
        // connection was superseded, so clear it unconditionally.
        self.channels.leave_all(conn_id);

        let Some(handle) = self.connections.remove(conn_id) else {
            return;
        };
        handle.close();

        if let Some(user_id) = self.presence.unregister(conn_id) {
            self.typing.clear_sender(user_id);

            let last_seen = Utc::now();
            if let Err(err) = self.identity.set_offline(user_id, last_seen).await {
                tracing::warn!(user_id = %user_id, error = %err, "failed to persist offline flag");
            }

            self.router.broadcast_presence();
            tracing::debug!(user_id = %user_id, conn_id = %conn_id, "user disconnected");
        } else {
            tracing::debug!(conn_id = %conn_id, "unidentified connection closed");
        }
    }

    /// Current online-user snapshot.
    pub fn online_users(&self) -> Vec<Uuid> {
        self.presence.snapshot()
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections.count()
    }

    /// Number of active group channels.
    pub fn channel_count(&self) -> usize {
        self.channels.channel_count()
    }

    fn typing_scope(receiver_id: Option<Uuid>, group_id: Option<Uuid>) -> Option<TypingScope> {
        match (receiver_id, group_id) {
            (Some(receiver), None) => Some(TypingScope::Direct(receiver)),
            (None, Some(group)) => Some(TypingScope::Group(group)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ChatEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatEngine")
            .field("online", &self.presence.online_count())
            .field("connections", &self.connections.count())
            .field("channels", &self.channels.channel_count())
            .finish()
    }
}
