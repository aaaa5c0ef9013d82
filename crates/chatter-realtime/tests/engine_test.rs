//! End-to-end engine tests against in-memory stores.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use chatter_core::config::realtime::RealtimeConfig;
use chatter_core::error::AppError;
use chatter_core::result::AppResult;
use chatter_entity::message::{Message, NewMessage};
use chatter_entity::store::{IdentityStore, MessageStore};
use chatter_realtime::engine::ChatEngine;
use chatter_realtime::signal::{ClientSignal, ServerSignal};

#[derive(Default)]
struct FakeIdentityStore {
    /// (group, user) pairs considered persisted members.
    members: std::sync::Mutex<HashSet<(Uuid, Uuid)>>,
    /// Users currently flagged online.
    online: std::sync::Mutex<HashSet<Uuid>>,
    fail: AtomicBool,
}

impl FakeIdentityStore {
    fn add_member(&self, group_id: Uuid, user_id: Uuid) {
        self.members.lock().unwrap().insert((group_id, user_id));
    }

    fn is_online(&self, user_id: Uuid) -> bool {
        self.online.lock().unwrap().contains(&user_id)
    }

    fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn should_fail(&self) -> bool {
        self.fail.swap(false, Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityStore for FakeIdentityStore {
    async fn set_online(&self, user_id: Uuid) -> AppResult<()> {
        if self.should_fail() {
            return Err(AppError::database("identity store down"));
        }
        self.online.lock().unwrap().insert(user_id);
        Ok(())
    }

    async fn set_offline(&self, user_id: Uuid, _last_seen: DateTime<Utc>) -> AppResult<()> {
        if self.should_fail() {
            return Err(AppError::database("identity store down"));
        }
        self.online.lock().unwrap().remove(&user_id);
        Ok(())
    }

    async fn is_group_member(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        if self.should_fail() {
            return Err(AppError::database("identity store down"));
        }
        Ok(self.members.lock().unwrap().contains(&(group_id, user_id)))
    }
}

#[derive(Default)]
struct FakeMessageStore {
    saved: std::sync::Mutex<Vec<Message>>,
    fail: AtomicBool,
}

impl FakeMessageStore {
    fn saved_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageStore for FakeMessageStore {
    async fn save(&self, draft: NewMessage) -> AppResult<Message> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(AppError::database("message store down"));
        }
        let message = Message {
            id: Uuid::new_v4(),
            sender_id: draft.sender_id,
            receiver_id: draft.receiver_id,
            group_id: draft.group_id,
            text: draft.text,
            read: false,
            hidden_for: Vec::new(),
            created_at: Utc::now(),
        };
        self.saved.lock().unwrap().push(message.clone());
        Ok(message)
    }
}

struct Harness {
    engine: ChatEngine,
    identity: Arc<FakeIdentityStore>,
    messages: Arc<FakeMessageStore>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(RealtimeConfig::default())
    }

    fn with_config(config: RealtimeConfig) -> Self {
        let identity = Arc::new(FakeIdentityStore::default());
        let messages = Arc::new(FakeMessageStore::default());
        let engine = ChatEngine::new(config, identity.clone(), messages.clone());
        Self {
            engine,
            identity,
            messages,
        }
    }

    /// Connects and joins as the given user, draining the setup signals.
    async fn joined_client(
        &self,
        user_id: Uuid,
    ) -> (
        Arc<chatter_realtime::ConnectionHandle>,
        mpsc::Receiver<ServerSignal>,
    ) {
        let (conn, mut rx) = self.engine.connect();
        self.engine
            .handle_signal(&conn, ClientSignal::Join { user_id })
            .await;
        drain(&mut rx);
        (conn, rx)
    }
}

/// Pulls everything currently queued without waiting.
fn drain(rx: &mut mpsc::Receiver<ServerSignal>) -> Vec<ServerSignal> {
    let mut signals = Vec::new();
    while let Ok(signal) = rx.try_recv() {
        signals.push(signal);
    }
    signals
}

fn sorted(mut ids: Vec<Uuid>) -> Vec<Uuid> {
    ids.sort();
    ids
}

#[tokio::test]
async fn snapshot_arrives_before_join() {
    let h = Harness::new();
    let user_a = Uuid::new_v4();
    let (_conn_a, _rx_a) = h.joined_client(user_a).await;

    // A second, not-yet-joined connection still sees who is online.
    let (_conn_b, mut rx_b) = h.engine.connect();
    let signals = drain(&mut rx_b);
    assert!(matches!(
        signals.as_slice(),
        [ServerSignal::PresenceSnapshot { online }] if online == &vec![user_a]
    ));
}

#[tokio::test]
async fn join_broadcasts_growing_online_list() {
    let h = Harness::new();
    let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());

    let (conn_a, mut rx_a) = h.engine.connect();
    h.engine
        .handle_signal(&conn_a, ClientSignal::Join { user_id: user_a })
        .await;

    let signals = drain(&mut rx_a);
    assert!(matches!(
        signals.as_slice(),
        [
            ServerSignal::PresenceSnapshot { online: snapshot },
            ServerSignal::PresenceUpdate { online },
        ] if snapshot.is_empty() && online == &vec![user_a]
    ));

    let (conn_b, mut rx_b) = h.engine.connect();
    h.engine
        .handle_signal(&conn_b, ClientSignal::Join { user_id: user_b })
        .await;

    // Both connections see the updated full list.
    for rx in [&mut rx_a, &mut rx_b] {
        let update = drain(rx)
            .into_iter()
            .find_map(|signal| match signal {
                ServerSignal::PresenceUpdate { online } => Some(online),
                _ => None,
            })
            .unwrap();
        assert_eq!(sorted(update), sorted(vec![user_a, user_b]));
    }

    assert!(h.identity.is_online(user_a));
    assert!(h.identity.is_online(user_b));
}

#[tokio::test]
async fn direct_message_reaches_both_ends_once() {
    let h = Harness::new();
    let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());
    let (conn_a, mut rx_a) = h.joined_client(user_a).await;
    let (_conn_b, mut rx_b) = h.joined_client(user_b).await;
    drain(&mut rx_a);

    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::SendMessage {
                sender_id: user_a,
                receiver_id: Some(user_b),
                group_id: None,
                text: "hi".to_string(),
            },
        )
        .await;

    for rx in [&mut rx_a, &mut rx_b] {
        let signals = drain(rx);
        assert_eq!(signals.len(), 1);
        assert!(matches!(
            &signals[0],
            ServerSignal::ReceiveMessage { message }
                if message.text == "hi"
                    && message.sender_id == user_a
                    && message.receiver_id == Some(user_b)
        ));
    }
    assert_eq!(h.messages.saved_count(), 1);
}

#[tokio::test]
async fn direct_message_to_offline_receiver_still_persists() {
    let h = Harness::new();
    let user_a = Uuid::new_v4();
    let offline_b = Uuid::new_v4();
    let (conn_a, mut rx_a) = h.joined_client(user_a).await;

    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::SendMessage {
                sender_id: user_a,
                receiver_id: Some(offline_b),
                group_id: None,
                text: "you there?".to_string(),
            },
        )
        .await;

    // Exactly one delivery, to the sender's own connection.
    let signals = drain(&mut rx_a);
    assert_eq!(signals.len(), 1);
    assert!(matches!(signals[0], ServerSignal::ReceiveMessage { .. }));
    assert_eq!(h.messages.saved_count(), 1);
}

#[tokio::test]
async fn group_delivery_requires_channel_join() {
    let h = Harness::new();
    let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());
    let group = Uuid::new_v4();
    h.identity.add_member(group, user_a);
    h.identity.add_member(group, user_b);

    let (conn_a, mut rx_a) = h.joined_client(user_a).await;
    let (_conn_b, mut rx_b) = h.joined_client(user_b).await;
    drain(&mut rx_a);

    // Only A opts in to the channel; B stays a member on paper only.
    h.engine
        .handle_signal(&conn_a, ClientSignal::JoinGroup { group_id: group })
        .await;
    assert!(matches!(
        drain(&mut rx_a).as_slice(),
        [ServerSignal::GroupJoined { group_id }] if *group_id == group
    ));

    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::SendMessage {
                sender_id: user_a,
                receiver_id: None,
                group_id: Some(group),
                text: "meeting at 3".to_string(),
            },
        )
        .await;

    let a_signals = drain(&mut rx_a);
    assert_eq!(a_signals.len(), 1);
    assert!(matches!(a_signals[0], ServerSignal::ReceiveMessage { .. }));
    assert!(drain(&mut rx_b).is_empty());
    assert_eq!(h.messages.saved_count(), 1);
}

#[tokio::test]
async fn non_member_channel_join_is_denied() {
    let h = Harness::new();
    let outsider = Uuid::new_v4();
    let group = Uuid::new_v4();
    let (conn, mut rx) = h.joined_client(outsider).await;

    h.engine
        .handle_signal(&conn, ClientSignal::JoinGroup { group_id: group })
        .await;

    assert!(matches!(
        drain(&mut rx).as_slice(),
        [ServerSignal::ChannelDenied { group_id, .. }] if *group_id == group
    ));
}

#[tokio::test]
async fn membership_check_failure_denies_rather_than_admits() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    let group = Uuid::new_v4();
    h.identity.add_member(group, user);
    let (conn, mut rx) = h.joined_client(user).await;

    h.identity.fail_next();
    h.engine
        .handle_signal(&conn, ClientSignal::JoinGroup { group_id: group })
        .await;

    assert!(matches!(
        drain(&mut rx).as_slice(),
        [ServerSignal::ChannelDenied { .. }]
    ));
}

#[tokio::test]
async fn channel_join_before_user_join_is_denied() {
    let h = Harness::new();
    let (conn, mut rx) = h.engine.connect();
    drain(&mut rx);

    h.engine
        .handle_signal(
            &conn,
            ClientSignal::JoinGroup {
                group_id: Uuid::new_v4(),
            },
        )
        .await;

    assert!(matches!(
        drain(&mut rx).as_slice(),
        [ServerSignal::ChannelDenied { .. }]
    ));
}

#[tokio::test]
async fn typing_start_then_stop_notifies_receiver_and_clears() {
    let h = Harness::new();
    let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());
    let (conn_a, mut rx_a) = h.joined_client(user_a).await;
    let (_conn_b, mut rx_b) = h.joined_client(user_b).await;
    drain(&mut rx_a);

    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::TypingStart {
                sender_id: user_a,
                receiver_id: Some(user_b),
                group_id: None,
            },
        )
        .await;
    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::TypingStop {
                sender_id: user_a,
                receiver_id: Some(user_b),
                group_id: None,
            },
        )
        .await;

    let b_signals = drain(&mut rx_b);
    assert!(matches!(
        b_signals.as_slice(),
        [
            ServerSignal::UserTyping { user_id: typing, group_id: None },
            ServerSignal::UserStopTyping { user_id: stopped, group_id: None },
        ] if *typing == user_a && *stopped == user_a
    ));
    // The sender is never self-notified.
    assert!(drain(&mut rx_a).is_empty());
}

#[tokio::test]
async fn group_typing_excludes_sender() {
    let h = Harness::new();
    let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());
    let group = Uuid::new_v4();
    h.identity.add_member(group, user_a);
    h.identity.add_member(group, user_b);

    let (conn_a, mut rx_a) = h.joined_client(user_a).await;
    let (conn_b, mut rx_b) = h.joined_client(user_b).await;
    h.engine
        .handle_signal(&conn_a, ClientSignal::JoinGroup { group_id: group })
        .await;
    h.engine
        .handle_signal(&conn_b, ClientSignal::JoinGroup { group_id: group })
        .await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::TypingStart {
                sender_id: user_a,
                receiver_id: None,
                group_id: Some(group),
            },
        )
        .await;

    assert!(matches!(
        drain(&mut rx_b).as_slice(),
        [ServerSignal::UserTyping { user_id, group_id: Some(g) }]
            if *user_id == user_a && *g == group
    ));
    assert!(drain(&mut rx_a).is_empty());
}

#[tokio::test(start_paused = true)]
async fn typing_expires_server_side_without_stop_signal() {
    let h = Harness::with_config(RealtimeConfig {
        typing_ttl_seconds: 5,
        ..RealtimeConfig::default()
    });
    let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());
    let (conn_a, _rx_a) = h.joined_client(user_a).await;
    let (_conn_b, mut rx_b) = h.joined_client(user_b).await;

    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::TypingStart {
                sender_id: user_a,
                receiver_id: Some(user_b),
                group_id: None,
            },
        )
        .await;

    // The client vanishes without sending a stop signal.
    tokio::time::sleep(Duration::from_secs(6)).await;

    let b_signals = drain(&mut rx_b);
    assert!(matches!(
        b_signals.as_slice(),
        [
            ServerSignal::UserTyping { .. },
            ServerSignal::UserStopTyping { user_id, .. },
        ] if *user_id == user_a
    ));
}

#[tokio::test(start_paused = true)]
async fn explicit_stop_cancels_the_expiry_timer() {
    let h = Harness::new();
    let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());
    let (conn_a, _rx_a) = h.joined_client(user_a).await;
    let (_conn_b, mut rx_b) = h.joined_client(user_b).await;

    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::TypingStart {
                sender_id: user_a,
                receiver_id: Some(user_b),
                group_id: None,
            },
        )
        .await;
    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::TypingStop {
                sender_id: user_a,
                receiver_id: Some(user_b),
                group_id: None,
            },
        )
        .await;
    drain(&mut rx_b);

    // No second stop signal fires later from the cancelled timer.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(drain(&mut rx_b).is_empty());
}

#[tokio::test]
async fn duplicate_join_replaces_the_earlier_connection() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    let peer = Uuid::new_v4();
    let (_old_conn, mut old_rx) = h.joined_client(user).await;
    let (peer_conn, mut peer_rx) = h.joined_client(peer).await;
    drain(&mut old_rx);

    let (new_conn, mut new_rx) = h.engine.connect();
    h.engine
        .handle_signal(&new_conn, ClientSignal::Join { user_id: user })
        .await;

    // The superseded connection is told why before it is closed.
    let old_signals = drain(&mut old_rx);
    assert!(matches!(
        old_signals.as_slice(),
        [ServerSignal::SessionReplaced { user_id }] if *user_id == user
    ));

    // Routing for the user now lands on the new connection only.
    drain(&mut new_rx);
    h.engine
        .handle_signal(
            &peer_conn,
            ClientSignal::SendMessage {
                sender_id: peer,
                receiver_id: Some(user),
                group_id: None,
                text: "still there?".to_string(),
            },
        )
        .await;
    drain(&mut peer_rx);

    let new_signals = drain(&mut new_rx);
    assert!(
        new_signals
            .iter()
            .any(|s| matches!(s, ServerSignal::ReceiveMessage { .. }))
    );
    assert!(
        !drain(&mut old_rx)
            .iter()
            .any(|s| matches!(s, ServerSignal::ReceiveMessage { .. }))
    );
}

#[tokio::test]
async fn rejoining_as_a_different_user_takes_the_first_identity_offline() {
    let h = Harness::new();
    let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());

    let (conn, mut rx) = h.engine.connect();
    h.engine
        .handle_signal(&conn, ClientSignal::Join { user_id: user_a })
        .await;
    h.engine
        .handle_signal(&conn, ClientSignal::Join { user_id: user_b })
        .await;
    drain(&mut rx);

    // One connection, one identity: the first user is gone, not ghosted.
    assert_eq!(h.engine.online_users(), vec![user_b]);
    assert!(!h.identity.is_online(user_a));
    assert!(h.identity.is_online(user_b));

    h.engine.disconnect(conn.id).await;
    assert!(h.engine.online_users().is_empty());
    assert!(!h.identity.is_online(user_b));
}

#[tokio::test]
async fn superseded_connection_is_closed_and_detached() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    let group = Uuid::new_v4();
    h.identity.add_member(group, user);

    let (old_conn, mut old_rx) = h.joined_client(user).await;
    h.engine
        .handle_signal(&old_conn, ClientSignal::JoinGroup { group_id: group })
        .await;
    drain(&mut old_rx);
    assert_eq!(h.engine.channel_count(), 1);

    let (_new_conn, _new_rx) = h.joined_client(user).await;

    // The old connection is told why, then its queue ends so the transport
    // can drop the socket; its channel memberships are gone.
    assert!(matches!(
        drain(&mut old_rx).as_slice(),
        [ServerSignal::SessionReplaced { user_id }] if *user_id == user
    ));
    assert!(matches!(
        old_rx.try_recv(),
        Err(mpsc::error::TryRecvError::Disconnected)
    ));
    assert_eq!(h.engine.channel_count(), 0);

    // A closed connection cannot re-acquire routing state, and its late
    // socket close changes nothing.
    h.engine
        .handle_signal(&old_conn, ClientSignal::JoinGroup { group_id: group })
        .await;
    assert_eq!(h.engine.channel_count(), 0);

    h.engine.disconnect(old_conn.id).await;
    assert_eq!(h.engine.online_users(), vec![user]);
    assert_eq!(h.engine.connection_count(), 1);
}

#[tokio::test]
async fn disconnect_shrinks_the_online_list_and_cleans_up() {
    let h = Harness::new();
    let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());
    let group = Uuid::new_v4();
    h.identity.add_member(group, user_b);

    let (_conn_a, mut rx_a) = h.joined_client(user_a).await;
    let (conn_b, mut rx_b) = h.joined_client(user_b).await;
    h.engine
        .handle_signal(&conn_b, ClientSignal::JoinGroup { group_id: group })
        .await;
    drain(&mut rx_a);
    drain(&mut rx_b);

    h.engine.disconnect(conn_b.id).await;

    let update = drain(&mut rx_a)
        .into_iter()
        .find_map(|signal| match signal {
            ServerSignal::PresenceUpdate { online } => Some(online),
            _ => None,
        })
        .unwrap();
    assert_eq!(update, vec![user_a]);

    assert!(!h.identity.is_online(user_b));
    assert_eq!(h.engine.online_users(), vec![user_a]);
    assert_eq!(h.engine.connection_count(), 1);

    // Idempotent for a connection already gone.
    h.engine.disconnect(conn_b.id).await;
}

#[tokio::test]
async fn disconnect_of_unidentified_connection_is_silent() {
    let h = Harness::new();
    let user_a = Uuid::new_v4();
    let (_conn_a, mut rx_a) = h.joined_client(user_a).await;

    let (anon_conn, _anon_rx) = h.engine.connect();
    h.engine.disconnect(anon_conn.id).await;

    // No presence broadcast for a connection that never joined.
    assert!(drain(&mut rx_a).is_empty());
    assert_eq!(h.engine.online_users(), vec![user_a]);
}

#[tokio::test]
async fn save_failure_surfaces_to_the_sender_only() {
    let h = Harness::new();
    let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());
    let (conn_a, mut rx_a) = h.joined_client(user_a).await;
    let (_conn_b, mut rx_b) = h.joined_client(user_b).await;
    drain(&mut rx_a);

    h.messages.fail_next();
    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::SendMessage {
                sender_id: user_a,
                receiver_id: Some(user_b),
                group_id: None,
                text: "lost".to_string(),
            },
        )
        .await;

    assert!(matches!(
        drain(&mut rx_a).as_slice(),
        [ServerSignal::SendFailed { .. }]
    ));
    assert!(drain(&mut rx_b).is_empty());
    assert_eq!(h.messages.saved_count(), 0);
}

#[tokio::test]
async fn untargeted_message_is_rejected_before_persistence() {
    let h = Harness::new();
    let user_a = Uuid::new_v4();
    let (conn_a, mut rx_a) = h.joined_client(user_a).await;

    h.engine
        .handle_signal(
            &conn_a,
            ClientSignal::SendMessage {
                sender_id: user_a,
                receiver_id: None,
                group_id: None,
                text: "to nobody".to_string(),
            },
        )
        .await;

    assert!(matches!(
        drain(&mut rx_a).as_slice(),
        [ServerSignal::SendFailed { .. }]
    ));
    assert_eq!(h.messages.saved_count(), 0);
}

#[tokio::test]
async fn identity_store_failure_never_interrupts_join() {
    let h = Harness::new();
    let user = Uuid::new_v4();
    let (conn, mut rx) = h.engine.connect();

    h.identity.fail_next();
    h.engine
        .handle_signal(&conn, ClientSignal::Join { user_id: user })
        .await;

    // Live routing state updates even though persistence failed.
    assert_eq!(h.engine.online_users(), vec![user]);
    let signals = drain(&mut rx);
    assert!(
        signals
            .iter()
            .any(|s| matches!(s, ServerSignal::PresenceUpdate { online } if online == &vec![user]))
    );
}
