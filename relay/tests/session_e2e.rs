//! Relay plus real client session stores over websockets.

use client::net::transport::{ReconnectPolicy, Transport, TransportEvent};
use client::state::session::{JoinForm, SessionStatus};
use client::store::{Notice, SessionStore};
use frames::model::{DrawingData, FileId, RemoteUser};
use relay::routes;
use relay::state::AppState;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, timeout};

const WAIT: Duration = Duration::from_secs(5);

async fn start_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, routes::app(AppState::default()))
            .await
            .expect("relay serve");
    });
    format!("ws://{addr}/ws")
}

struct Peer {
    store: SessionStore,
    transport: Transport,
    events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl Peer {
    fn join(url: &str, username: &str, room_id: &str) -> Self {
        let mut store = SessionStore::new(false);
        store
            .submit_join(&JoinForm::new(username, room_id))
            .expect("valid join form");
        let (transport, events) = Transport::spawn(url, ReconnectPolicy::default());
        store.flush_to(&transport).expect("transport running");
        Self { store, transport, events }
    }

    /// Apply everything received so far and send everything queued.
    fn drain(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.store
                .handle_transport_event(event)
                .expect("inbound event applies");
        }
        self.store.flush_to(&self.transport).expect("transport running");
    }

    fn joined(&self) -> bool {
        self.store.status() == SessionStatus::Joined
    }
}

/// Drive every peer until `done` holds.
async fn settle(peers: &mut [&mut Peer], done: impl Fn(&[&mut Peer]) -> bool) {
    timeout(WAIT, async {
        loop {
            for peer in peers.iter_mut() {
                peer.drain();
            }
            if done(peers) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("peers settled before timeout");
}

#[tokio::test]
async fn late_joiner_receives_tree_and_drawing() {
    let url = start_relay().await;
    let mut alice = Peer::join(&url, "alice", "room-late");
    settle(&mut [&mut alice], |p| p[0].joined()).await;

    let root = FileId::root();
    let src = alice.store.create_directory(&root, "src").unwrap();
    let main = alice.store.create_file(&src, "main.js").unwrap();
    alice.store.open_file(&main);
    alice
        .store
        .type_into_active("console.log(1)", 14, Instant::now())
        .unwrap();
    alice
        .store
        .update_drawing(DrawingData(json!({"shapes": ["circle"]})))
        .unwrap();

    let mut bob = Peer::join(&url, "bob", "room-late");
    settle(&mut [&mut alice, &mut bob], |p| {
        let bob = &p[1].store;
        p[1].joined()
            && bob.files().resolve_path("root/src/main.js").is_some()
            && bob.drawing().snapshot().is_some()
    })
    .await;

    let synced = bob.store.files().resolve_path("root/src/main.js").unwrap();
    assert_eq!(synced, main);
    assert_eq!(bob.store.files().content(&synced), Some("console.log(1)"));
    assert_eq!(bob.store.drawing().snapshot(), Some(&DrawingData(json!({"shapes": ["circle"]}))));
    assert_eq!(bob.store.presence().len(), 2);
    assert_eq!(alice.store.presence().len(), 2);
}

#[tokio::test]
async fn tree_edits_fan_out_both_ways() {
    let url = start_relay().await;
    let mut alice = Peer::join(&url, "alice", "room-edit");
    let mut bob = Peer::join(&url, "bob", "room-edit");
    settle(&mut [&mut alice, &mut bob], |p| {
        p.iter().all(|peer| peer.joined() && peer.store.presence().len() == 2)
    })
    .await;

    let root = FileId::root();
    let id = alice.store.create_file(&root, "app.py").unwrap();
    settle(&mut [&mut alice, &mut bob], |p| p[1].store.files().contains(&id)).await;

    bob.store.rename_file(&id, "main.py").unwrap();
    settle(&mut [&mut alice, &mut bob], |p| {
        p[0].store.files().get(&id).is_some_and(|n| n.name == "main.py")
    })
    .await;

    alice.store.delete_file(&id).unwrap();
    settle(&mut [&mut alice, &mut bob], |p| !p[1].store.files().contains(&id)).await;
    assert_eq!(alice.store.files(), bob.store.files());
}

#[tokio::test]
async fn chat_reaches_other_members_once() {
    let url = start_relay().await;
    let mut alice = Peer::join(&url, "alice", "room-chat");
    let mut bob = Peer::join(&url, "bob", "room-chat");
    settle(&mut [&mut alice, &mut bob], |p| {
        p.iter().all(|peer| peer.joined() && peer.store.presence().len() == 2)
    })
    .await;

    let sent = alice.store.send_chat("hello bob").unwrap();
    settle(&mut [&mut alice, &mut bob], |p| !p[1].store.chat().messages().is_empty()).await;

    let received = &bob.store.chat().messages()[0];
    assert_eq!(received.id, sent.id);
    assert_eq!(received.username, "alice");
    assert_eq!(received.message, "hello bob");
    assert!(bob.store.chat().has_unread());

    tokio::time::sleep(Duration::from_millis(100)).await;
    alice.drain();
    bob.drain();
    assert_eq!(alice.store.chat().messages().len(), 1);
    assert_eq!(bob.store.chat().messages().len(), 1);
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let url = start_relay().await;
    let mut first = Peer::join(&url, "alice", "room-dup");
    settle(&mut [&mut first], |p| p[0].joined()).await;

    let mut second = Peer::join(&url, "alice", "room-dup");
    settle(&mut [&mut first, &mut second], |p| p[1].store.status() == SessionStatus::Initial).await;

    assert!(second.store.take_notices().contains(&Notice::UsernameTaken));
    assert_eq!(first.store.presence().len(), 1);
}

#[tokio::test]
async fn departure_shrinks_every_roster() {
    let url = start_relay().await;
    let mut alice = Peer::join(&url, "alice", "room-leave");
    let mut bob = Peer::join(&url, "bob", "room-leave");
    let mut carol = Peer::join(&url, "carol", "room-leave");
    settle(&mut [&mut alice, &mut bob, &mut carol], |p| {
        p.iter().all(|peer| peer.joined() && peer.store.presence().len() == 3)
    })
    .await;

    bob.store.leave().unwrap();
    bob.transport.disconnect().unwrap();

    settle(&mut [&mut alice, &mut carol], |p| p.iter().all(|peer| peer.store.presence().len() == 2)).await;
    assert!(alice.store.presence().get("bob").is_none());
    assert!(carol.store.presence().get("bob").is_none());
}

#[tokio::test]
async fn roster_endpoint_lists_room_members() {
    let url = start_relay().await;
    let mut alice = Peer::join(&url, "alice", "room-roster");
    let mut bob = Peer::join(&url, "bob", "room-roster");
    settle(&mut [&mut alice, &mut bob], |p| {
        p.iter().all(|peer| peer.joined() && peer.store.presence().len() == 2)
    })
    .await;

    let base = url.replacen("ws://", "http://", 1);
    let base = base.trim_end_matches("/ws");
    let roster: Vec<RemoteUser> = reqwest::get(format!("{base}/rooms/room-roster/users"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let mut names: Vec<_> = roster.iter().map(|u| u.username.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["alice", "bob"]);

    let empty: Vec<RemoteUser> = reqwest::get(format!("{base}/rooms/nobody-here/users"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(empty.is_empty());
}
