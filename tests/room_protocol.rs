use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use roomsync::config::{Config, SyncPolicy};
use roomsync::routes::create_app;
use roomsync::session::{CloseReason, Notification, RoomSession, SessionError, SessionEvent};
use roomsync::AppState;

const TIMEOUT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(300);

type RawClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    ws_url: String,
    http_url: String,
    state: Arc<AppState>,
}

async fn boot_server(config: Config) -> TestServer {
    let state = Arc::new(AppState::from_config(&config));
    let app = create_app(state.clone(), &config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        ws_url: format!("ws://{addr}/ws"),
        http_url: format!("http://{addr}"),
        state,
    }
}

async fn wait_for<F>(events: &mut mpsc::Receiver<SessionEvent>, mut pred: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    loop {
        let event = timeout(TIMEOUT, events.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("session event channel closed");
        if pred(&event) {
            return event;
        }
    }
}

async fn wait_for_presence(events: &mut mpsc::Receiver<SessionEvent>, names: &[&str]) {
    wait_for(events, |e| match e {
        SessionEvent::PresenceChanged(members) => {
            members.iter().map(|m| m.display_name.as_str()).collect::<Vec<_>>() == names
        }
        _ => false,
    })
    .await;
}

/// A bare socket that sends JOIN and then does whatever the test wants.
async fn raw_join(url: &str, room: &str, name: &str) -> RawClient {
    let (mut ws, _) = connect_async(url).await.unwrap();
    let join = json!({ "type": "join", "room": room, "displayName": name });
    ws.send(Message::text(join.to_string())).await.unwrap();
    ws
}

/// Drain whatever arrives until the channel has been quiet for a moment.
async fn drain(events: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(Some(event)) = timeout(QUIET, events.recv()).await {
        seen.push(event);
    }
    seen
}

#[tokio::test]
async fn alice_and_bob_share_presence_and_document() {
    let server = boot_server(Config::default()).await;

    let (alice, mut alice_events) = RoomSession::join(&server.ws_url, "r1", "Alice").await.unwrap();
    wait_for_presence(&mut alice_events, &["Alice"]).await;
    alice.edit("print('hi')").unwrap();

    let (bob, mut bob_events) = RoomSession::join(&server.ws_url, "r1", "Bob").await.unwrap();

    // Alice hears about Bob, never about herself.
    let seen = drain(&mut alice_events).await;
    let notices: Vec<String> = seen
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Notification(n) => Some(n.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(notices, vec!["Bob joined the room."]);
    assert!(seen.iter().any(|e| matches!(
        e,
        SessionEvent::PresenceChanged(m) if m.len() == 2
    )));

    // Bob gets the roster and Alice's snapshot.
    wait_for_presence(&mut bob_events, &["Alice", "Bob"]).await;
    wait_for(&mut bob_events, |e| {
        matches!(e, SessionEvent::RemoteChange(code) if code == "print('hi')")
    })
    .await;
    assert_eq!(bob.document().as_deref(), Some("print('hi')"));

    let room = server.state.registry.room("r1").await.unwrap();
    assert_eq!(room.participants.len(), 2);

    bob.leave().await;

    wait_for(&mut alice_events, |e| {
        matches!(e, SessionEvent::Notification(Notification::UserLeft(name)) if name == "Bob")
    })
    .await;
    wait_for_presence(&mut alice_events, &["Alice"]).await;
    let room = server.state.registry.room("r1").await.unwrap();
    assert_eq!(room.participants.len(), 1);

    alice.leave().await;
}

#[tokio::test]
async fn edits_reach_everyone_but_the_sender() {
    let server = boot_server(Config::default()).await;
    let (alice, mut alice_events) = RoomSession::join(&server.ws_url, "edits", "Alice").await.unwrap();
    let (bob, mut bob_events) = RoomSession::join(&server.ws_url, "edits", "Bob").await.unwrap();
    wait_for_presence(&mut alice_events, &["Alice", "Bob"]).await;
    wait_for_presence(&mut bob_events, &["Alice", "Bob"]).await;
    drain(&mut alice_events).await;

    bob.edit("x = 2").unwrap();

    wait_for(&mut alice_events, |e| matches!(e, SessionEvent::RemoteChange(c) if c == "x = 2")).await;
    assert_eq!(alice.document().as_deref(), Some("x = 2"));
    let echoed = drain(&mut bob_events).await;
    assert!(!echoed.iter().any(|e| matches!(e, SessionEvent::RemoteChange(_))));

    alice.leave().await;
    bob.leave().await;
}

#[tokio::test]
async fn joiner_keeps_the_last_snapshot_it_applies() {
    let server = boot_server(Config::default()).await;
    let (a, mut a_events) = RoomSession::join(&server.ws_url, "race", "A").await.unwrap();
    wait_for_presence(&mut a_events, &["A"]).await;
    a.edit("first").unwrap();

    let (b, mut b_events) = RoomSession::join(&server.ws_url, "race", "B").await.unwrap();
    wait_for(&mut b_events, |e| matches!(e, SessionEvent::RemoteChange(_))).await;

    let (c, mut c_events) = RoomSession::join(&server.ws_url, "race", "C").await.unwrap();
    let snapshots: Vec<String> = drain(&mut c_events)
        .await
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::RemoteChange(code) => Some(code),
            _ => None,
        })
        .collect();

    // A and B each answered; C's own empty answer is ignored.
    assert_eq!(snapshots.len(), 2);
    assert_eq!(c.document(), snapshots.last().cloned());

    a.leave().await;
    b.leave().await;
    c.leave().await;
}

#[tokio::test]
async fn elected_policy_sends_one_snapshot() {
    let config = Config {
        sync_policy: SyncPolicy::Elected,
        ..Config::default()
    };
    let server = boot_server(config).await;
    let (a, mut a_events) = RoomSession::join(&server.ws_url, "calm", "A").await.unwrap();
    wait_for_presence(&mut a_events, &["A"]).await;
    a.edit("only").unwrap();
    let (b, mut b_events) = RoomSession::join(&server.ws_url, "calm", "B").await.unwrap();
    wait_for(&mut b_events, |e| matches!(e, SessionEvent::RemoteChange(_))).await;

    let (c, mut c_events) = RoomSession::join(&server.ws_url, "calm", "C").await.unwrap();
    let snapshots = drain(&mut c_events)
        .await
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::RemoteChange(_)))
        .count();
    assert_eq!(snapshots, 1);
    assert_eq!(c.document().as_deref(), Some("only"));

    a.leave().await;
    b.leave().await;
    c.leave().await;
}

#[tokio::test]
async fn connect_failure_is_terminal() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = RoomSession::join(&format!("ws://{addr}/ws"), "r1", "Alice").await;
    match result {
        Err(err @ SessionError::Connect(_)) => {
            assert_eq!(err.notification(), Notification::ConnectionFailed);
        }
        Err(other) => panic!("expected connect error, got {other}"),
        Ok(_) => panic!("expected connect error, got a session"),
    }
}

#[tokio::test]
async fn leaving_stops_all_event_handling() {
    let server = boot_server(Config::default()).await;
    let (alice, mut alice_events) = RoomSession::join(&server.ws_url, "quiet", "Alice").await.unwrap();
    wait_for_presence(&mut alice_events, &["Alice"]).await;

    alice.leave().await;

    // The loop is gone: the channel drains and ends without a Closed event.
    let rest = drain(&mut alice_events).await;
    assert!(!rest.iter().any(|e| matches!(e, SessionEvent::Closed(_))));
    assert!(alice_events.recv().await.is_none());

    // The server notices the close on its own schedule.
    timeout(TIMEOUT, async {
        while server.state.registry.room("quiet").await.is_some() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("room was never discarded");
}

#[tokio::test]
async fn malformed_event_closes_the_channel() {
    let server = boot_server(Config::default()).await;
    let (mut ws, _) = connect_async(server.ws_url.as_str()).await.unwrap();

    ws.send(Message::text("{\"type\":\"nonsense\"}")).await.unwrap();

    let mut saw_error = false;
    loop {
        match timeout(TIMEOUT, ws.next()).await.expect("timed out") {
            Some(Ok(Message::Text(text))) => {
                let value: Value = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(value["type"], "error");
                saw_error = true;
            }
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
            Some(Ok(_)) => {}
        }
    }
    assert!(saw_error);
    assert_eq!(server.state.registry.stats().await.connections, 0);
}

#[tokio::test]
async fn room_presence_is_served_over_http() {
    let server = boot_server(Config::default()).await;
    let (alice, mut alice_events) = RoomSession::join(&server.ws_url, "lobby", "Alice").await.unwrap();
    wait_for_presence(&mut alice_events, &["Alice"]).await;

    let body: Value = reqwest::get(format!("{}/api/v1/rooms/lobby", server.http_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["roomId"], "lobby");
    assert_eq!(body["members"][0]["displayName"], "Alice");

    let missing = reqwest::get(format!("{}/api/v1/rooms/nowhere", server.http_url))
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    let list: Value = reqwest::get(format!("{}/api/v1/rooms", server.http_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["rooms"][0]["memberCount"], 1);

    alice.leave().await;
}

#[tokio::test]
async fn padded_name_and_room_are_taken_verbatim() {
    let server = boot_server(Config::default()).await;
    let (alice, mut alice_events) = RoomSession::join(&server.ws_url, " r1", "Alice ").await.unwrap();

    wait_for_presence(&mut alice_events, &["Alice "]).await;
    let seen = drain(&mut alice_events).await;
    assert!(!seen.iter().any(|e| matches!(e, SessionEvent::Notification(_))));

    assert!(server.state.registry.room(" r1").await.is_some());
    assert!(server.state.registry.room("r1").await.is_none());

    alice.leave().await;
}

#[tokio::test]
async fn peer_vanishing_without_close_is_announced() {
    let server = boot_server(Config::default()).await;
    let (alice, mut alice_events) = RoomSession::join(&server.ws_url, "drop", "Alice").await.unwrap();
    wait_for_presence(&mut alice_events, &["Alice"]).await;

    let bob = raw_join(&server.ws_url, "drop", "Bob").await;
    wait_for_presence(&mut alice_events, &["Alice", "Bob"]).await;

    // No close frame: the TCP stream just goes away.
    drop(bob);

    wait_for(&mut alice_events, |e| {
        matches!(e, SessionEvent::Notification(Notification::UserLeft(name)) if name == "Bob")
    })
    .await;
    wait_for_presence(&mut alice_events, &["Alice"]).await;

    alice.leave().await;
}

#[tokio::test]
async fn coordinator_vanishing_ends_the_session() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _join = ws.next().await;
        let joined = json!({
            "type": "joined",
            "members": [{ "connectionId": "c1", "displayName": "Alice" }],
            "joinerName": "Alice",
            "joinerConnectionId": "c1",
        });
        ws.send(Message::text(joined.to_string())).await.unwrap();
        drop(ws);
    });

    let (alice, mut alice_events) = RoomSession::join(&format!("ws://{addr}/ws"), "r1", "Alice")
        .await
        .unwrap();
    wait_for_presence(&mut alice_events, &["Alice"]).await;

    match wait_for(&mut alice_events, |e| matches!(e, SessionEvent::Closed(_))).await {
        SessionEvent::Closed(CloseReason::TransportLost(_)) => {}
        other => panic!("expected transport loss, got {:?}", other),
    }

    // Terminal: no reconnect, nothing more arrives, edits are refused.
    assert!(timeout(TIMEOUT, alice_events.recv()).await.unwrap().is_none());
    assert!(matches!(alice.edit("late"), Err(SessionError::Closed)));
    alice.leave().await;
}

#[tokio::test]
async fn silent_channel_is_closed_and_announced() {
    let config = Config {
        heartbeat_interval_secs: 1,
        idle_timeout_secs: 2,
        ..Config::default()
    };
    let server = boot_server(config).await;
    let (alice, mut alice_events) = RoomSession::join(&server.ws_url, "idle", "Alice").await.unwrap();
    wait_for_presence(&mut alice_events, &["Alice"]).await;

    // Never reads, so never answers pings.
    let _quiet = raw_join(&server.ws_url, "idle", "Quiet").await;
    wait_for_presence(&mut alice_events, &["Alice", "Quiet"]).await;

    wait_for(&mut alice_events, |e| {
        matches!(e, SessionEvent::Notification(Notification::UserLeft(name)) if name == "Quiet")
    })
    .await;

    // Alice answers pings and stays in.
    let room = server.state.registry.room("idle").await.unwrap();
    assert_eq!(room.participants.len(), 1);
    assert_eq!(room.participants[0].display_name, "Alice");

    alice.leave().await;
}
