//! End-to-end relay tests over real WebSocket connections.

use futures_util::{SinkExt, StreamExt};
use scan_relay::config::Config;
use scan_relay::http::build_router;
use scan_relay::server::PairRelay;
use scan_types::{Envelope, StatusEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

async fn start() -> (SocketAddr, Arc<PairRelay>) {
    let relay = Arc::new(PairRelay::new(Config::default()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(Arc::clone(&relay));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, relay)
}

async fn connect(addr: SocketAddr, query: &str) -> Client {
    let url = format!("ws://{addr}/ws?{query}");
    let (client, _) = connect_async(url).await.expect("upgrade should succeed");
    client
}

async fn join(addr: SocketAddr, role: &str, session: &str) -> Client {
    connect(addr, &format!("role={role}&session={session}")).await
}

/// Next text or binary frame, skipping control frames.
async fn next_frame(client: &mut Client) -> Message {
    loop {
        let msg = tokio::time::timeout(WAIT, client.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("read error");
        match msg {
            Message::Ping(_) | Message::Pong(_) => continue,
            other => return other,
        }
    }
}

async fn next_status(client: &mut Client) -> StatusEvent {
    match next_frame(client).await {
        Message::Text(text) => Envelope::from_json(&text)
            .unwrap()
            .status_event()
            .expect("expected status envelope"),
        other => panic!("expected status text frame, got {other:?}"),
    }
}

async fn expect_close(client: &mut Client) -> u16 {
    match next_frame(client).await {
        Message::Close(Some(frame)) => u16::from(frame.code),
        other => panic!("expected close frame, got {other:?}"),
    }
}

async fn assert_silent(client: &mut Client) {
    let res = tokio::time::timeout(Duration::from_millis(200), next_frame(client)).await;
    assert!(res.is_err(), "unexpected frame: {:?}", res.ok());
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !cond() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn invalid_handshake_closes_with_4000() {
    let (addr, _relay) = start().await;

    for query in ["session=abc", "role=desktop", "role=tablet&session=abc", "role=mobile&session="] {
        let mut client = connect(addr, query).await;
        assert_eq!(expect_close(&mut client).await, 4000, "query {query}");
    }
}

#[tokio::test]
async fn repeated_query_keys_use_first_value() {
    let (addr, relay) = start().await;

    let mut bad = connect(addr, "role=tablet&role=desktop&session=dup").await;
    assert_eq!(expect_close(&mut bad).await, 4000);

    let mut orphan = connect(addr, "role=mobile&role=desktop&session=dup").await;
    assert_eq!(expect_close(&mut orphan).await, 4001);

    let mut desktop = connect(addr, "role=desktop&role=mobile&session=dup&session=other").await;
    let mut mobile = join(addr, "mobile", "dup").await;
    assert_eq!(next_status(&mut desktop).await, StatusEvent::PartnerConnected);
    assert_eq!(next_status(&mut mobile).await, StatusEvent::PartnerConnected);
    assert_eq!(relay.total_sessions(), 1);
}

#[tokio::test]
async fn mobile_before_desktop_closes_with_4001() {
    let (addr, relay) = start().await;

    let mut mobile = join(addr, "mobile", "nobody-home").await;
    assert_eq!(expect_close(&mut mobile).await, 4001);
    assert_eq!(relay.total_sessions(), 0);
}

#[tokio::test]
async fn paired_clients_relay_frames_both_ways() {
    let (addr, _relay) = start().await;

    let mut desktop = join(addr, "desktop", "s1").await;
    let mut mobile = join(addr, "mobile", "s1").await;

    assert_eq!(next_status(&mut desktop).await, StatusEvent::PartnerConnected);
    assert_eq!(next_status(&mut mobile).await, StatusEvent::PartnerConnected);

    let frames = [
        r#"{"type":"transcript","payload":{"text":"hello"}}"#,
        r#"{"type":"transcript","payload":{"text":"world"}}"#,
        "not json at all",
    ];
    for f in frames {
        mobile.send(Message::Text(f.to_string())).await.unwrap();
    }
    for f in frames {
        assert_eq!(next_frame(&mut desktop).await, Message::Text(f.to_string()));
    }

    desktop.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    assert_eq!(next_frame(&mut mobile).await, Message::Binary(vec![1, 2, 3]));
}

#[tokio::test]
async fn frame_without_partner_is_dropped_silently() {
    let (addr, relay) = start().await;

    let mut desktop = join(addr, "desktop", "alone").await;
    desktop
        .send(Message::Text("anyone?".to_string()))
        .await
        .unwrap();
    assert_silent(&mut desktop).await;
    wait_until(|| relay.total_connections() == 1).await;
}

#[tokio::test]
async fn partner_disconnect_then_session_removal() {
    let (addr, relay) = start().await;

    let mut desktop = join(addr, "desktop", "s2").await;
    let mut mobile = join(addr, "mobile", "s2").await;
    next_status(&mut desktop).await;
    next_status(&mut mobile).await;

    mobile.close(None).await.unwrap();
    assert_eq!(next_status(&mut desktop).await, StatusEvent::PartnerDisconnected);
    assert_silent(&mut desktop).await;
    assert_eq!(relay.total_sessions(), 1);

    desktop.close(None).await.unwrap();
    wait_until(|| relay.total_sessions() == 0).await;

    let mut late = join(addr, "mobile", "s2").await;
    assert_eq!(expect_close(&mut late).await, 4001);
}

#[tokio::test]
async fn same_role_reconnect_replaces_older_connection() {
    let (addr, _relay) = start().await;

    let mut old_desktop = join(addr, "desktop", "s3").await;
    let mut mobile = join(addr, "mobile", "s3").await;
    next_status(&mut old_desktop).await;
    next_status(&mut mobile).await;

    let mut new_desktop = join(addr, "desktop", "s3").await;
    assert_eq!(expect_close(&mut old_desktop).await, 4002);
    assert_eq!(next_status(&mut new_desktop).await, StatusEvent::PartnerConnected);
    assert_eq!(next_status(&mut mobile).await, StatusEvent::PartnerConnected);

    // The replaced connection's departure is still reported, but the slot
    // stays with the newer desktop.
    assert_eq!(next_status(&mut mobile).await, StatusEvent::PartnerDisconnected);
    mobile.send(Message::Text("still here".to_string())).await.unwrap();
    assert_eq!(
        next_frame(&mut new_desktop).await,
        Message::Text("still here".to_string())
    );
    assert_silent(&mut mobile).await;
}

#[tokio::test]
async fn upgrade_on_other_path_is_refused() {
    let (addr, _relay) = start().await;
    let result = connect_async(format!("ws://{addr}/not-the-relay?role=desktop&session=x")).await;
    assert!(result.is_err());
}
