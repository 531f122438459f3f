use super::*;
use frames::EventKind;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;

const WAIT: Duration = Duration::from_secs(5);

fn fast_policy() -> ReconnectPolicy {
    ReconnectPolicy { max_retries: 2, base_delay: Duration::from_millis(10) }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("event before timeout")
        .expect("transport still running")
}

async fn listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (tcp, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
    accept_async(tcp).await.unwrap()
}

async fn recv_frame(server: &mut WebSocketStream<TcpStream>) -> Frame {
    loop {
        match timeout(WAIT, server.next()).await.unwrap().unwrap().unwrap() {
            Message::Binary(bytes) => return decode_frame(&bytes).unwrap(),
            _ => continue,
        }
    }
}

#[test]
fn backoff_doubles_from_base() {
    let policy = ReconnectPolicy::default();
    assert_eq!(policy.max_retries, 2);
    assert_eq!(policy.delay_for(1), Duration::from_millis(500));
    assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
    assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
    assert_eq!(ReconnectPolicy::new(5).max_retries, 5);
}

#[tokio::test]
async fn unreachable_relay_fails_after_two_retries() {
    let (listener, url) = listener().await;
    drop(listener);

    let (_transport, mut events) = Transport::spawn(url, fast_policy());
    assert_eq!(next_event(&mut events).await, TransportEvent::Reconnecting { attempt: 1 });
    assert_eq!(next_event(&mut events).await, TransportEvent::Reconnecting { attempt: 2 });
    assert!(matches!(next_event(&mut events).await, TransportEvent::Failed { .. }));
}

#[tokio::test]
async fn frames_emitted_before_open_are_flushed_in_order() {
    let (listener, url) = listener().await;
    let (transport, mut events) = Transport::spawn(url, fast_policy());
    transport.emit(Frame::empty(EventKind::TypingStart)).unwrap();
    transport.emit(Frame::empty(EventKind::TypingPause)).unwrap();

    let mut server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
    assert_eq!(recv_frame(&mut server).await.event, "typing-start");
    assert_eq!(recv_frame(&mut server).await.event, "typing-pause");
}

#[tokio::test]
async fn inbound_binary_and_text_frames_are_delivered() {
    let (listener, url) = listener().await;
    let (_transport, mut events) = Transport::spawn(url, fast_policy());
    let mut server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);

    let binary_frame = Frame::empty(EventKind::UsernameExists);
    server.send(binary(&binary_frame)).await.unwrap();
    assert_eq!(next_event(&mut events).await, TransportEvent::Frame(binary_frame));

    server
        .send(Message::Text(r#"{"id":"t-1","ts":1,"event":"user-online","data":{}}"#.into()))
        .await
        .unwrap();
    match next_event(&mut events).await {
        TransportEvent::Frame(frame) => assert_eq!(frame.kind(), Some(EventKind::UserOnline)),
        other => panic!("expected frame, got {other:?}"),
    }
}

#[tokio::test]
async fn unexpected_drop_reconnects_with_the_join_first() {
    let (listener, url) = listener().await;
    let (transport, mut events) = Transport::spawn(url, fast_policy());
    let server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);

    drop(server);
    assert_eq!(next_event(&mut events).await, TransportEvent::Reconnecting { attempt: 1 });
    transport.emit(Frame::empty(EventKind::RequestDrawing)).unwrap();

    let mut server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
    transport.emit(Frame::empty(EventKind::TypingStart)).unwrap();
    transport.emit_first(Frame::empty(EventKind::JoinRequest)).unwrap();
    assert_eq!(recv_frame(&mut server).await.event, "join-request");

    transport.release().unwrap();
    assert_eq!(recv_frame(&mut server).await.event, "request-drawing");
    assert_eq!(recv_frame(&mut server).await.event, "typing-start");

    transport.emit(Frame::empty(EventKind::TypingPause)).unwrap();
    assert_eq!(recv_frame(&mut server).await.event, "typing-pause");
}

#[tokio::test]
async fn discarded_backlog_never_reaches_the_new_socket() {
    let (listener, url) = listener().await;
    let (transport, mut events) = Transport::spawn(url, fast_policy());
    drop(accept(&listener).await);
    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
    assert_eq!(next_event(&mut events).await, TransportEvent::Reconnecting { attempt: 1 });
    transport.emit(Frame::empty(EventKind::FileCreated)).unwrap();

    let mut server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
    transport.discard().unwrap();
    transport.emit(Frame::empty(EventKind::UserOnline)).unwrap();
    assert_eq!(recv_frame(&mut server).await.event, "user-online");
}

#[tokio::test]
async fn intentional_disconnect_is_not_retried() {
    let (listener, url) = listener().await;
    let (transport, mut events) = Transport::spawn(url, fast_policy());
    let _server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);

    transport.disconnect().unwrap();
    assert_eq!(next_event(&mut events).await, TransportEvent::Closed);
    // Dropped while parked; must not show up after reconnecting.
    transport.emit(Frame::empty(EventKind::TypingStart)).unwrap();

    transport.connect().unwrap();
    let mut server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
    transport.emit(Frame::empty(EventKind::TypingPause)).unwrap();
    assert_eq!(recv_frame(&mut server).await.event, "typing-pause");
}

#[tokio::test]
async fn dropping_handles_stops_the_task() {
    let (listener, url) = listener().await;
    let (transport, mut events) = Transport::spawn(url, fast_policy());
    let _server = accept(&listener).await;
    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);

    drop(transport);
    let end = timeout(WAIT, events.recv()).await.unwrap();
    assert_eq!(end, None);
}
