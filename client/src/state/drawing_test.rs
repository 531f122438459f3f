use super::*;
use serde_json::json;

fn data(value: serde_json::Value) -> DrawingData {
    DrawingData(value)
}

#[test]
fn empty_replica_does_not_answer() {
    let mut drawing = DrawingReplica::default();
    assert!(drawing.respond_to(&SocketId::from("s-new")).is_none());
}

#[test]
fn answers_each_requester_once() {
    let mut drawing = DrawingReplica::default();
    drawing.set_local(data(json!({"shapes": [1, 2]})));
    let requester = SocketId::from("s-new");

    let sync = drawing.respond_to(&requester).unwrap();
    assert_eq!(sync.socket_id, Some(requester.clone()));
    assert_eq!(sync.drawing_data, data(json!({"shapes": [1, 2]})));
    assert!(drawing.respond_to(&requester).is_none());
    assert!(drawing.respond_to(&SocketId::from("s-other")).is_some());
}

#[test]
fn forgotten_peer_can_be_answered_again() {
    let mut drawing = DrawingReplica::default();
    drawing.set_local(data(json!({})));
    let requester = SocketId::from("s-new");
    drawing.respond_to(&requester);
    drawing.forget(&requester);
    assert!(drawing.respond_to(&requester).is_some());
}

#[test]
fn last_received_snapshot_wins() {
    let mut drawing = DrawingReplica::default();
    drawing.apply_sync(DrawingSync { socket_id: None, drawing_data: data(json!({"v": 1})) });
    drawing.apply_sync(DrawingSync { socket_id: None, drawing_data: data(json!({"v": 2})) });
    assert_eq!(drawing.snapshot(), Some(&data(json!({"v": 2}))));

    drawing.apply_update(DrawingUpdate { snapshot: data(json!({"v": 3})) });
    assert_eq!(drawing.snapshot(), Some(&data(json!({"v": 3}))));
}

#[test]
fn set_local_returns_broadcast_and_clear_resets() {
    let mut drawing = DrawingReplica::default();
    let update = drawing.set_local(data(json!([1])));
    assert_eq!(update.snapshot, data(json!([1])));

    drawing.clear();
    assert!(drawing.snapshot().is_none());
}
