use super::*;
use crate::model::{FileCreated, FileId, FileSystemItem, TypingStart};

#[derive(Debug)]
struct Rejected;

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("room is gone")
    }
}

impl ErrorCode for Rejected {
    fn error_code(&self) -> &'static str {
        "E_ROOM_GONE"
    }

    fn retryable(&self) -> bool {
        true
    }
}

fn sample_frame() -> Frame {
    Frame {
        id: "id-1".to_owned(),
        ts: 42,
        room_id: Some("room-1".to_owned()),
        from: Some("socket-1".to_owned()),
        event: "file-updated".to_owned(),
        data: serde_json::json!({
            "fileId": "f-1",
            "newContent": "fn main() {}",
            "ratio": 1.25,
            "ok": true,
            "tags": ["a", "b"],
            "nested": {"k": "v"},
            "nil": null
        }),
    }
}

#[test]
fn encode_decode_round_trip_preserves_frame() {
    let frame = sample_frame();
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode should succeed");
    assert_eq!(decoded, frame);
}

#[test]
fn decode_frame_rejects_malformed_bytes() {
    let err = decode_frame(&[0xff, 0x00, 0x01]).expect_err("bytes should fail");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_frame_defaults_missing_data_to_empty_object() {
    let wire = WireFrame {
        id: "id-1".to_owned(),
        ts: 1,
        room_id: None,
        from: None,
        event: "typing-pause".to_owned(),
        data: None,
    };
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");

    let frame = decode_frame(&bytes).expect("decode");
    assert_eq!(frame.data, serde_json::json!({}));
}

#[test]
fn decode_frame_converts_nan_number_to_json_null() {
    let wire = WireFrame {
        id: "id-1".to_owned(),
        ts: 1,
        room_id: None,
        from: None,
        event: "drawing-update".to_owned(),
        data: Some(prost_types::Value {
            kind: Some(prost_types::value::Kind::NumberValue(f64::NAN)),
        }),
    };
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");

    let frame = decode_frame(&bytes).expect("decode");
    assert_eq!(frame.data, Value::Null);
}

#[test]
fn integral_numbers_come_back_as_integers() {
    let frame = Frame::with_payload(EventKind::TypingStart, &TypingStart { cursor_position: 17 });
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode");

    assert_eq!(decoded.data.get("cursorPosition"), Some(&serde_json::json!(17)));
    let typed: TypingStart = decoded.payload().expect("payload");
    assert_eq!(typed.cursor_position, 17);
}

#[test]
fn negative_and_fractional_numbers_survive_the_codec() {
    let mut frame = Frame::new(EventKind::DrawingUpdate, serde_json::json!({"x": -3, "y": 0.5}));
    frame.ts = 7;
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode");
    assert_eq!(decoded.data, serde_json::json!({"x": -3, "y": 0.5}));
}

#[test]
fn text_frames_decode_from_camel_case_json() {
    let text = r#"{"id":"t-1","ts":5,"roomId":"r","event":"join-request","data":{"username":"alice","roomId":"r"}}"#;
    let frame = decode_text_frame(text).expect("decode text");

    assert_eq!(frame.room_id.as_deref(), Some("r"));
    assert_eq!(frame.from, None);
    assert_eq!(frame.kind(), Some(EventKind::JoinRequest));
}

#[test]
fn text_frames_reject_garbage() {
    let err = decode_text_frame("not json").expect_err("should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn payload_mismatch_names_the_event() {
    let frame = Frame::new(EventKind::FileCreated, serde_json::json!({"parentDirId": 3}));
    let err = frame.payload::<FileCreated>().expect_err("shape mismatch");

    match err {
        CodecError::Payload { event, .. } => assert_eq!(event, "file-created"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn typed_payload_round_trips_through_binary_codec() {
    let created = FileCreated {
        parent_dir_id: FileId::root(),
        new_file: FileSystemItem::file(FileId::from("f-9"), "main.rs", "fn main() {}\n"),
    };
    let frame = Frame::with_payload(EventKind::FileCreated, &created).with_room("room-1");
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode");

    assert_eq!(decoded.payload::<FileCreated>().expect("payload"), created);
}

#[test]
fn error_from_carries_code_message_and_retryable() {
    let frame = Frame::error_from(&Rejected);

    assert_eq!(frame.kind(), Some(EventKind::Error));
    assert_eq!(frame.data[FRAME_CODE], "E_ROOM_GONE");
    assert_eq!(frame.data[FRAME_MESSAGE], "room is gone");
    assert_eq!(frame.data[FRAME_RETRYABLE], true);
}

#[test]
fn relabel_keeps_sender_and_payload() {
    let frame = sample_frame().relabel(EventKind::ReceiveMessage);

    assert_eq!(frame.event, "receive-message");
    assert_eq!(frame.id, "id-1");
    assert_eq!(frame.from.as_deref(), Some("socket-1"));
    assert_eq!(frame.data, sample_frame().data);
}

#[test]
fn unknown_event_has_no_kind() {
    let mut frame = sample_frame();
    frame.event = "room:ping".to_owned();
    assert_eq!(frame.kind(), None);
}

#[test]
fn every_event_name_parses_back() {
    for kind in EventKind::ALL {
        assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        assert_eq!(kind.to_string(), kind.as_str());
    }
}

#[test]
fn event_categories_do_not_overlap_with_relay_only() {
    for kind in EventKind::ALL {
        if kind.is_file_tree() {
            assert!(!kind.is_relay_only(), "{kind} is both");
        }
    }
    assert!(EventKind::FileUpdated.is_chatty());
    assert!(!EventKind::SendMessage.is_chatty());
}

#[test]
fn new_frames_get_fresh_ids() {
    let a = Frame::empty(EventKind::TypingPause);
    let b = Frame::empty(EventKind::TypingPause);
    assert_ne!(a.id, b.id);
    assert!(a.ts > 0);
    assert_eq!(a.data, serde_json::json!({}));
}
