//! WebSocket handler: bidirectional frame relay.
//!
//! DESIGN
//! ======
//! On upgrade, assigns a socket id and enters a `select!` loop:
//! - Incoming client frames → decode + dispatch by event name
//! - Frames from room peers → forward to client
//!
//! Handler functions validate, mutate room state, and return an `Outcome`.
//! The dispatch layer owns all outbound concerns: reply to sender,
//! broadcast to peers, or forward to one target socket.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → socket id assigned
//! 2. `join-request` → admission → `join-accepted` + `user-joined`
//! 3. Room events → dispatch → handler returns Outcome
//! 4. Close → part room → `user-disconnected` to remaining members

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use frames::model::{
    ChatPayload, DirectoryCreated, DirectoryDeleted, DirectoryRenamed, DrawingRequest, DrawingSync, DrawingUpdate,
    FileCreated, FileDeleted, FileRenamed, FileStructureSync, FileUpdated, JoinAccepted, JoinRequest, PresenceUpdate,
    SocketId, StatusChange, TypingStart, UserDisconnected, UserJoined, UserStatus,
};
use frames::{CodecError, ErrorCode, EventKind, Frame};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::services::room::{self, RoomError};
use crate::state::AppState;

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what; handlers never send frames directly.
enum Outcome {
    /// Send a frame to the sender only.
    Reply(Frame),
    /// Broadcast to all room peers EXCLUDING sender.
    Broadcast(Frame),
    /// Reply to sender with one frame, broadcast another to peers.
    ReplyAndBroadcast { reply: Frame, broadcast: Frame },
    /// Forward to a single member of the sender's room.
    SendTo { target: SocketId, frame: Frame },
    /// Nothing to send.
    Done,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
enum DispatchError {
    #[error("{0}")]
    Codec(#[from] CodecError),
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    #[error("{0} may only be sent by the relay")]
    RelayOnly(EventKind),
    #[error("must join a room first")]
    NotInRoom,
    #[error("{0} requires a target socketId")]
    MissingTarget(EventKind),
    #[error(transparent)]
    Room(#[from] RoomError),
}

impl ErrorCode for DispatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Codec(CodecError::Payload { .. }) => "E_BAD_PAYLOAD",
            Self::Codec(_) => "E_BAD_FRAME",
            Self::UnknownEvent(_) => "E_UNKNOWN_EVENT",
            Self::RelayOnly(_) => "E_RELAY_ONLY",
            Self::NotInRoom => "E_NOT_IN_ROOM",
            Self::MissingTarget(_) => "E_MISSING_TARGET",
            Self::Room(e) => e.error_code(),
        }
    }
}

// =============================================================================
// CONNECTION
// =============================================================================

/// Encoding used for frames sent back to a client. Follows whatever the
/// client last sent, so browser debugging tools can speak JSON.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WireMode {
    Binary,
    Text,
}

/// Per-socket dispatch context.
struct Connection {
    socket_id: SocketId,
    room_id: Option<String>,
    tx: mpsc::Sender<Frame>,
    mode: WireMode,
}

impl Connection {
    fn new(socket_id: SocketId, tx: mpsc::Sender<Frame>) -> Self {
        Self { socket_id, room_id: None, tx, mode: WireMode::Binary }
    }
}

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

async fn run_ws(mut socket: WebSocket, state: AppState) {
    // Per-connection channel for receiving frames from room peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(state.channel_capacity);
    let mut conn = Connection::new(SocketId::generate(), client_tx);

    info!(socket_id = %conn.socket_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                let parsed = match msg {
                    Message::Binary(bytes) => {
                        conn.mode = WireMode::Binary;
                        frames::decode_frame(&bytes)
                    }
                    Message::Text(text) => {
                        conn.mode = WireMode::Text;
                        frames::decode_text_frame(text.as_str())
                    }
                    Message::Close(_) => break,
                    _ => continue,
                };
                for frame in process_inbound(&state, &mut conn, parsed).await {
                    let _ = send_frame(&mut socket, conn.mode, &frame).await;
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, conn.mode, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(room_id) = conn.room_id.take() {
        leave_room(&state, &conn.socket_id, &room_id).await;
    }
    info!(socket_id = %conn.socket_id, "ws: client disconnected");
}

/// Part a room and tell the remaining members who left.
async fn leave_room(state: &AppState, socket_id: &SocketId, room_id: &str) {
    let Some(member) = room::part_room(state, room_id, socket_id).await else {
        return;
    };
    let frame = Frame::with_payload(EventKind::UserDisconnected, &UserDisconnected { user: member.user() })
        .with_room(room_id)
        .with_from(socket_id.to_string());
    room::broadcast(state, room_id, &frame, None).await;
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Process one decoded inbound frame and return frames for the sender.
///
/// This keeps the websocket transport concerns separate from frame handling,
/// so tests can exercise dispatch without a socket.
async fn process_inbound(state: &AppState, conn: &mut Connection, parsed: Result<Frame, CodecError>) -> Vec<Frame> {
    let mut req = match parsed {
        Ok(frame) => frame,
        Err(e) => {
            warn!(socket_id = %conn.socket_id, error = %e, "ws: invalid inbound frame");
            return vec![Frame::error_from(&DispatchError::Codec(e))];
        }
    };

    // Stamp the connection's socket id as `from`.
    req.from = Some(conn.socket_id.to_string());

    let result = match req.kind() {
        None => Err(DispatchError::UnknownEvent(req.event.clone())),
        Some(kind) => {
            if kind.is_chatty() {
                debug!(socket_id = %conn.socket_id, event = %kind, "ws: recv frame");
            } else {
                info!(socket_id = %conn.socket_id, id = %req.id, event = %kind, "ws: recv frame");
            }
            match kind {
                EventKind::JoinRequest => handle_join(state, conn, &req).await,
                kind if kind.is_relay_only() => Err(DispatchError::RelayOnly(kind)),
                kind => handle_room_event(state, conn, kind, &req).await,
            }
        }
    };

    // Apply outcome: the dispatch layer owns all outbound logic.
    match result {
        Ok(Outcome::Reply(frame)) => vec![frame],
        Ok(Outcome::Broadcast(frame)) => {
            if let Some(room_id) = &conn.room_id {
                room::broadcast(state, room_id, &frame, Some(&conn.socket_id)).await;
            }
            vec![]
        }
        Ok(Outcome::ReplyAndBroadcast { reply, broadcast }) => {
            if let Some(room_id) = &conn.room_id {
                room::broadcast(state, room_id, &broadcast, Some(&conn.socket_id)).await;
            }
            vec![reply]
        }
        Ok(Outcome::SendTo { target, frame }) => {
            let Some(room_id) = &conn.room_id else {
                return vec![Frame::error_from(&DispatchError::NotInRoom)];
            };
            match room::send_to(state, room_id, &target, &frame).await {
                Ok(()) => vec![],
                Err(e) => vec![Frame::error_from(&DispatchError::Room(e))],
            }
        }
        Ok(Outcome::Done) => vec![],
        Err(e) => {
            warn!(socket_id = %conn.socket_id, event = %req.event, code = e.error_code(), error = %e, "ws: dispatch failed");
            vec![Frame::error_from(&e)]
        }
    }
}

// =============================================================================
// JOIN HANDLER
// =============================================================================

async fn handle_join(state: &AppState, conn: &mut Connection, req: &Frame) -> Result<Outcome, DispatchError> {
    let request: JoinRequest = req.payload()?;

    // Part current room if already joined.
    if let Some(old_room) = conn.room_id.take() {
        leave_room(state, &conn.socket_id, &old_room).await;
    }

    match room::join_room(state, &request, &conn.socket_id, conn.tx.clone()).await {
        Ok(admission) => {
            let room_id = admission.member.room_id.clone();
            conn.room_id = Some(room_id.clone());

            let reply = Frame::with_payload(
                EventKind::JoinAccepted,
                &JoinAccepted { user: admission.user(), users: admission.users },
            )
            .with_room(room_id.clone());
            let broadcast = Frame::with_payload(EventKind::UserJoined, &UserJoined { user: admission.member })
                .with_room(room_id)
                .with_from(conn.socket_id.to_string());

            Ok(Outcome::ReplyAndBroadcast { reply, broadcast })
        }
        Err(RoomError::UsernameExists { username, room_id }) => {
            info!(socket_id = %conn.socket_id, %room_id, %username, "ws: username already taken");
            Ok(Outcome::Reply(Frame::empty(EventKind::UsernameExists).with_room(room_id)))
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// ROOM EVENT HANDLERS
// =============================================================================

async fn handle_room_event(
    state: &AppState,
    conn: &Connection,
    kind: EventKind,
    req: &Frame,
) -> Result<Outcome, DispatchError> {
    let Some(room_id) = conn.room_id.as_deref() else {
        return Err(DispatchError::NotInRoom);
    };
    let socket_id = &conn.socket_id;
    let stamp = |frame: Frame| frame.with_room(room_id).with_from(socket_id.to_string());

    match kind {
        EventKind::FileCreated
        | EventKind::FileUpdated
        | EventKind::FileRenamed
        | EventKind::FileDeleted
        | EventKind::DirectoryCreated
        | EventKind::DirectoryRenamed
        | EventKind::DirectoryDeleted
        | EventKind::DrawingUpdate => {
            check_payload(kind, req)?;
            Ok(Outcome::Broadcast(stamp(req.clone())))
        }
        EventKind::SendMessage => {
            let _: ChatPayload = req.payload()?;
            Ok(Outcome::Broadcast(stamp(req.relabel(EventKind::ReceiveMessage))))
        }
        EventKind::TypingStart | EventKind::TypingPause => {
            let cursor = if kind == EventKind::TypingStart {
                Some(req.payload::<TypingStart>()?.cursor_position)
            } else {
                None
            };
            let updated = room::update_user(state, room_id, socket_id, |user| {
                user.typing = cursor.is_some();
                if let Some(position) = cursor {
                    user.cursor_position = position;
                }
            })
            .await;
            Ok(updated.map_or(Outcome::Done, |user| {
                Outcome::Broadcast(stamp(Frame::with_payload(kind, &PresenceUpdate { user })))
            }))
        }
        EventKind::UserOnline | EventKind::UserOffline => {
            let status = if kind == EventKind::UserOnline { UserStatus::Online } else { UserStatus::Offline };
            room::update_user(state, room_id, socket_id, |user| user.status = status).await;
            Ok(Outcome::Broadcast(stamp(Frame::with_payload(
                kind,
                &StatusChange { socket_id: socket_id.clone() },
            ))))
        }
        EventKind::RequestDrawing => Ok(Outcome::Broadcast(stamp(Frame::with_payload(
            kind,
            &DrawingRequest { socket_id: socket_id.clone() },
        )))),
        EventKind::SyncDrawing => {
            let sync: DrawingSync = req.payload()?;
            let target = sync.socket_id.ok_or(DispatchError::MissingTarget(kind))?;
            Ok(Outcome::SendTo { target, frame: stamp(req.clone()) })
        }
        EventKind::SyncFileStructure => {
            let sync: FileStructureSync = req.payload()?;
            Ok(Outcome::SendTo { target: sync.socket_id, frame: stamp(req.clone()) })
        }
        EventKind::JoinRequest
        | EventKind::JoinAccepted
        | EventKind::UsernameExists
        | EventKind::UserJoined
        | EventKind::UserDisconnected
        | EventKind::ReceiveMessage
        | EventKind::Error => Err(DispatchError::RelayOnly(kind)),
    }
}

/// Reject tree and drawing frames whose payload does not match the event.
fn check_payload(kind: EventKind, req: &Frame) -> Result<(), CodecError> {
    match kind {
        EventKind::FileCreated => req.payload::<FileCreated>().map(drop),
        EventKind::FileUpdated => req.payload::<FileUpdated>().map(drop),
        EventKind::FileRenamed => req.payload::<FileRenamed>().map(drop),
        EventKind::FileDeleted => req.payload::<FileDeleted>().map(drop),
        EventKind::DirectoryCreated => req.payload::<DirectoryCreated>().map(drop),
        EventKind::DirectoryRenamed => req.payload::<DirectoryRenamed>().map(drop),
        EventKind::DirectoryDeleted => req.payload::<DirectoryDeleted>().map(drop),
        EventKind::DrawingUpdate => req.payload::<DrawingUpdate>().map(drop),
        _ => Ok(()),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, mode: WireMode, frame: &Frame) -> Result<(), axum::Error> {
    match frame.kind() {
        Some(EventKind::Error) => {
            let code = frame.data.get(frames::FRAME_CODE).and_then(|v| v.as_str()).unwrap_or("-");
            let message = frame.data.get(frames::FRAME_MESSAGE).and_then(|v| v.as_str()).unwrap_or("-");
            warn!(id = %frame.id, code, message, "ws: send error frame");
        }
        Some(kind) if kind.is_chatty() => debug!(id = %frame.id, event = %kind, "ws: send frame"),
        _ => info!(id = %frame.id, event = %frame.event, "ws: send frame"),
    }

    let msg = match mode {
        WireMode::Binary => Message::Binary(frames::encode_frame(frame).into()),
        WireMode::Text => match serde_json::to_string(frame) {
            Ok(json) => Message::Text(json.into()),
            Err(e) => {
                warn!(error = %e, "ws: failed to serialize frame");
                return Ok(());
            }
        },
    };
    socket.send(msg).await
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
