//! Room service: admission, part, roster updates and fan-out.
//!
//! DESIGN
//! ======
//! Rooms are created lazily by the first successful join and evicted when
//! the last client parts. Admission enforces one username per room; the
//! check and the insert happen under one write lock so two sockets racing
//! for the same name cannot both win.

use frames::model::{JoinRequest, RemoteUser, SocketId, User};
use frames::{ErrorCode, Frame};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("username and room id are required")]
    InvalidJoin,
    #[error("username {username:?} is already taken in room {room_id}")]
    UsernameExists { username: String, room_id: String },
    #[error("room not found: {0}")]
    NotFound(String),
    #[error("peer not found: {0}")]
    PeerNotFound(SocketId),
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidJoin => "E_INVALID_JOIN",
            Self::UsernameExists { .. } => "E_USERNAME_EXISTS",
            Self::NotFound(_) => "E_ROOM_NOT_FOUND",
            Self::PeerNotFound(_) => "E_PEER_NOT_FOUND",
        }
    }
}

/// Result of a successful join.
#[derive(Debug, Clone)]
pub struct Admission {
    /// Roster entry created for the joining socket.
    pub member: RemoteUser,
    /// Full roster after the join, joiner included.
    pub users: Vec<RemoteUser>,
}

impl Admission {
    #[must_use]
    pub fn user(&self) -> User {
        self.member.user()
    }
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Admit `socket_id` into the requested room.
///
/// # Errors
///
/// Returns [`RoomError::InvalidJoin`] for a blank username or room id and
/// [`RoomError::UsernameExists`] when the name is taken in that room. A
/// rejected join never creates the room.
pub async fn join_room(
    state: &AppState,
    request: &JoinRequest,
    socket_id: &SocketId,
    tx: mpsc::Sender<Frame>,
) -> Result<Admission, RoomError> {
    let username = request.username.trim();
    let room_id = request.room_id.trim();
    if username.is_empty() || room_id.is_empty() {
        return Err(RoomError::InvalidJoin);
    }

    let mut rooms = state.rooms.write().await;
    if rooms.get(room_id).is_some_and(|room| room.has_username(username)) {
        return Err(RoomError::UsernameExists { username: username.to_owned(), room_id: room_id.to_owned() });
    }

    let room = rooms.entry(room_id.to_owned()).or_default();
    let member = RemoteUser::online(socket_id.clone(), username, room_id);
    room.clients.insert(socket_id.clone(), tx);
    room.users.push(member.clone());

    info!(%room_id, %socket_id, %username, clients = room.clients.len(), "client joined room");
    Ok(Admission { member, users: room.users.clone() })
}

/// Leave a room. Returns the departed roster entry, or `None` when the
/// socket was not a member. Evicts the room when it becomes empty.
pub async fn part_room(state: &AppState, room_id: &str, socket_id: &SocketId) -> Option<RemoteUser> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(room_id)?;

    room.clients.remove(socket_id);
    let member = room
        .users
        .iter()
        .position(|u| &u.id == socket_id)
        .map(|idx| room.users.remove(idx));
    info!(%room_id, %socket_id, remaining = room.clients.len(), "client left room");

    if room.is_empty() {
        rooms.remove(room_id);
        info!(%room_id, "evicted room from memory");
    }
    member
}

/// Current roster of a room, in join order.
pub async fn list_users(state: &AppState, room_id: &str) -> Vec<RemoteUser> {
    let rooms = state.rooms.read().await;
    rooms.get(room_id).map(|room| room.users.clone()).unwrap_or_default()
}

/// Apply `update` to a member's roster entry and return the new entry.
pub async fn update_user(
    state: &AppState,
    room_id: &str,
    socket_id: &SocketId,
    update: impl FnOnce(&mut RemoteUser),
) -> Option<RemoteUser> {
    let mut rooms = state.rooms.write().await;
    let user = rooms
        .get_mut(room_id)?
        .users
        .iter_mut()
        .find(|u| &u.id == socket_id)?;
    update(user);
    Some(user.clone())
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast a frame to all clients in a room, optionally excluding one.
pub async fn broadcast(state: &AppState, room_id: &str, frame: &Frame, exclude: Option<&SocketId>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return;
    };

    for (socket_id, tx) in &room.clients {
        if exclude == Some(socket_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        if tx.try_send(frame.clone()).is_err() {
            debug!(%room_id, %socket_id, event = %frame.event, "dropped frame for slow client");
        }
    }
}

/// Deliver a frame to one member of a room.
///
/// # Errors
///
/// Returns [`RoomError::NotFound`] or [`RoomError::PeerNotFound`] when the
/// room or the target socket is gone.
pub async fn send_to(state: &AppState, room_id: &str, target: &SocketId, frame: &Frame) -> Result<(), RoomError> {
    let rooms = state.rooms.read().await;
    let room = rooms
        .get(room_id)
        .ok_or_else(|| RoomError::NotFound(room_id.to_owned()))?;
    let tx = room
        .clients
        .get(target)
        .ok_or_else(|| RoomError::PeerNotFound(target.clone()))?;

    if tx.try_send(frame.clone()).is_err() {
        debug!(%room_id, socket_id = %target, event = %frame.event, "dropped targeted frame for slow client");
    }
    Ok(())
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
