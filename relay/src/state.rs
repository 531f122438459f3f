//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds a map of live rooms. Each room has its connected clients and
//! the roster of admitted users, kept in join order.

use std::collections::HashMap;
use std::sync::Arc;

use frames::Frame;
use frames::model::{RemoteUser, SocketId};
use tokio::sync::{RwLock, mpsc};

use crate::config::DEFAULT_CHANNEL_CAPACITY;

// =============================================================================
// ROOM STATE
// =============================================================================

/// Per-room live state. Dropped when the last client leaves.
#[derive(Default)]
pub struct RoomState {
    /// Connected clients: `socket_id` -> sender for outgoing frames.
    pub clients: HashMap<SocketId, mpsc::Sender<Frame>>,
    /// Admitted users in join order. Usernames are unique within the room.
    pub users: Vec<RemoteUser>,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has_username(&self, username: &str) -> bool {
        self.users.iter().any(|u| u.username == username)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
    /// Capacity of each connection's outbound channel.
    pub channel_capacity: usize,
}

impl AppState {
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        Self { rooms: Arc::new(RwLock::new(HashMap::new())), channel_capacity: channel_capacity.max(1) }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Create a test `AppState` with small channels.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(16)
    }

    /// Seed a room with one connected user per username and return each
    /// user's socket id and receiving end, in the given order.
    pub async fn seed_room(
        state: &AppState,
        room_id: &str,
        usernames: &[&str],
    ) -> Vec<(SocketId, mpsc::Receiver<Frame>)> {
        let mut rooms = state.rooms.write().await;
        let room = rooms.entry(room_id.to_owned()).or_default();
        let mut out = Vec::with_capacity(usernames.len());
        for username in usernames {
            let socket_id = SocketId::generate();
            let (tx, rx) = mpsc::channel(state.channel_capacity);
            room.clients.insert(socket_id.clone(), tx);
            room.users.push(RemoteUser::online(socket_id.clone(), *username, room_id));
            out.push((socket_id, rx));
        }
        out
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
