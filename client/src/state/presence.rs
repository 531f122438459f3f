//! Room roster as seen by this client.

#[cfg(test)]
#[path = "presence_test.rs"]
mod presence_test;

use frames::model::{RemoteUser, SocketId, UserStatus};

/// Roster entries, unique by username, in arrival order.
#[derive(Clone, Debug, Default)]
pub struct Presence {
    users: Vec<RemoteUser>,
}

impl Presence {
    /// Replace the roster with an admission snapshot. A username listed twice
    /// keeps its last entry.
    pub fn init(&mut self, users: Vec<RemoteUser>) {
        self.users.clear();
        for user in users {
            self.upsert(user);
        }
    }

    /// Insert or replace the entry with the same username.
    pub fn upsert(&mut self, user: RemoteUser) {
        match self.users.iter_mut().find(|u| u.username == user.username) {
            Some(existing) => *existing = user,
            None => self.users.push(user),
        }
    }

    pub fn remove_by_username(&mut self, username: &str) -> Option<RemoteUser> {
        let index = self.users.iter().position(|u| u.username == username)?;
        Some(self.users.remove(index))
    }

    /// Flip a peer's status. Returns false when the socket is unknown.
    pub fn set_status(&mut self, socket_id: &SocketId, status: UserStatus) -> bool {
        match self.users.iter_mut().find(|u| &u.id == socket_id) {
            Some(user) => {
                user.status = status;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn users(&self) -> &[RemoteUser] {
        &self.users
    }

    #[must_use]
    pub fn get(&self, username: &str) -> Option<&RemoteUser> {
        self.users.iter().find(|u| u.username == username)
    }

    /// Usernames of peers currently typing, excluding `me`.
    pub fn typing<'a>(&'a self, me: &'a str) -> impl Iterator<Item = &'a str> {
        self.users
            .iter()
            .filter(move |u| u.typing && u.username != me)
            .map(|u| u.username.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}
