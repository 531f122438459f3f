//! Typed payloads and shared records carried inside frames.
//!
//! Field names follow the camelCase wire format browsers already speak, so a
//! JSON text frame and a protobuf frame decode into the same structs.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Id of the root directory every file tree starts from.
pub const ROOT_DIR_ID: &str = "root";

/// Name of the root directory.
pub const ROOT_DIR_NAME: &str = "root";

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Connection identifier assigned by the relay on upgrade.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SocketId(String);

impl SocketId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SocketId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SocketId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Opaque file-tree node id, unique within a room.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn root() -> Self {
        Self(ROOT_DIR_ID.to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for FileId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

// =============================================================================
// USERS
// =============================================================================

/// Identity granted on admission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: SocketId,
    pub username: String,
    pub room_id: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Online,
    Offline,
}

/// Roster entry: a [`User`] plus presence fields maintained by the relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub id: SocketId,
    pub username: String,
    pub room_id: String,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub typing: bool,
    #[serde(default)]
    pub cursor_position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<FileId>,
}

impl RemoteUser {
    /// Fresh roster entry for a just-admitted connection.
    #[must_use]
    pub fn online(id: SocketId, username: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            room_id: room_id.into(),
            status: UserStatus::Online,
            typing: false,
            cursor_position: 0,
            current_file: None,
        }
    }

    #[must_use]
    pub fn user(&self) -> User {
        User { id: self.id.clone(), username: self.username.clone(), room_id: self.room_id.clone() }
    }
}

// =============================================================================
// SESSION PAYLOADS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub username: String,
    pub room_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinAccepted {
    pub user: User,
    pub users: Vec<RemoteUser>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserJoined {
    pub user: RemoteUser,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDisconnected {
    pub user: User,
}

/// Relay → client typing notice; carries the updated roster entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    pub user: RemoteUser,
}

/// Client → relay typing notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingStart {
    pub cursor_position: usize,
}

/// Relay → client online/offline notice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub socket_id: SocketId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub retryable: bool,
}

// =============================================================================
// CHAT
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Empty when a relay stripped it; receivers fill it in.
    #[serde(default)]
    pub id: String,
    pub username: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub message: ChatMessage,
}

// =============================================================================
// FILE TREE
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Directory,
}

/// Recursive wire form of a file-tree node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemItem {
    pub id: FileId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileSystemItem>>,
}

impl FileSystemItem {
    #[must_use]
    pub fn file(id: FileId, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ItemKind::File,
            content: Some(content.into()),
            is_open: None,
            children: None,
        }
    }

    #[must_use]
    pub fn directory(id: FileId, name: impl Into<String>, children: Vec<FileSystemItem>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ItemKind::Directory,
            content: None,
            is_open: Some(false),
            children: Some(children),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreated {
    pub parent_dir_id: FileId,
    pub new_file: FileSystemItem,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryCreated {
    pub parent_dir_id: FileId,
    pub new_directory: FileSystemItem,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRenamed {
    pub file_id: FileId,
    pub new_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRenamed {
    pub dir_id: FileId,
    pub new_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDeleted {
    pub file_id: FileId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryDeleted {
    pub dir_id: FileId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdated {
    pub file_id: FileId,
    pub new_content: String,
}

/// Whole-tree snapshot pushed by an existing peer to a newly joined user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStructureSync {
    pub file_structure: FileSystemItem,
    #[serde(default)]
    pub open_files: Vec<FileId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_file: Option<FileId>,
    pub socket_id: SocketId,
}

// =============================================================================
// DRAWING
// =============================================================================

/// Opaque canvas snapshot. Only ever replaced whole.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrawingData(pub Value);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingRequest {
    pub socket_id: SocketId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingSync {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_id: Option<SocketId>,
    pub drawing_data: DrawingData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingUpdate {
    pub snapshot: DrawingData,
}

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;
