//! Event names carried in [`crate::Frame::event`].

use std::fmt;

/// Every event the relay and clients exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    JoinRequest,
    JoinAccepted,
    UsernameExists,
    UserJoined,
    UserDisconnected,
    UserOnline,
    UserOffline,
    SyncFileStructure,
    DirectoryCreated,
    DirectoryRenamed,
    DirectoryDeleted,
    FileCreated,
    FileUpdated,
    FileRenamed,
    FileDeleted,
    SendMessage,
    ReceiveMessage,
    TypingStart,
    TypingPause,
    RequestDrawing,
    SyncDrawing,
    DrawingUpdate,
    /// Relay-side failure report; payload carries `code`, `message`, `retryable`.
    Error,
}

impl EventKind {
    pub const ALL: [EventKind; 23] = [
        Self::JoinRequest,
        Self::JoinAccepted,
        Self::UsernameExists,
        Self::UserJoined,
        Self::UserDisconnected,
        Self::UserOnline,
        Self::UserOffline,
        Self::SyncFileStructure,
        Self::DirectoryCreated,
        Self::DirectoryRenamed,
        Self::DirectoryDeleted,
        Self::FileCreated,
        Self::FileUpdated,
        Self::FileRenamed,
        Self::FileDeleted,
        Self::SendMessage,
        Self::ReceiveMessage,
        Self::TypingStart,
        Self::TypingPause,
        Self::RequestDrawing,
        Self::SyncDrawing,
        Self::DrawingUpdate,
        Self::Error,
    ];

    /// Wire name of the event.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JoinRequest => "join-request",
            Self::JoinAccepted => "join-accepted",
            Self::UsernameExists => "username-exists",
            Self::UserJoined => "user-joined",
            Self::UserDisconnected => "user-disconnected",
            Self::UserOnline => "user-online",
            Self::UserOffline => "user-offline",
            Self::SyncFileStructure => "sync-file-structure",
            Self::DirectoryCreated => "directory-created",
            Self::DirectoryRenamed => "directory-renamed",
            Self::DirectoryDeleted => "directory-deleted",
            Self::FileCreated => "file-created",
            Self::FileUpdated => "file-updated",
            Self::FileRenamed => "file-renamed",
            Self::FileDeleted => "file-deleted",
            Self::SendMessage => "send-message",
            Self::ReceiveMessage => "receive-message",
            Self::TypingStart => "typing-start",
            Self::TypingPause => "typing-pause",
            Self::RequestDrawing => "request-drawing",
            Self::SyncDrawing => "sync-drawing",
            Self::DrawingUpdate => "drawing-update",
            Self::Error => "error",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Events that mutate the shared file tree.
    #[must_use]
    pub fn is_file_tree(self) -> bool {
        matches!(
            self,
            Self::DirectoryCreated
                | Self::DirectoryRenamed
                | Self::DirectoryDeleted
                | Self::FileCreated
                | Self::FileUpdated
                | Self::FileRenamed
                | Self::FileDeleted
        )
    }

    /// Events only the relay may originate.
    #[must_use]
    pub fn is_relay_only(self) -> bool {
        matches!(
            self,
            Self::JoinAccepted
                | Self::UsernameExists
                | Self::UserJoined
                | Self::UserDisconnected
                | Self::ReceiveMessage
                | Self::Error
        )
    }

    /// High-frequency presence chatter, kept out of info-level logs.
    #[must_use]
    pub fn is_chatty(self) -> bool {
        matches!(self, Self::TypingStart | Self::TypingPause | Self::FileUpdated)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
