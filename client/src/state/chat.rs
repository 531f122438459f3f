//! Room chat log with explicit de-duplication.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use std::collections::HashSet;

use frames::model::ChatMessage;
use time::OffsetDateTime;
use time::macros::format_description;
use uuid::Uuid;

/// `hh:mm AM/PM` in UTC.
#[must_use]
pub fn format_timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[hour repr:12 padding:zero]:[minute] [period case:upper]");
    at.format(format).unwrap_or_default()
}

#[derive(Clone, Debug, Default)]
pub struct ChatReplica {
    messages: Vec<ChatMessage>,
    seen: HashSet<String>,
    unread: bool,
}

impl ChatReplica {
    /// Build an outgoing message with a fresh id and the current time.
    #[must_use]
    pub fn compose(username: &str, text: &str) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4().to_string(),
            username: username.to_owned(),
            message: text.to_owned(),
            timestamp: format_timestamp(OffsetDateTime::now_utc()),
        }
    }

    /// Append our own message before it is broadcast.
    pub fn send(&mut self, message: ChatMessage) {
        self.seen.insert(message.id.clone());
        self.messages.push(message);
    }

    /// Append a peer's message unless its id was already seen. Returns false
    /// for duplicates.
    pub fn receive(&mut self, mut message: ChatMessage) -> bool {
        if message.id.is_empty() {
            message.id = Uuid::new_v4().to_string();
        }
        if !self.seen.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        self.unread = true;
        true
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn has_unread(&self) -> bool {
        self.unread
    }

    pub fn mark_read(&mut self) {
        self.unread = false;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
