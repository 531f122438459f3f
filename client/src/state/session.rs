//! Session lifecycle: join form, admission, leave, reconnect.
//!
//! SYSTEM CONTEXT
//! ==============
//! The status only moves along the edges listed in
//! [`SessionStatus::can_transition_to`]. Admission and transport failures are
//! the only inputs that change it; everything else in the store reads it.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::fmt;

use frames::model::{JoinRequest, User};
use uuid::Uuid;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_ROOM_ID_LEN: usize = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// Form not yet submitted, or returned to after a rejection.
    #[default]
    Initial,
    /// Join request sent; waiting on the relay.
    AttemptingJoin,
    Joined,
    /// Transport gave up. Only a user-initiated reconnect leaves this state.
    ConnectionFailed,
    /// Left the room on purpose.
    Disconnected,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::AttemptingJoin => "ATTEMPTING_JOIN",
            Self::Joined => "JOINED",
            Self::ConnectionFailed => "CONNECTION_FAILED",
            Self::Disconnected => "DISCONNECTED",
        }
    }

    /// Legal edges of the session state machine.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use SessionStatus::{AttemptingJoin, ConnectionFailed, Disconnected, Initial, Joined};
        match (self, next) {
            (Initial, AttemptingJoin)
            | (AttemptingJoin, Joined | Initial)
            | (Joined, Disconnected)
            | (Disconnected | ConnectionFailed, Initial) => true,
            (from, ConnectionFailed) => from != ConnectionFailed,
            _ => false,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Enter your username")]
    UsernameRequired,
    #[error("Enter a room id")]
    RoomIdRequired,
    #[error("ROOM Id must be at least {MIN_ROOM_ID_LEN} characters long")]
    RoomIdTooShort,
    #[error("Username must be at least {MIN_USERNAME_LEN} characters long")]
    UsernameTooShort,
    #[error("cannot move session from {from} to {to}")]
    InvalidTransition { from: SessionStatus, to: SessionStatus },
}

/// Raw join form input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinForm {
    pub username: String,
    pub room_id: String,
}

impl JoinForm {
    #[must_use]
    pub fn new(username: impl Into<String>, room_id: impl Into<String>) -> Self {
        Self { username: username.into(), room_id: room_id.into() }
    }

    /// Validate the form, first failure wins, and produce the trimmed request.
    ///
    /// # Errors
    ///
    /// Returns the first [`SessionError`] form rule that fails.
    pub fn validate(&self) -> Result<JoinRequest, SessionError> {
        let username = self.username.trim();
        let room_id = self.room_id.trim();
        if username.is_empty() {
            return Err(SessionError::UsernameRequired);
        }
        if room_id.is_empty() {
            return Err(SessionError::RoomIdRequired);
        }
        if room_id.chars().count() < MIN_ROOM_ID_LEN {
            return Err(SessionError::RoomIdTooShort);
        }
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(SessionError::UsernameTooShort);
        }
        Ok(JoinRequest { username: username.to_owned(), room_id: room_id.to_owned() })
    }
}

/// Fresh room id for "create a new room".
#[must_use]
pub fn generate_room_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone, Debug, Default)]
pub struct Session {
    status: SessionStatus,
    current_user: Option<User>,
    pending: Option<JoinRequest>,
}

impl Session {
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Identity granted on the last admission.
    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    /// Join request awaiting an answer, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&JoinRequest> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.status == SessionStatus::Joined
    }

    /// Submit the join form. Returns the request to emit, or `None` when a
    /// join is already in flight.
    ///
    /// # Errors
    ///
    /// Returns a form error, or [`SessionError::InvalidTransition`] when not
    /// in [`SessionStatus::Initial`].
    pub fn submit(&mut self, form: &JoinForm) -> Result<Option<JoinRequest>, SessionError> {
        if self.status == SessionStatus::AttemptingJoin {
            return Ok(None);
        }
        let request = form.validate()?;
        self.transition(SessionStatus::AttemptingJoin)?;
        self.pending = Some(request.clone());
        Ok(Some(request))
    }

    /// Relay admitted the pending join.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless a join is pending.
    pub fn admit(&mut self, user: User) -> Result<(), SessionError> {
        self.transition(SessionStatus::Joined)?;
        self.pending = None;
        self.current_user = Some(user);
        Ok(())
    }

    /// Relay refused the pending join (taken username or bad request).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless a join is pending.
    pub fn reject(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Initial)?;
        self.pending = None;
        Ok(())
    }

    /// Transport retries exhausted. Legal from every state.
    pub fn fail_connection(&mut self) {
        if self.status != SessionStatus::ConnectionFailed {
            tracing::debug!(from = %self.status, "session connection failed");
            self.status = SessionStatus::ConnectionFailed;
        }
        self.pending = None;
    }

    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] unless joined.
    pub fn leave(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Disconnected)?;
        self.current_user = None;
        Ok(())
    }

    /// Back to the form after a leave or a failed connection.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidTransition`] from any other state.
    pub fn reconnect(&mut self) -> Result<(), SessionError> {
        self.transition(SessionStatus::Initial)?;
        self.current_user = None;
        self.pending = None;
        Ok(())
    }

    /// Join request that re-registers the current identity after the link
    /// dropped and recovered.
    #[must_use]
    pub fn rejoin_request(&self) -> Option<JoinRequest> {
        if !self.is_joined() {
            return None;
        }
        self.current_user
            .as_ref()
            .map(|user| JoinRequest { username: user.username.clone(), room_id: user.room_id.clone() })
    }

    /// Admission after a rejoin. The status stays [`SessionStatus::Joined`];
    /// only the socket id changes.
    pub fn rejoined(&mut self, user: User) {
        if self.is_joined() {
            self.current_user = Some(user);
        }
    }

    fn transition(&mut self, to: SessionStatus) -> Result<(), SessionError> {
        if !self.status.can_transition_to(to) {
            return Err(SessionError::InvalidTransition { from: self.status, to });
        }
        tracing::debug!(from = %self.status, %to, "session transition");
        self.status = to;
        Ok(())
    }
}
