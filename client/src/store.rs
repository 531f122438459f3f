//! Session store: every local replica behind one owned struct.
//!
//! SYSTEM CONTEXT
//! ==============
//! The store is driven by a single task. Inbound frames and transport
//! lifecycle events go in through [`SessionStore::handle_transport_event`];
//! local user actions go in through the operation methods. Outbound frames
//! collect in an outbox drained by [`SessionStore::take_outbox`] or
//! [`SessionStore::flush_to`], and user-facing notices collect alongside.
//!
//! Local mutations are applied before their frame is queued. Inbound frames
//! are dispatched through an [`EventRouter`], one handler per event.
//!
//! RECONNECT
//! =========
//! After a drop the transport holds everything but the rejoin request until
//! the relay admits this socket again; [`SessionStore::flush_to`] tells it
//! when to release or discard that backlog. Tree edits made while the link
//! was down are replayed over any tree snapshot that arrives with the rejoin,
//! since peers snapshot before the held edits reach them.
//!
//! ERROR HANDLING
//! ==============
//! Malformed inbound payloads surface as [`StoreError::Payload`] and leave
//! state untouched. Only admission and transport failures move the session
//! status.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use frames::model::{
    ChatMessage, ChatPayload, DirectoryCreated, DirectoryDeleted, DirectoryRenamed, DrawingData, DrawingRequest,
    DrawingSync, DrawingUpdate, ErrorPayload, FileCreated, FileDeleted, FileId, FileRenamed, FileStructureSync,
    FileUpdated, JoinAccepted, PresenceUpdate, SocketId, StatusChange, TypingStart, UserDisconnected, UserJoined,
    UserStatus,
};
use frames::{CodecError, EventKind, Frame};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::net::ai::AiError;
use crate::net::router::{EventRouter, Handler};
use crate::net::run::{self, Language, RunError, RunJob};
use crate::net::transport::{Transport, TransportError, TransportEvent};
use crate::state::chat::ChatReplica;
use crate::state::drawing::DrawingReplica;
use crate::state::editor::{EditorState, SuggestionRequest};
use crate::state::files::{FileTree, FileTreeError};
use crate::state::presence::Presence;
use crate::state::session::{JoinForm, Session, SessionError, SessionStatus};

/// Relay error code for a blank or malformed join request.
const E_INVALID_JOIN: &str = "E_INVALID_JOIN";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Files(#[from] FileTreeError),

    #[error(transparent)]
    Payload(#[from] CodecError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("not joined to a room")]
    NotJoined,

    #[error("no file is open")]
    NoActiveFile,

    #[error("message is empty")]
    EmptyMessage,
}

/// What the transport should do with frames it held across a drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Backlog {
    Release,
    Discard,
}

/// Something the UI should tell the user about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Joined { users: usize },
    Rejoined,
    UsernameTaken,
    ConnectionLost { attempt: u32 },
    ConnectionFailed { reason: String },
    PeerJoined { username: String },
    PeerLeft { username: String },
    TreeSynced,
    DrawingSynced,
    Message(ChatMessage),
    SuggestionReady { file_id: FileId },
    SuggestionFailed { message: String },
    RelayError { code: String, message: String },
}

pub struct SessionStore {
    session: Session,
    presence: Presence,
    files: FileTree,
    drawing: DrawingReplica,
    chat: ChatReplica,
    editor: EditorState,
    /// Hand-picked runtime for runs; auto-selected when unset.
    language: Option<Language>,
    router: EventRouter<SessionStore, StoreError>,
    outbox: Vec<Frame>,
    notices: Vec<Notice>,
    /// Transport dropped since the last successful connect.
    link_lost: bool,
    /// A join request re-registering the current identity is in flight.
    rejoining: bool,
    /// Pending instruction for the transport's held frames.
    backlog: Option<Backlog>,
    /// Local tree edits made since the last drop.
    replay: Vec<Frame>,
    /// The tree matches the room: synced from a peer, or first in the room.
    tree_synced: bool,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(false)
    }
}

impl SessionStore {
    #[must_use]
    pub fn new(ai_enabled: bool) -> Self {
        let mut router: EventRouter<SessionStore, StoreError> = EventRouter::new();
        router.on(EventKind::JoinAccepted, on_join_accepted);
        router.on(EventKind::UsernameExists, on_username_exists);
        router.on(EventKind::UserJoined, on_user_joined);
        router.on(EventKind::UserDisconnected, on_user_disconnected);
        router.on(EventKind::TypingStart, on_presence_update);
        router.on(EventKind::TypingPause, on_presence_update);
        router.on(EventKind::UserOnline, on_user_online);
        router.on(EventKind::UserOffline, on_user_offline);
        router.on(EventKind::SyncFileStructure, on_sync_file_structure);
        router.on(EventKind::FileCreated, on_file_created);
        router.on(EventKind::DirectoryCreated, on_directory_created);
        router.on(EventKind::FileRenamed, on_file_renamed);
        router.on(EventKind::DirectoryRenamed, on_directory_renamed);
        router.on(EventKind::FileDeleted, on_file_deleted);
        router.on(EventKind::DirectoryDeleted, on_directory_deleted);
        router.on(EventKind::FileUpdated, on_file_updated);
        router.on(EventKind::ReceiveMessage, on_receive_message);
        router.on(EventKind::RequestDrawing, on_request_drawing);
        router.on(EventKind::SyncDrawing, on_sync_drawing);
        router.on(EventKind::DrawingUpdate, on_drawing_update);
        router.on(EventKind::Error, on_error);

        Self {
            session: Session::default(),
            presence: Presence::default(),
            files: FileTree::default(),
            drawing: DrawingReplica::default(),
            chat: ChatReplica::default(),
            editor: EditorState::new(ai_enabled),
            language: None,
            router,
            outbox: Vec::new(),
            notices: Vec::new(),
            link_lost: false,
            rejoining: false,
            backlog: None,
            replay: Vec::new(),
            tree_synced: false,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    #[must_use]
    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    #[must_use]
    pub fn files(&self) -> &FileTree {
        &self.files
    }

    #[must_use]
    pub fn drawing(&self) -> &DrawingReplica {
        &self.drawing
    }

    #[must_use]
    pub fn chat(&self) -> &ChatReplica {
        &self.chat
    }

    #[must_use]
    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    /// Handler table for inbound events. Registering replaces the default.
    pub fn router_mut(&mut self) -> &mut EventRouter<SessionStore, StoreError> {
        &mut self.router
    }

    /// Drain frames waiting to be sent.
    pub fn take_outbox(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.outbox)
    }

    /// Drain notices waiting to be shown.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Hand every queued frame to the transport, in order. Join requests
    /// jump any backlog the transport is holding.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Stopped`] if the transport task has exited;
    /// frames not yet handed over are dropped.
    pub fn flush_to(&mut self, transport: &Transport) -> Result<usize, TransportError> {
        let frames = self.take_outbox();
        let count = frames.len();
        for frame in frames {
            if frame.kind() == Some(EventKind::JoinRequest) {
                transport.emit_first(frame)?;
            } else {
                transport.emit(frame)?;
            }
        }
        match self.backlog.take() {
            Some(Backlog::Release) => transport.release()?,
            Some(Backlog::Discard) => transport.discard()?,
            None => {}
        }
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Inbound
    // -------------------------------------------------------------------------

    /// Apply one transport event.
    ///
    /// # Errors
    ///
    /// Returns the handler error for a rejected inbound frame.
    pub fn handle_transport_event(&mut self, event: TransportEvent) -> Result<(), StoreError> {
        match event {
            TransportEvent::Connected => {
                if std::mem::take(&mut self.link_lost) {
                    self.resume_after_drop();
                }
                Ok(())
            }
            TransportEvent::Frame(frame) => self.handle_frame(&frame),
            TransportEvent::Reconnecting { attempt } => {
                if !self.link_lost && !self.rejoining {
                    self.replay.clear();
                }
                self.link_lost = true;
                self.notices.push(Notice::ConnectionLost { attempt });
                Ok(())
            }
            TransportEvent::Failed { reason } => {
                self.link_lost = false;
                self.rejoining = false;
                self.backlog = None;
                self.replay.clear();
                self.session.fail_connection();
                self.notices.push(Notice::ConnectionFailed { reason });
                Ok(())
            }
            TransportEvent::Closed => Ok(()),
        }
    }

    /// Dispatch one inbound frame to its registered handler. Unknown or
    /// unhandled events are ignored.
    ///
    /// # Errors
    ///
    /// Returns the handler's error, e.g. [`StoreError::Payload`].
    pub fn handle_frame(&mut self, frame: &Frame) -> Result<(), StoreError> {
        let Some(kind) = frame.kind() else {
            debug!(event = %frame.event, "ignoring unknown event");
            return Ok(());
        };
        let Some(handler) = self.router.handler(kind) else {
            debug!(event = %kind, "no handler registered");
            return Ok(());
        };
        if kind.is_chatty() {
            debug!(event = %kind, from = ?frame.from, "inbound frame");
        } else {
            info!(event = %kind, from = ?frame.from, "inbound frame");
        }
        handler(self, frame).inspect_err(|e| warn!(event = %kind, error = %e, "inbound frame rejected"))
    }

    fn resume_after_drop(&mut self) {
        if let Some(request) = self.session.pending().cloned() {
            debug!(room_id = %request.room_id, "re-sending pending join");
            let frame = Frame::with_payload(EventKind::JoinRequest, &request).with_room(request.room_id.clone());
            self.outbox.push(frame);
        } else if let Some(request) = self.session.rejoin_request() {
            info!(room_id = %request.room_id, username = %request.username, "rejoining after reconnect");
            self.rejoining = true;
            let frame = Frame::with_payload(EventKind::JoinRequest, &request).with_room(request.room_id.clone());
            self.outbox.push(frame);
        }
    }

    // -------------------------------------------------------------------------
    // Session
    // -------------------------------------------------------------------------

    /// Submit the join form. Returns false when a join is already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Session`] for form or state errors.
    pub fn submit_join(&mut self, form: &JoinForm) -> Result<bool, StoreError> {
        let Some(request) = self.session.submit(form)? else {
            return Ok(false);
        };
        info!(room_id = %request.room_id, username = %request.username, "joining room");
        let frame = Frame::with_payload(EventKind::JoinRequest, &request).with_room(request.room_id.clone());
        self.outbox.push(frame);
        Ok(true)
    }

    /// Leave the room and reset every replica. The caller closes the
    /// transport.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Session`] unless joined.
    pub fn leave(&mut self) -> Result<(), StoreError> {
        self.session.leave()?;
        self.reset_replicas();
        Ok(())
    }

    /// Back to the join form after a leave or a connection failure.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Session`] from any other state.
    pub fn reconnect(&mut self) -> Result<(), StoreError> {
        self.session.reconnect()?;
        self.reset_replicas();
        self.link_lost = false;
        self.rejoining = false;
        Ok(())
    }

    fn reset_replicas(&mut self) {
        self.presence.clear();
        self.files = FileTree::default();
        self.tree_synced = false;
        self.replay.clear();
        self.backlog = None;
        self.drawing.clear();
        self.chat.clear();
        self.editor.reset();
        self.outbox.clear();
    }

    // -------------------------------------------------------------------------
    // File tree
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`StoreError::NotJoined`] or the tree's rejection.
    pub fn create_file(&mut self, parent: &FileId, name: &str) -> Result<FileId, StoreError> {
        self.require_joined()?;
        let created = self.files.create_file(parent, name)?;
        let id = created.new_file.id.clone();
        self.emit(EventKind::FileCreated, &created);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotJoined`] or the tree's rejection.
    pub fn create_directory(&mut self, parent: &FileId, name: &str) -> Result<FileId, StoreError> {
        self.require_joined()?;
        let created = self.files.create_directory(parent, name)?;
        let id = created.new_directory.id.clone();
        self.emit(EventKind::DirectoryCreated, &created);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotJoined`] or the tree's rejection.
    pub fn rename_file(&mut self, id: &FileId, name: &str) -> Result<(), StoreError> {
        self.require_joined()?;
        let renamed = self.files.rename_file(id, name)?;
        self.emit(EventKind::FileRenamed, &renamed);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotJoined`] or the tree's rejection.
    pub fn rename_directory(&mut self, id: &FileId, name: &str) -> Result<(), StoreError> {
        self.require_joined()?;
        let renamed = self.files.rename_directory(id, name)?;
        self.emit(EventKind::DirectoryRenamed, &renamed);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotJoined`] or the tree's rejection.
    pub fn delete_file(&mut self, id: &FileId) -> Result<(), StoreError> {
        self.require_joined()?;
        let deleted = self.files.delete_file(id)?;
        self.emit(EventKind::FileDeleted, &deleted);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotJoined`] or the tree's rejection.
    pub fn delete_directory(&mut self, id: &FileId) -> Result<(), StoreError> {
        self.require_joined()?;
        let deleted = self.files.delete_directory(id)?;
        self.emit(EventKind::DirectoryDeleted, &deleted);
        Ok(())
    }

    pub fn open_file(&mut self, id: &FileId) -> bool {
        self.files.open_file(id)
    }

    pub fn close_file(&mut self, id: &FileId) -> bool {
        self.files.close_file(id)
    }

    pub fn toggle_directory(&mut self, id: &FileId) -> bool {
        self.files.toggle_directory(id)
    }

    pub fn collapse_directories(&mut self) {
        self.files.collapse_directories();
    }

    // -------------------------------------------------------------------------
    // Editor
    // -------------------------------------------------------------------------

    /// A keystroke in the active file: replace its content, tell peers, and
    /// re-arm the typing-pause timer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotJoined`] or [`StoreError::NoActiveFile`].
    pub fn type_into_active(&mut self, content: &str, cursor_position: usize, now: Instant) -> Result<(), StoreError> {
        self.require_joined()?;
        let active = self.files.active_file().cloned().ok_or(StoreError::NoActiveFile)?;
        let updated = self.files.update_content(&active, content)?;
        self.emit(EventKind::TypingStart, &TypingStart { cursor_position });
        self.emit(EventKind::FileUpdated, &updated);
        self.editor.keystroke(now);
        Ok(())
    }

    /// When the typing-pause timer should next be polled.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.editor.deadline()
    }

    /// Fire the typing-pause timer if it is due. Returns a suggestion request
    /// for the caller to run when one should start.
    pub fn poll_timers(&mut self, now: Instant) -> Option<SuggestionRequest> {
        if !self.editor.pause_elapsed(now) {
            return None;
        }
        self.emit_empty(EventKind::TypingPause);
        let node = self.files.active_node()?;
        let code = node.content().unwrap_or_default();
        self.editor.begin_suggestion(&node.id, &node.name, code)
    }

    /// Record a finished suggestion request.
    pub fn finish_suggestion(&mut self, file_id: &FileId, result: Result<String, AiError>) {
        match result {
            Ok(text) => {
                if self.editor.finish_suggestion(file_id, Some(text)) {
                    self.notices.push(Notice::SuggestionReady { file_id: file_id.clone() });
                }
            }
            Err(e) => {
                warn!(%file_id, error = %e, "suggestion failed");
                self.editor.finish_suggestion(file_id, None);
                self.notices.push(Notice::SuggestionFailed { message: e.to_string() });
            }
        }
    }

    /// Replace the active file with the ready suggestion. Returns false when
    /// there is none for the active file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoActiveFile`] or a tree error.
    pub fn accept_suggestion(&mut self) -> Result<bool, StoreError> {
        let active = self.files.active_file().cloned().ok_or(StoreError::NoActiveFile)?;
        let Some(text) = self.editor.take_ready(&active) else {
            return Ok(false);
        };
        let updated = self.files.update_content(&active, &text)?;
        self.emit(EventKind::FileUpdated, &updated);
        Ok(true)
    }

    pub fn dismiss_suggestion(&mut self) {
        self.editor.dismiss();
    }

    pub fn set_ai_enabled(&mut self, enabled: bool) {
        self.editor.set_ai_enabled(enabled);
    }

    // -------------------------------------------------------------------------
    // Run
    // -------------------------------------------------------------------------

    /// Snapshot of the active file for an execution, with the hand-picked
    /// language if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoActiveFile`].
    pub fn run_job(&self, stdin: &str) -> Result<RunJob, StoreError> {
        let node = self.files.active_node().ok_or(StoreError::NoActiveFile)?;
        Ok(RunJob {
            file_name: node.name.clone(),
            code: node.content().unwrap_or_default().to_owned(),
            stdin: stdin.to_owned(),
            language: self.language.clone(),
        })
    }

    /// Take a language from the picker's encoded value. `None` goes back to
    /// choosing by file extension.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Selection`] and keeps the previous choice when the
    /// value does not decode.
    pub fn choose_language(&mut self, selection: Option<&str>) -> Result<Option<&Language>, StoreError> {
        self.language = selection.map(run::decode_selection).transpose()?;
        Ok(self.language.as_ref())
    }

    #[must_use]
    pub fn language(&self) -> Option<&Language> {
        self.language.as_ref()
    }

    // -------------------------------------------------------------------------
    // Chat, drawing, status
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns [`StoreError::NotJoined`] or [`StoreError::EmptyMessage`].
    pub fn send_chat(&mut self, text: &str) -> Result<ChatMessage, StoreError> {
        let username = self
            .session
            .current_user()
            .filter(|_| self.session.is_joined())
            .map(|u| u.username.clone())
            .ok_or(StoreError::NotJoined)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::EmptyMessage);
        }
        let message = ChatReplica::compose(&username, text);
        self.chat.send(message.clone());
        self.emit(EventKind::SendMessage, &ChatPayload { message: message.clone() });
        Ok(message)
    }

    pub fn mark_chat_read(&mut self) {
        self.chat.mark_read();
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotJoined`].
    pub fn update_drawing(&mut self, data: DrawingData) -> Result<(), StoreError> {
        self.require_joined()?;
        let update = self.drawing.set_local(data);
        self.emit(EventKind::DrawingUpdate, &update);
        Ok(())
    }

    /// Tell peers this client went idle or came back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotJoined`].
    pub fn set_online(&mut self, online: bool) -> Result<(), StoreError> {
        self.require_joined()?;
        self.emit_empty(if online { EventKind::UserOnline } else { EventKind::UserOffline });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn require_joined(&self) -> Result<(), StoreError> {
        if self.session.is_joined() { Ok(()) } else { Err(StoreError::NotJoined) }
    }

    fn my_socket(&self) -> Option<&SocketId> {
        self.session.current_user().map(|u| &u.id)
    }

    fn emit<T: serde::Serialize>(&mut self, kind: EventKind, payload: &T) {
        self.push(Frame::with_payload(kind, payload));
    }

    fn emit_empty(&mut self, kind: EventKind) {
        self.push(Frame::empty(kind));
    }

    fn push(&mut self, frame: Frame) {
        let frame = match self.session.current_user() {
            Some(user) => frame.with_room(user.room_id.clone()),
            None => frame,
        };
        if (self.link_lost || self.rejoining) && frame.kind().and_then(tree_handler).is_some() {
            self.replay.push(frame.clone());
        }
        self.outbox.push(frame);
    }

    /// Re-apply edits made while the link was down on top of a snapshot
    /// that predates them.
    fn replay_local_edits(&mut self) {
        for frame in self.replay.clone() {
            let Some(apply) = frame.kind().and_then(tree_handler) else {
                continue;
            };
            if let Err(e) = apply(self, &frame) {
                debug!(event = %frame.event, error = %e, "local edit superseded by snapshot");
            }
        }
    }
}

fn tree_handler(kind: EventKind) -> Option<Handler<SessionStore, StoreError>> {
    let handler: Handler<SessionStore, StoreError> = match kind {
        EventKind::FileCreated => on_file_created,
        EventKind::DirectoryCreated => on_directory_created,
        EventKind::FileRenamed => on_file_renamed,
        EventKind::DirectoryRenamed => on_directory_renamed,
        EventKind::FileDeleted => on_file_deleted,
        EventKind::DirectoryDeleted => on_directory_deleted,
        EventKind::FileUpdated => on_file_updated,
        _ => return None,
    };
    Some(handler)
}

// =============================================================================
// INBOUND HANDLERS
// =============================================================================

fn on_join_accepted(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let accepted: JoinAccepted = frame.payload()?;
    store.backlog = Some(Backlog::Release);
    if store.session.is_joined() {
        store.rejoining = false;
        store.session.rejoined(accepted.user);
        store.presence.init(accepted.users);
        store.notices.push(Notice::Rejoined);
        return Ok(());
    }

    store.session.admit(accepted.user)?;
    let users = accepted.users.len();
    store.presence.init(accepted.users);
    if users > 1 {
        store.emit_empty(EventKind::RequestDrawing);
    } else {
        store.tree_synced = true;
    }
    store.notices.push(Notice::Joined { users });
    Ok(())
}

fn on_username_exists(store: &mut SessionStore, _frame: &Frame) -> Result<(), StoreError> {
    if std::mem::take(&mut store.rejoining) {
        store.backlog = Some(Backlog::Discard);
        store.replay.clear();
        store.session.fail_connection();
        store.notices.push(Notice::ConnectionFailed { reason: "username was taken while reconnecting".into() });
        return Ok(());
    }
    store.session.reject()?;
    store.notices.push(Notice::UsernameTaken);
    Ok(())
}

fn on_user_joined(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let UserJoined { user } = frame.payload()?;
    if store.my_socket() == Some(&user.id) {
        return Ok(());
    }
    let username = user.username.clone();
    let socket_id = user.id.clone();
    store.presence.upsert(user);
    if store.session.is_joined() && store.tree_synced {
        let sync = store.files.export(socket_id);
        store.emit(EventKind::SyncFileStructure, &sync);
    }
    store.notices.push(Notice::PeerJoined { username });
    Ok(())
}

fn on_user_disconnected(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let UserDisconnected { user } = frame.payload()?;
    store.presence.remove_by_username(&user.username);
    store.drawing.forget(&user.id);
    if store.session.is_joined() && store.presence.len() == 1 {
        // Alone in the room: nobody is left to sync from.
        store.tree_synced = true;
    }
    store.notices.push(Notice::PeerLeft { username: user.username });
    Ok(())
}

fn on_presence_update(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let PresenceUpdate { user } = frame.payload()?;
    store.presence.upsert(user);
    Ok(())
}

fn on_user_online(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let StatusChange { socket_id } = frame.payload()?;
    store.presence.set_status(&socket_id, UserStatus::Online);
    Ok(())
}

fn on_user_offline(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let StatusChange { socket_id } = frame.payload()?;
    store.presence.set_status(&socket_id, UserStatus::Offline);
    Ok(())
}

fn on_sync_file_structure(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let sync: FileStructureSync = frame.payload()?;
    store.files.replace_from_sync(&sync)?;
    store.tree_synced = true;
    store.replay_local_edits();
    store.notices.push(Notice::TreeSynced);
    Ok(())
}

fn on_file_created(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    store.files.apply_file_created(&frame.payload::<FileCreated>()?)?;
    Ok(())
}

fn on_directory_created(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    store.files.apply_directory_created(&frame.payload::<DirectoryCreated>()?)?;
    Ok(())
}

fn on_file_renamed(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    store.files.apply_file_renamed(&frame.payload::<FileRenamed>()?)?;
    Ok(())
}

fn on_directory_renamed(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    store.files.apply_directory_renamed(&frame.payload::<DirectoryRenamed>()?)?;
    Ok(())
}

fn on_file_deleted(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    store.files.apply_file_deleted(&frame.payload::<FileDeleted>()?)?;
    Ok(())
}

fn on_directory_deleted(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    store.files.apply_directory_deleted(&frame.payload::<DirectoryDeleted>()?)?;
    Ok(())
}

fn on_file_updated(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    store.files.apply_file_updated(&frame.payload::<FileUpdated>()?)?;
    Ok(())
}

fn on_receive_message(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let ChatPayload { message } = frame.payload()?;
    if store.chat.receive(message) {
        if let Some(latest) = store.chat.messages().last() {
            store.notices.push(Notice::Message(latest.clone()));
        }
    }
    Ok(())
}

fn on_request_drawing(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let DrawingRequest { socket_id } = frame.payload()?;
    if store.my_socket() == Some(&socket_id) {
        return Ok(());
    }
    if let Some(sync) = store.drawing.respond_to(&socket_id) {
        debug!(%socket_id, "answering drawing request");
        store.emit(EventKind::SyncDrawing, &sync);
    }
    Ok(())
}

fn on_sync_drawing(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let sync: DrawingSync = frame.payload()?;
    store.drawing.apply_sync(sync);
    store.notices.push(Notice::DrawingSynced);
    Ok(())
}

fn on_drawing_update(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let update: DrawingUpdate = frame.payload()?;
    store.drawing.apply_update(update);
    Ok(())
}

fn on_error(store: &mut SessionStore, frame: &Frame) -> Result<(), StoreError> {
    let ErrorPayload { code, message, .. } = frame.payload()?;
    warn!(%code, %message, "relay reported an error");
    if code == E_INVALID_JOIN && store.session.status() == SessionStatus::AttemptingJoin {
        store.session.reject()?;
    }
    store.notices.push(Notice::RelayError { code, message });
    Ok(())
}
