//! Editor keystroke handling: typing-pause timer and AI suggestions.
//!
//! SYSTEM CONTEXT
//! ==============
//! One [`Debounce`] per client is re-armed on every keystroke. When it fires
//! the store emits `typing-pause` and, if suggestions are enabled and none is
//! in flight, asks for one on the active file. A finished suggestion is held
//! until the user accepts or dismisses it.

#[cfg(test)]
#[path = "editor_test.rs"]
mod editor_test;

use frames::model::FileId;
use tokio::time::{Duration, Instant};

use crate::net::ai::suggestion_prompt;
use crate::util::debounce::Debounce;
use crate::util::language;

/// Quiet period after the last keystroke before `typing-pause` is sent.
pub const TYPING_PAUSE: Duration = Duration::from_millis(1000);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Suggestion {
    #[default]
    Idle,
    Processing { file_id: FileId },
    Ready { file_id: FileId, text: String },
}

/// Suggestion request for the caller to run against a text generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionRequest {
    pub file_id: FileId,
    pub language: &'static str,
    pub prompt: String,
}

#[derive(Clone, Debug)]
pub struct EditorState {
    debounce: Debounce,
    suggestion: Suggestion,
    ai_enabled: bool,
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(false)
    }
}

impl EditorState {
    #[must_use]
    pub fn new(ai_enabled: bool) -> Self {
        Self { debounce: Debounce::new(TYPING_PAUSE), suggestion: Suggestion::Idle, ai_enabled }
    }

    #[must_use]
    pub fn ai_enabled(&self) -> bool {
        self.ai_enabled
    }

    pub fn set_ai_enabled(&mut self, enabled: bool) {
        self.ai_enabled = enabled;
    }

    #[must_use]
    pub fn suggestion(&self) -> &Suggestion {
        &self.suggestion
    }

    /// Re-arm the typing-pause timer.
    pub fn keystroke(&mut self, now: Instant) {
        self.debounce.touch(now);
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// True once per quiet window.
    pub fn pause_elapsed(&mut self, now: Instant) -> bool {
        self.debounce.fire(now)
    }

    /// Start a suggestion for `file_id` unless one is already in flight, AI
    /// is off, or there is no code to look at.
    pub fn begin_suggestion(&mut self, file_id: &FileId, file_name: &str, code: &str) -> Option<SuggestionRequest> {
        if !self.ai_enabled || matches!(self.suggestion, Suggestion::Processing { .. }) || code.trim().is_empty() {
            return None;
        }
        let language = language::for_file(file_name);
        self.suggestion = Suggestion::Processing { file_id: file_id.clone() };
        Some(SuggestionRequest { file_id: file_id.clone(), language, prompt: suggestion_prompt(language, code) })
    }

    /// Record the outcome of the in-flight request. Results for a request
    /// that is no longer current are ignored. Returns true when a suggestion
    /// is now ready.
    pub fn finish_suggestion(&mut self, file_id: &FileId, text: Option<String>) -> bool {
        if !matches!(&self.suggestion, Suggestion::Processing { file_id: current } if current == file_id) {
            return false;
        }
        self.suggestion = match text.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty()) {
            Some(text) => Suggestion::Ready { file_id: file_id.clone(), text },
            None => Suggestion::Idle,
        };
        matches!(self.suggestion, Suggestion::Ready { .. })
    }

    /// Take the ready suggestion for `file_id`, leaving the editor idle.
    pub fn take_ready(&mut self, file_id: &FileId) -> Option<String> {
        match std::mem::take(&mut self.suggestion) {
            Suggestion::Ready { file_id: ready, text } if &ready == file_id => Some(text),
            other => {
                self.suggestion = other;
                None
            }
        }
    }

    pub fn dismiss(&mut self) {
        self.suggestion = Suggestion::Idle;
    }

    pub fn reset(&mut self) {
        self.debounce.cancel();
        self.suggestion = Suggestion::Idle;
    }
}
