//! Event-name to handler table for inbound frames.
//!
//! One handler per event. Registering again for the same event replaces the
//! previous handler, so re-initialising a session never double-dispatches.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use std::collections::HashMap;

use frames::{EventKind, Frame};

/// Inbound frame handler over some context `C`.
pub type Handler<C, E> = fn(&mut C, &Frame) -> Result<(), E>;

pub struct EventRouter<C, E> {
    handlers: HashMap<EventKind, Handler<C, E>>,
}

impl<C, E> Default for EventRouter<C, E> {
    fn default() -> Self {
        Self { handlers: HashMap::new() }
    }
}

impl<C, E> EventRouter<C, E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`, returning the handler it replaced.
    pub fn on(&mut self, event: EventKind, handler: Handler<C, E>) -> Option<Handler<C, E>> {
        self.handlers.insert(event, handler)
    }

    pub fn off(&mut self, event: EventKind) -> Option<Handler<C, E>> {
        self.handlers.remove(&event)
    }

    /// Handler for `event`, copied out so the caller can pass itself as `C`.
    #[must_use]
    pub fn handler(&self, event: EventKind) -> Option<Handler<C, E>> {
        self.handlers.get(&event).copied()
    }

    #[must_use]
    pub fn contains(&self, event: EventKind) -> bool {
        self.handlers.contains_key(&event)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
