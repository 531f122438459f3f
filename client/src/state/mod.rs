//! Local replicas of shared session state.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each module owns one slice of state and knows nothing about transport.
//! Local mutations return the payload to broadcast; remote payloads are
//! applied idempotently. [`crate::store::SessionStore`] wires them to frames.

pub mod chat;
pub mod drawing;
pub mod editor;
pub mod files;
pub mod presence;
pub mod session;
