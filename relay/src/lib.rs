//! Websocket relay for collaborative coding rooms.
//!
//! The relay owns admission (one username per room), the live roster, and
//! fan-out of file-tree, chat, presence and drawing events between the
//! members of a room. It keeps no durable state: a room exists while at
//! least one socket is joined to it.

pub mod config;
pub mod routes;
pub mod services;
pub mod state;
