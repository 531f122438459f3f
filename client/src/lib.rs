//! Client side of a collaborative coding session.
//!
//! SYSTEM CONTEXT
//! ==============
//! A [`store::SessionStore`] owns every local replica (session, roster, file
//! tree, drawing, chat, editor timers) and is driven by one task: inbound
//! frames and transport lifecycle events go in, outbound frames and UI
//! notices come out. [`net::transport::Transport`] moves frames between the
//! store and the relay; [`net::run`] and [`net::ai`] talk to the external
//! execution and suggestion services.

pub mod config;
pub mod net;
pub mod state;
pub mod store;
pub mod util;
