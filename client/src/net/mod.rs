//! Networking modules for the relay websocket and external HTTP services.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` manages the websocket lifecycle, `router` maps inbound event
//! names to handlers, `run` talks to the code execution service and `ai`
//! to the suggestion model.

pub mod ai;
pub mod router;
pub mod run;
pub mod transport;
