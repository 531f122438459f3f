//! Domain services used by the websocket dispatch layer.

pub mod room;
