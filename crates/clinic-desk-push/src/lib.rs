//! Push channel for the clinic desk console.
//!
//! The clinic server announces state changes over Socket.IO. This crate parses the
//! Engine.IO/Socket.IO text frames, fans events out to in-process subscribers through
//! [`PushHub`], and (with the `socket` feature) runs the websocket transport that feeds it.
//! Events carry no data the console relies on: receiving one is purely a refresh trigger.

pub mod event;
pub mod hub;
#[cfg(feature = "socket")]
pub mod socket;

pub use event::*;
pub use hub::*;
