//! Actor ensemble and the messages between them.
//!
//! The coordinator spawns the display driver and the turn dispatcher; the
//! dispatcher spawns one actor per player. A single turn token circulates
//! dispatcher -> player -> display -> coordinator -> dispatcher.

pub mod command;
pub mod coordinator;
pub mod dispatcher;
pub mod display;
pub mod handshake;
pub mod messages;
pub mod player;
