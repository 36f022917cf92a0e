//! Game rules and state.
//!
//! Everything here is synchronous and actor-agnostic: the protocol layer moves the
//! `TurnToken` between actors and calls into these modules to play a turn.

pub mod types;
pub mod board;
pub mod layout;
pub mod state;
pub mod token;
pub mod dice;
pub mod movement;
pub mod render;
