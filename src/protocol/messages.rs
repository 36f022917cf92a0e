//! Typed events exchanged by the actors.
//!
//! The turn token rides inside `GrantTurn`, `MoveCompleted`, `RenderDone` and
//! `TurnCompleted`, so the token's route is the protocol's route.

use actix::prelude::*;
use serde::{Deserialize, Serialize};

use crate::game::state::PositionVector;
use crate::game::token::TurnToken;
use crate::game::types::{PlayerId, TurnRecord};
use crate::protocol::handshake::ExitStatus;

/// Dispatcher -> player: play one turn with this token.
#[derive(Message)]
#[rtype(result = "()")]
pub struct GrantTurn {
    pub seq: u64,
    pub token: TurnToken,
}

/// Player -> display: the move has been applied (or rejected) on the token.
#[derive(Message)]
#[rtype(result = "()")]
pub struct MoveCompleted {
    pub seq: u64,
    pub record: TurnRecord,
    pub token: TurnToken,
}

/// Display -> coordinator: the snapshot has been rendered.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RenderDone {
    pub report: TurnReport,
    pub token: TurnToken,
}

/// Coordinator -> dispatcher: the turn is acknowledged; the token comes home.
///
/// The dispatcher answers whether it took the token back. Only an accepted
/// completion counts as a played turn.
#[derive(Message)]
#[rtype(result = "Completion")]
pub struct TurnCompleted {
    pub token: TurnToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    Accepted,
    /// The turn was already rolled back (or never granted); the token was dropped.
    Stale,
}

/// Dispatcher -> coordinator: a granted turn never completed and was rolled back.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct TurnAbandoned {
    pub seq: u64,
    pub player: PlayerId,
}

/// Dispatcher -> display: turn `seq` was rolled back to `positions`.
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct TurnRolledBack {
    pub seq: u64,
    pub positions: PositionVector,
}

/// Coordinator -> dispatcher: pick the next player and grant it the turn.
#[derive(Message)]
#[rtype(result = "Dispatch")]
pub struct AdvanceTurn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dispatch {
    Granted { seq: u64, player: PlayerId },
    /// Every player is finished or failed.
    NoEligible,
    /// A turn is still outstanding.
    Busy,
}

/// Ask a player or the display to stop.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Terminate;

/// Coordinator -> dispatcher: stop every player, then stop.
#[derive(Message)]
#[rtype(result = "DrainReport")]
pub struct Drain;

#[derive(Debug)]
pub struct DrainReport {
    pub token: Option<TurnToken>,
    pub exits: Vec<(PlayerId, ExitStatus)>,
}

/// What one completed turn did, as seen by the display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub seq: u64,
    pub record: TurnRecord,
    pub positions: PositionVector,
}
