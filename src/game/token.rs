//! The turn token.
//!
//! Exactly one token exists per game and it owns the position vector. Whoever
//! holds it may read the positions; only `&mut TurnToken` can change them. The
//! token travels by value: dispatcher, player, display, coordinator, dispatcher.

use uuid::Uuid;

use crate::game::state::PositionVector;

#[derive(Debug)]
pub struct TurnToken {
    game_id: Uuid,
    seq: u64,
    positions: PositionVector,
}

impl TurnToken {
    /// Only the state owner and the dispatcher's stall recovery create tokens.
    pub(crate) fn mint(game_id: Uuid, positions: PositionVector) -> Self {
        Self {
            game_id,
            seq: 0,
            positions,
        }
    }

    /// Replace a token lost with a crashed player, rolled back to `snapshot`.
    pub(crate) fn recover(game_id: Uuid, seq: u64, snapshot: PositionVector) -> Self {
        Self {
            game_id,
            seq,
            positions: snapshot,
        }
    }

    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Sequence number of the grant this token was last issued for.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn positions(&self) -> &PositionVector {
        &self.positions
    }

    pub(crate) fn positions_mut(&mut self) -> &mut PositionVector {
        &mut self.positions
    }

    /// Stamp the token for a new grant and return the new sequence number.
    pub(crate) fn stamp(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub(crate) fn into_positions(self) -> PositionVector {
        self.positions
    }
}
