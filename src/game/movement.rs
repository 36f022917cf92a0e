//! Turn resolution for a single player.
//!
//! Rolls the die, resolves snakes and ladders, checks bounds and occupancy, and
//! commits the move on the token.

use crate::config::game::{BOARD_CELLS, DIE_FACES, MAX_ROLLS_PER_TURN};
use crate::error::GameError;
use crate::game::board::BoardModifierTable;
use crate::game::dice::DiceSource;
use crate::game::token::TurnToken;
use crate::game::types::{Cell, MoveOutcome, PlayerId, TurnRecord};

/// Roll once, and again on every top face, up to `MAX_ROLLS_PER_TURN` rolls.
pub fn roll_sequence(dice: &mut dyn DiceSource) -> Result<Vec<u8>, GameError> {
    let mut rolls = Vec::with_capacity(MAX_ROLLS_PER_TURN);
    loop {
        let roll = dice.roll()?;
        if !(1..=DIE_FACES).contains(&roll) {
            return Err(GameError::InvalidRoll(roll));
        }
        rolls.push(roll);
        if roll != DIE_FACES || rolls.len() >= MAX_ROLLS_PER_TURN {
            return Ok(rolls);
        }
    }
}

/// Only the literal run of top faces cancels a turn.
pub fn is_cancelled(rolls: &[u8]) -> bool {
    rolls.len() == MAX_ROLLS_PER_TURN && rolls.iter().all(|r| *r == DIE_FACES)
}

/// Play `player`'s turn against the state held by `token`.
///
/// Errors only when the dice source fails; every rejection is a `MoveOutcome`.
pub fn play_turn(
    player: PlayerId,
    token: &mut TurnToken,
    board: &BoardModifierTable,
    dice: &mut dyn DiceSource,
) -> Result<TurnRecord, GameError> {
    let from = token.positions().position(player);
    let mut record = TurnRecord {
        player,
        from,
        rolls: Vec::new(),
        hops: Vec::new(),
        outcome: MoveOutcome::AlreadyFinished,
    };
    if from == BOARD_CELLS {
        return Ok(record);
    }

    record.rolls = roll_sequence(dice)?;
    if is_cancelled(&record.rolls) {
        record.outcome = MoveOutcome::Cancelled;
        return Ok(record);
    }

    let candidate = i64::from(from) + i64::from(record.total_rolled());
    if candidate > i64::from(BOARD_CELLS) {
        record.outcome = MoveOutcome::Overshoot { target: candidate };
        return Ok(record);
    }

    let (target, hops) = board.resolve_chain(candidate);
    record.hops = hops;
    if target > i64::from(BOARD_CELLS) {
        record.outcome = MoveOutcome::Overshoot { target };
        return Ok(record);
    }
    if target < 1 {
        record.outcome = MoveOutcome::OffBoard { target };
        return Ok(record);
    }

    let target = target as Cell;
    if let Some(by) = token.positions().occupant(target, player) {
        record.outcome = MoveOutcome::Occupied { cell: target, by };
        return Ok(record);
    }

    let positions = token.positions_mut();
    record.outcome = if target == BOARD_CELLS {
        MoveOutcome::Finished {
            rank: positions.finish(player),
        }
    } else {
        positions.set_position(player, target);
        MoveOutcome::Moved { to: target }
    };
    Ok(record)
}
