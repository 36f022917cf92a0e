//! Shared game state: the board (read-only, shared) and the position vector
//! (single writer, carried by the `TurnToken`).

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::game::{BOARD_CELLS, MAX_PLAYERS, START_CELL};
use crate::error::GameError;
use crate::game::board::BoardModifierTable;
use crate::game::token::TurnToken;
use crate::game::types::{Cell, PlayerId};

/// One slot per player plus the remaining-player counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionVector {
    slots: Vec<Cell>,
    ranks: Vec<Option<u32>>,
    remaining: usize,
}

impl PositionVector {
    /// Every player at the start cell; nobody finished.
    pub fn new(players: usize) -> Self {
        Self {
            slots: vec![START_CELL; players],
            ranks: vec![None; players],
            remaining: players,
        }
    }

    /// Build a vector from explicit cells. Players on the terminal cell are
    /// ranked in slot order.
    #[cfg(test)]
    pub fn from_cells(cells: &[Cell]) -> Result<Self, GameError> {
        if let Some(bad) = cells.iter().find(|c| **c > BOARD_CELLS) {
            return Err(GameError::Setup(format!("cell {bad} is off the board")));
        }
        let mut positions = Self::new(cells.len());
        for (index, cell) in cells.iter().enumerate() {
            positions.slots[index] = *cell;
            if *cell == BOARD_CELLS {
                positions.finish(PlayerId(index));
            }
        }
        Ok(positions)
    }

    pub fn players(&self) -> usize {
        self.slots.len()
    }

    pub fn position(&self, player: PlayerId) -> Cell {
        self.slots[player.index()]
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn rank(&self, player: PlayerId) -> Option<u32> {
        self.ranks[player.index()]
    }

    pub fn is_finished(&self, player: PlayerId) -> bool {
        self.position(player) == BOARD_CELLS
    }

    /// The unfinished player standing on `cell`, other than `except`.
    pub fn occupant(&self, cell: Cell, except: PlayerId) -> Option<PlayerId> {
        if cell == BOARD_CELLS {
            return None;
        }
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (PlayerId(index), *slot))
            .find(|(id, slot)| *id != except && *slot == cell)
            .map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, Cell)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, cell)| (PlayerId(index), *cell))
    }

    /// Players in finish order.
    pub fn standings(&self) -> Vec<(PlayerId, u32)> {
        let mut ranked: Vec<(PlayerId, u32)> = self
            .ranks
            .iter()
            .enumerate()
            .filter_map(|(index, rank)| rank.map(|r| (PlayerId(index), r)))
            .collect();
        ranked.sort_by_key(|(_, rank)| *rank);
        ranked
    }

    /// Move `player` to an on-board cell (not the terminal one; use `finish`).
    pub(crate) fn set_position(&mut self, player: PlayerId, cell: Cell) {
        debug_assert!(cell < BOARD_CELLS);
        self.slots[player.index()] = cell;
    }

    /// Put `player` on the terminal cell and rank it from the counter.
    ///
    /// The rank is computed from the counter before it is decremented; calling this
    /// twice for the same player does not decrement again.
    pub(crate) fn finish(&mut self, player: PlayerId) -> u32 {
        if let Some(rank) = self.ranks[player.index()] {
            return rank;
        }
        let rank = (self.players() - self.remaining + 1) as u32;
        self.remaining -= 1;
        self.slots[player.index()] = BOARD_CELLS;
        self.ranks[player.index()] = Some(rank);
        rank
    }

    /// Whether every slot is on the board and the counter matches the slots.
    pub fn is_consistent(&self) -> bool {
        let unfinished = self.slots.iter().filter(|c| **c != BOARD_CELLS).count();
        self.slots.iter().all(|c| *c <= BOARD_CELLS) && unfinished == self.remaining
    }
}

/// Owner of one game's state for its whole lifetime.
///
/// Created before any actor exists; `reclaim` consumes it once every actor has
/// confirmed exit.
#[derive(Debug)]
pub struct SharedGameState {
    game_id: Uuid,
    board: Arc<BoardModifierTable>,
}

/// What is left of a game after reclaim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalStandings {
    pub game_id: Uuid,
    pub positions: Option<PositionVector>,
    pub standings: Vec<(PlayerId, u32)>,
}

impl SharedGameState {
    /// Allocate the state and mint the one turn token for it.
    pub fn create(
        board: BoardModifierTable,
        positions: PositionVector,
    ) -> Result<(Self, TurnToken), GameError> {
        let players = positions.players();
        if players == 0 || players > MAX_PLAYERS {
            return Err(GameError::Setup(format!(
                "player count must be between 1 and {MAX_PLAYERS}, got {players}"
            )));
        }
        let state = Self {
            game_id: Uuid::new_v4(),
            board: Arc::new(board),
        };
        info!(
            "[SharedState] Game {} created for {} players",
            state.game_id, players
        );
        let token = TurnToken::mint(state.game_id, positions);
        Ok((state, token))
    }

    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    /// Read-only handle on the board for actors.
    pub fn board(&self) -> Arc<BoardModifierTable> {
        Arc::clone(&self.board)
    }

    /// Release the state. `token` is `None` when startup never handed it back.
    pub fn reclaim(self, token: Option<TurnToken>) -> FinalStandings {
        if Arc::strong_count(&self.board) > 1 {
            warn!(
                "[SharedState] Game {} reclaimed while {} board handles are still alive",
                self.game_id,
                Arc::strong_count(&self.board) - 1
            );
        }
        let positions = token.map(TurnToken::into_positions);
        let standings = positions
            .as_ref()
            .map(PositionVector::standings)
            .unwrap_or_default();
        info!("[SharedState] Game {} reclaimed", self.game_id);
        FinalStandings {
            game_id: self.game_id,
            positions,
            standings,
        }
    }
}
