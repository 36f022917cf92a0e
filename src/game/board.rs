//! Board modifier table.
//!
//! One signed displacement per cell: `0` plain cell, positive ladder, negative snake.
//! The table refuses any record that would close a modifier cycle, so resolving a
//! chain always terminates.

use serde::{Deserialize, Serialize};

use crate::config::game::BOARD_CELLS;
use crate::error::GameError;
use crate::game::types::{Cell, Hop};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardModifierTable {
    /// Indexed by cell; slot 0 is unused and always zero.
    modifiers: Vec<i64>,
}

impl Default for BoardModifierTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoardModifierTable {
    /// A board with no snakes or ladders.
    pub fn empty() -> Self {
        Self {
            modifiers: vec![0; BOARD_CELLS as usize + 1],
        }
    }

    /// Build a table from `(from, to)` records.
    #[cfg(test)]
    pub fn from_records<I>(records: I) -> Result<Self, GameError>
    where
        I: IntoIterator<Item = (Cell, i64)>,
    {
        let mut table = Self::empty();
        for (from, to) in records {
            table.insert(from, to)?;
        }
        Ok(table)
    }

    /// Register a ladder or snake starting at `from` and landing on `to`.
    ///
    /// `to` is not bounds-checked: a destination off the board is resolved like any
    /// other overshoot when a player lands there.
    pub fn insert(&mut self, from: Cell, to: i64) -> Result<(), GameError> {
        if !(1..=BOARD_CELLS).contains(&from) {
            return Err(GameError::Setup(format!(
                "modifier source {from} is outside 1..={BOARD_CELLS}"
            )));
        }
        let displacement = to.checked_sub(i64::from(from)).ok_or_else(|| {
            GameError::Setup(format!("modifier {from} -> {to} is out of range"))
        })?;
        if displacement == 0 {
            return Err(GameError::Setup(format!(
                "modifier at cell {from} points to itself"
            )));
        }

        let previous = self.modifiers[from as usize];
        self.modifiers[from as usize] = displacement;
        if self.has_cycle_from(from) {
            self.modifiers[from as usize] = previous;
            return Err(GameError::Setup(format!(
                "modifier {from} -> {to} closes a loop of snakes and ladders"
            )));
        }
        Ok(())
    }

    /// Displacement at `cell`; zero for plain cells and anything off the board.
    pub fn modifier(&self, cell: i64) -> i64 {
        if (1..=i64::from(BOARD_CELLS)).contains(&cell) {
            self.modifiers[cell as usize]
        } else {
            0
        }
    }

    /// Apply modifiers from `start` until a plain or off-board cell is reached.
    ///
    /// Returns the final cell and every hop taken on the way.
    pub fn resolve_chain(&self, start: i64) -> (i64, Vec<Hop>) {
        let mut cell = start;
        let mut hops = Vec::new();
        loop {
            let jump = self.modifier(cell);
            if jump == 0 {
                break;
            }
            let to = cell + jump;
            hops.push(Hop {
                from: cell as Cell,
                to,
            });
            cell = to;
        }
        (cell, hops)
    }

    /// Ladders as `(from, to)`, bottom of the board first.
    pub fn ladders(&self) -> impl Iterator<Item = (Cell, i64)> + '_ {
        self.records().filter(|(from, to)| *to > i64::from(*from))
    }

    /// Snakes as `(from, to)`, top of the board first.
    pub fn snakes(&self) -> impl Iterator<Item = (Cell, i64)> + '_ {
        self.records()
            .rev()
            .filter(|(from, to)| *to < i64::from(*from))
    }

    fn records(&self) -> impl DoubleEndedIterator<Item = (Cell, i64)> + '_ {
        self.modifiers
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, jump)| **jump != 0)
            .map(|(cell, jump)| (cell as Cell, cell as i64 + jump))
    }

    fn has_cycle_from(&self, start: Cell) -> bool {
        let mut cell = i64::from(start);
        // A chain without a loop visits each cell at most once.
        for _ in 0..=BOARD_CELLS {
            let jump = self.modifier(cell);
            if jump == 0 {
                return false;
            }
            cell += jump;
            if cell == i64::from(start) {
                return true;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_board_has_no_modifiers() {
        let board = BoardModifierTable::empty();
        assert!((1..=100).all(|cell| board.modifier(cell) == 0));
        assert_eq!(board.resolve_chain(42), (42, vec![]));
    }

    #[test]
    fn test_chain_of_length_two() {
        // Ladder 4 -> 14 lands on the foot of ladder 14 -> 30.
        let board = BoardModifierTable::from_records([(4, 14), (14, 30)]).unwrap();
        let (cell, hops) = board.resolve_chain(4);
        assert_eq!(cell, 30);
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[0], Hop { from: 4, to: 14 });
        assert_eq!(hops[1], Hop { from: 14, to: 30 });
    }

    #[test]
    fn test_ladder_then_snake_chain() {
        let board = BoardModifierTable::from_records([(10, 50), (50, 20), (20, 25)]).unwrap();
        assert_eq!(board.resolve_chain(10).0, 25);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut board = BoardModifierTable::from_records([(10, 20)]).unwrap();
        assert!(board.insert(20, 10).is_err());
        // The rejected record leaves the table untouched.
        assert_eq!(board.modifier(20), 0);
        assert_eq!(board.resolve_chain(10).0, 20);
    }

    #[test]
    fn test_source_bounds() {
        let mut board = BoardModifierTable::empty();
        assert!(board.insert(0, 5).is_err());
        assert!(board.insert(101, 5).is_err());
        assert!(board.insert(7, 7).is_err());
        assert!(board.insert(99, 130).is_ok());
        assert_eq!(board.resolve_chain(99).0, 130);
    }

    #[test]
    fn test_extreme_destination_is_setup_failure() {
        let mut board = BoardModifierTable::empty();
        assert!(matches!(board.insert(5, i64::MIN), Err(GameError::Setup(_))));
        assert_eq!(board.modifier(5), 0);
        assert!(crate::game::layout::parse_layout("S 5 -9223372036854775808").is_err());
    }

    #[test]
    fn test_snakes_and_ladders_listing() {
        let board = BoardModifierTable::from_records([(4, 14), (17, 7), (98, 79)]).unwrap();
        assert_eq!(board.ladders().collect::<Vec<_>>(), vec![(4, 14)]);
        assert_eq!(board.snakes().collect::<Vec<_>>(), vec![(98, 79), (17, 7)]);
    }
}
