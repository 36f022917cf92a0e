use std::fmt;

use serde::{Deserialize, Serialize};

/// A board cell. `0` is off the board (not started), `100` is the terminal cell.
pub type Cell = u32;

/// Index of a player in the roster. Displayed as a letter: `A`, `B`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub usize);

impl PlayerId {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn letter(self) -> char {
        (b'A' + (self.0 % 26) as u8) as char
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// One application of a board modifier during chain resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub from: Cell,
    pub to: i64,
}

impl Hop {
    pub fn is_ladder(&self) -> bool {
        self.to > i64::from(self.from)
    }
}

/// Result of a single granted turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// The player was already on the terminal cell (stale grant).
    AlreadyFinished,
    /// Three top faces in a row.
    Cancelled,
    /// The move would end beyond the terminal cell.
    Overshoot { target: i64 },
    /// A snake chain ended below the first cell.
    OffBoard { target: i64 },
    /// Another unfinished player already stands on the destination.
    Occupied { cell: Cell, by: PlayerId },
    Moved { to: Cell },
    /// Reached the terminal cell with the given finish rank (1 = first).
    Finished { rank: u32 },
}

/// Everything that happened during one turn, for logs and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub player: PlayerId,
    pub from: Cell,
    pub rolls: Vec<u8>,
    pub hops: Vec<Hop>,
    pub outcome: MoveOutcome,
}

impl TurnRecord {
    pub fn total_rolled(&self) -> u32 {
        self.rolls.iter().map(|r| u32::from(*r)).sum()
    }
}
