//! Error taxonomy for the game ensemble.
//!
//! Move rejections (overshoot, occupied cell, triple six) are not errors: they are
//! normal turn outcomes carried by `MoveOutcome`.

use thiserror::Error;

use crate::protocol::handshake::ProcessRole;

#[derive(Debug, Error)]
pub enum GameError {
    /// Shared state or board layout could not be set up. Nothing has been spawned yet.
    #[error("setup failed: {0}")]
    Setup(String),

    /// A spawned actor never delivered its readiness record.
    #[error("handshake with {role} failed: {reason}")]
    Handshake { role: ProcessRole, reason: String },

    /// No completion arrived for a granted turn.
    #[error("turn #{seq} never completed")]
    ProtocolStall { seq: u64 },

    #[error("a turn is already in flight")]
    TurnInFlight,

    #[error("the game is over")]
    GameOver,

    #[error("{0}")]
    Shell(String),

    #[error("dice source exhausted")]
    DiceExhausted,

    #[error("dice source produced {0}, outside 1..={max}", max = crate::config::game::DIE_FACES)]
    InvalidRoll(u8),

    #[error("actor mailbox closed: {0}")]
    Mailbox(#[from] actix::MailboxError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
