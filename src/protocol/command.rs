//! Operator commands accepted by the coordinator.

use std::str::FromStr;

use actix::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::game::types::PlayerId;
use crate::protocol::coordinator::GameSummary;
use crate::protocol::messages::TurnReport;

#[derive(Message, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[rtype(result = "Result<CommandReply, GameError>")]
pub enum Command {
    /// Run one dispatch cycle and wait until the display has acknowledged it.
    AdvanceTurn,
    /// Delay between autoplay turns, in milliseconds.
    SetDelay(u64),
    /// Advance on a timer until the game ends. Cannot be undone.
    AutoplayStart,
    /// End the session. Refused once autoplay has started.
    Quit,
}

impl FromStr for Command {
    type Err = GameError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words
            .next()
            .ok_or_else(|| GameError::Shell("empty command".to_string()))?;
        match command {
            "next" | "advance-turn" => Ok(Command::AdvanceTurn),
            "delay" | "set-delay" => {
                let value = words
                    .next()
                    .ok_or_else(|| GameError::Shell(format!("usage: {command} <milliseconds>")))?;
                value
                    .parse()
                    .map(Command::SetDelay)
                    .map_err(|_| GameError::Shell(format!("invalid delay `{value}`")))
            }
            "autoplay" | "autoplay-start" => Ok(Command::AutoplayStart),
            "quit" => Ok(Command::Quit),
            other => Err(GameError::Shell(format!("Unknown command `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandReply {
    /// A turn was played and rendered.
    Turn(TurnReport),
    /// The granted player never completed; it is out of the game and the move was rolled back.
    Stalled { seq: u64, player: PlayerId },
    /// No player is left to move.
    GameOver(GameSummary),
    DelaySet { delay_ms: u64 },
    AutoplayStarted { delay_ms: u64 },
    QuitAccepted,
}

impl CommandReply {
    /// Whether the command loop should stop reading commands.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            CommandReply::GameOver(_) | CommandReply::QuitAccepted | CommandReply::AutoplayStarted { .. }
        )
    }
}

pub const HELP: &str = "Commands:
\tnext     - make next move
\tdelay N  - set delay to N ms (for autoplay)
\tautoplay - start autoplay mode
\tquit     - end game

\t*** Once autoplay starts, the game cannot be quit manually.
\t*** The delay cannot be changed after autoplay begins.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("next".parse::<Command>().unwrap(), Command::AdvanceTurn);
        assert_eq!("advance-turn".parse::<Command>().unwrap(), Command::AdvanceTurn);
        assert_eq!("delay 250".parse::<Command>().unwrap(), Command::SetDelay(250));
        assert_eq!("set-delay 10".parse::<Command>().unwrap(), Command::SetDelay(10));
        assert_eq!("autoplay".parse::<Command>().unwrap(), Command::AutoplayStart);
        assert_eq!("  quit  ".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Command>().is_err());
        assert!("delay".parse::<Command>().is_err());
        assert!("delay soon".parse::<Command>().is_err());
        assert!("jump".parse::<Command>().is_err());
    }
}
