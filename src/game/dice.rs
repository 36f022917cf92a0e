//! Dice sources.
//!
//! Players draw rolls from a `DiceSource`. The random source is the normal one;
//! the scripted source replays a fixed sequence for deterministic games and tests.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::game::DIE_FACES;
use crate::error::GameError;
use crate::game::types::PlayerId;

pub trait DiceSource: Send {
    /// Next roll in `1..=DIE_FACES`.
    fn roll(&mut self) -> Result<u8, GameError>;
}

/// Builds one dice source per player at spawn time.
pub type DiceFactory = Box<dyn Fn(PlayerId) -> Box<dyn DiceSource> + Send>;

pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    pub fn from_os() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// One independently seeded source per player.
    pub fn factory(seed: Option<u64>) -> DiceFactory {
        Box::new(move |player: PlayerId| -> Box<dyn DiceSource> {
            match seed {
                Some(seed) => Box::new(RandomDice::seeded(seed ^ ((player.index() as u64) << 16))),
                None => Box::new(RandomDice::from_os()),
            }
        })
    }
}

impl DiceSource for RandomDice {
    fn roll(&mut self) -> Result<u8, GameError> {
        Ok(self.rng.random_range(1..=DIE_FACES))
    }
}

/// Replays a fixed sequence of rolls. Running out is an error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    rolls: VecDeque<u8>,
}

impl ScriptedDice {
    pub fn new(rolls: impl IntoIterator<Item = u8>) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }

    /// A factory handing player `i` the `i`-th script; players without one get an empty script.
    pub fn factory(scripts: Vec<Vec<u8>>) -> DiceFactory {
        Box::new(move |player: PlayerId| -> Box<dyn DiceSource> {
            let script = scripts.get(player.index()).cloned().unwrap_or_default();
            Box::new(ScriptedDice::new(script))
        })
    }
}

impl DiceSource for ScriptedDice {
    fn roll(&mut self) -> Result<u8, GameError> {
        let roll = self.rolls.pop_front().ok_or(GameError::DiceExhausted)?;
        if !(1..=DIE_FACES).contains(&roll) {
            return Err(GameError::InvalidRoll(roll));
        }
        Ok(roll)
    }
}
