//! Runtime settings for one game.
//!
//! Built from the command line (`snake-ludo [players] [layout]`) with environment
//! overrides for the protocol timings, autoplay delay, render mode and dice.
//! `LUDO_DICE` replays fixed rolls instead of random ones: one comma-separated
//! list per player, players separated by `;` (`6,6,6;3;4,1`).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::game::{
    DEFAULT_AUTOPLAY_DELAY_MS, DEFAULT_LAYOUT_PATH, DEFAULT_PLAYERS, DIE_FACES, MAX_PLAYERS,
};
use crate::config::protocol::{DRAIN_TIMEOUT_MS, HANDSHAKE_TIMEOUT_MS, TURN_TIMEOUT_MS};
use crate::error::GameError;

/// How the display driver presents each snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    /// Board grid with snakes, ladders and player markers.
    Text,
    /// One JSON snapshot per line.
    Json,
    /// Log lines only.
    Quiet,
}

impl FromStr for RenderMode {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(RenderMode::Text),
            "json" => Ok(RenderMode::Json),
            "quiet" => Ok(RenderMode::Quiet),
            other => Err(GameError::Setup(format!("unknown render mode `{other}`"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameSettings {
    pub players: usize,
    pub layout_path: PathBuf,
    pub render: RenderMode,
    pub autoplay_delay: Duration,
    pub turn_timeout: Duration,
    pub handshake_timeout: Duration,
    pub drain_timeout: Duration,
    /// Seed for the random dice. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Fixed rolls per player, used instead of random dice when set.
    pub dice_scripts: Option<Vec<Vec<u8>>>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            players: DEFAULT_PLAYERS,
            layout_path: PathBuf::from(DEFAULT_LAYOUT_PATH),
            render: RenderMode::Text,
            autoplay_delay: Duration::from_millis(DEFAULT_AUTOPLAY_DELAY_MS),
            turn_timeout: Duration::from_millis(TURN_TIMEOUT_MS),
            handshake_timeout: Duration::from_millis(HANDSHAKE_TIMEOUT_MS),
            drain_timeout: Duration::from_millis(DRAIN_TIMEOUT_MS),
            seed: None,
            dice_scripts: None,
        }
    }
}

impl GameSettings {
    /// Settings for the given player count with every other value at its default.
    pub fn with_players(players: usize) -> Self {
        Self {
            players,
            ..Self::default()
        }
    }

    /// Read positional arguments (program name already skipped) and `LUDO_*` overrides.
    pub fn from_args<I>(args: I) -> Result<Self, GameError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut settings = Self::default();
        let mut args = args.into_iter();

        if let Some(players) = args.next() {
            settings.players = players
                .parse()
                .map_err(|_| GameError::Setup(format!("invalid player count `{players}`")))?;
        }
        if let Some(path) = args.next() {
            settings.layout_path = PathBuf::from(path);
        }
        if let Some(extra) = args.next() {
            warn!("[Config] Ignoring extra argument `{}`", extra);
        }

        if let Some(ms) = env_millis("LUDO_TURN_TIMEOUT_MS")? {
            settings.turn_timeout = ms;
        }
        if let Some(ms) = env_millis("LUDO_HANDSHAKE_TIMEOUT_MS")? {
            settings.handshake_timeout = ms;
        }
        if let Some(ms) = env_millis("LUDO_DELAY_MS")? {
            settings.autoplay_delay = ms;
        }
        if let Ok(mode) = std::env::var("LUDO_RENDER") {
            settings.render = mode.parse()?;
        }
        if let Ok(seed) = std::env::var("LUDO_SEED") {
            settings.seed = Some(
                seed.parse()
                    .map_err(|_| GameError::Setup(format!("invalid LUDO_SEED `{seed}`")))?,
            );
        }

        if let Ok(scripts) = std::env::var("LUDO_DICE") {
            settings.dice_scripts = Some(parse_dice_scripts(&scripts)?);
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.players == 0 || self.players > MAX_PLAYERS {
            return Err(GameError::Setup(format!(
                "player count must be between 1 and {MAX_PLAYERS}, got {}",
                self.players
            )));
        }
        Ok(())
    }
}

/// Parse `LUDO_DICE`: `;` between players, `,` between rolls.
pub fn parse_dice_scripts(text: &str) -> Result<Vec<Vec<u8>>, GameError> {
    text.split(';')
        .map(|script| {
            script
                .split(',')
                .map(str::trim)
                .filter(|roll| !roll.is_empty())
                .map(|roll| match roll.parse::<u8>() {
                    Ok(face) if (1..=DIE_FACES).contains(&face) => Ok(face),
                    _ => Err(GameError::Setup(format!("invalid roll `{roll}` in LUDO_DICE"))),
                })
                .collect()
        })
        .collect()
}

fn env_millis(key: &str) -> Result<Option<Duration>, GameError> {
    match std::env::var(key) {
        Ok(value) => value
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| GameError::Setup(format!("invalid {key} `{value}`"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let settings =
            GameSettings::from_args(vec!["3".to_string(), "custom.txt".to_string()]).unwrap();
        assert_eq!(settings.players, 3);
        assert_eq!(settings.layout_path, PathBuf::from("custom.txt"));
    }

    #[test]
    fn test_player_count_bounds() {
        assert!(GameSettings::from_args(vec!["0".to_string()]).is_err());
        assert!(GameSettings::from_args(vec!["27".to_string()]).is_err());
        assert!(GameSettings::from_args(vec!["four".to_string()]).is_err());
    }

    #[test]
    fn test_dice_scripts_parse() {
        assert_eq!(
            parse_dice_scripts("6,6,6; 3 ;;4,1").unwrap(),
            vec![vec![6, 6, 6], vec![3], vec![], vec![4, 1]]
        );
        assert!(parse_dice_scripts("1,7").is_err());
        assert!(parse_dice_scripts("two").is_err());
    }

    #[test]
    fn test_render_mode_parse() {
        assert_eq!("JSON".parse::<RenderMode>().unwrap(), RenderMode::Json);
        assert!("fancy".parse::<RenderMode>().is_err());
    }
}
