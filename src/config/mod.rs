/// Main configuration module.
///
/// Re-exports submodules for game rules and protocol timing, and assembles the
/// runtime `GameSettings` from command-line arguments and environment overrides.
pub mod game;
pub mod protocol;
pub mod settings;

pub use settings::{GameSettings, RenderMode};
