/// Game configuration constants.
///
/// Board size, dice rules and the defaults used when the command line is silent.
pub const BOARD_CELLS: u32 = 100; // Terminal cell; reaching it finishes a player.

/// Cell every player starts on (off the board).
pub const START_CELL: u32 = 0;

/// Number of faces on the die. Rolling the top face earns another roll.
pub const DIE_FACES: u8 = 6;

/// Maximum rolls in a single turn. That many top faces in a row cancels the turn.
pub const MAX_ROLLS_PER_TURN: usize = 3;

/// Players in a game when none is given.
pub const DEFAULT_PLAYERS: usize = 4;

/// Players are named `A`, `B`, ... so the roster is capped by the alphabet.
pub const MAX_PLAYERS: usize = 26;

/// Layout file read when none is given.
pub const DEFAULT_LAYOUT_PATH: &str = "boards/ludo.txt";

/// Delay between autoplay turns (milliseconds).
pub const DEFAULT_AUTOPLAY_DELAY_MS: u64 = 1000;
