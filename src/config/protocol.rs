/// Protocol timing constants.
///
/// All values are in milliseconds.
pub const TURN_TIMEOUT_MS: u64 = 5_000; // A granted turn must complete within this window.

/// Time each spawned actor has to deliver its readiness record.
pub const HANDSHAKE_TIMEOUT_MS: u64 = 3_000;

/// Time each actor has to confirm its exit during shutdown before it is force-stopped.
pub const DRAIN_TIMEOUT_MS: u64 = 2_000;
