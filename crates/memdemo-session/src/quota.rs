use memdemo_core::KeyMode;

/// Turn allowance for sessions on the operator's API key.
pub const MAX_TURNS_SERVER_KEY: u32 = 2;

/// Turn allowance for sessions that bring their own API key.
pub const MAX_TURNS_BYOK: u32 = 8;

/// Resolves the turn limit for a session's key mode.
///
/// Pure and total: the enum is exhaustive, so there is no unrecognized
/// mode to fail on.
pub fn turn_limit(mode: KeyMode) -> u32 {
    match mode {
        KeyMode::ServerKey => MAX_TURNS_SERVER_KEY,
        KeyMode::BringOwnKey => MAX_TURNS_BYOK,
    }
}
