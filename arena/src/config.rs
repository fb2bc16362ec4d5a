//! Configuration for the arena binary.
//!
//! Credentials and the tick delay can come from the environment:
//! 1. ARENA_WHITE_API_KEY / ARENA_BLACK_API_KEY
//! 2. ARENA_MOVE_DELAY_MS
//! Command-line flags take precedence over these.

use chess::PlayerSide;

pub const DEFAULT_MOVE_DELAY_MS: u64 = 500;

/// API key for a side from the environment, if set and non-empty.
pub fn env_api_key(side: PlayerSide) -> Option<String> {
    let var = match side {
        PlayerSide::White => "ARENA_WHITE_API_KEY",
        PlayerSide::Black => "ARENA_BLACK_API_KEY",
    };
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

/// Delay between move ticks, from ARENA_MOVE_DELAY_MS or the default.
pub fn env_move_delay_ms() -> u64 {
    std::env::var("ARENA_MOVE_DELAY_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MOVE_DELAY_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: env-var overrides are not tested here to avoid test pollution;
    // std::env::set_var races with parallel tests.

    #[test]
    fn test_default_move_delay() {
        if std::env::var("ARENA_MOVE_DELAY_MS").is_err() {
            assert_eq!(env_move_delay_ms(), DEFAULT_MOVE_DELAY_MS);
        }
    }
}
