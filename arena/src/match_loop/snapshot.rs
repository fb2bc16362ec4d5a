use chess::PlayerSide;

/// Where the match is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// No game running; seats may be configured.
    Idle,
    /// Ticks are scheduling move attempts.
    Running,
    /// No new attempts start; an in-flight attempt may still land.
    Paused,
    /// Terminal state reached; latched until reset.
    Over,
}

/// Complete, immutable snapshot of match state.
/// Sent to subscribers on every state change and on subscribe.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    pub fen: String,
    pub side_to_move: PlayerSide,
    pub phase: MatchPhase,
    /// Human-readable move log, one entry per applied move plus a
    /// trailing terminal entry when the game ends.
    pub history: Vec<String>,
    /// "<Color> is thinking..." while a selection is in flight.
    pub thinking: Option<String>,
    pub move_count: usize,
}
