use super::snapshot::MatchSnapshot;

/// Events broadcast from the match actor to all subscribers.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    /// Full state snapshot after any mutation.
    StateChanged(MatchSnapshot),
    /// User-visible error notification.
    Error(String),
}
