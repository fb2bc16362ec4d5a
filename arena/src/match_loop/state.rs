use std::sync::Arc;
use std::time::Duration;

use chess::{Game, PlayerSide};
use engine::{EngineError, EngineEvent, StockfishEngine};
use selector::MoveSelector;

use super::commands::MatchError;
use super::snapshot::{MatchPhase, MatchSnapshot};
use crate::seats::Seats;

/// Sentinel shown to the selector before the first move.
pub(crate) const NO_PREVIOUS_MOVE: &str = "No previous moves yet.";

/// Bounded retry for one selection attempt. Retries happen inside the
/// dispatched attempt, never across ticks.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Delay between move ticks.
    pub move_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            move_delay: Duration::from_millis(crate::config::DEFAULT_MOVE_DELAY_MS),
            retry: RetryPolicy::default(),
        }
    }
}

/// Internal mutable state, owned entirely by the match actor. No locks.
pub(crate) struct MatchState {
    pub game: Game,
    pub phase: MatchPhase,
    pub seats: Seats,
    pub config: MatchConfig,
    pub selector: Arc<dyn MoveSelector>,
    /// Bumped on every reset; results tagged with an older epoch are stale.
    pub epoch: u64,
    /// At most one move computation may be outstanding.
    pub in_flight: bool,
    /// Which side's engine we are waiting on, if any.
    pub engine_wait: Option<PlayerSide>,
    /// Bestmoves still owed by each side's engine for searches abandoned
    /// by a reset. Engine events carry no epoch, so the forced answer to
    /// a stop must be counted and swallowed on arrival.
    pub white_stale_bestmoves: u32,
    pub black_stale_bestmoves: u32,
    pub white_engine: Option<StockfishEngine>,
    pub black_engine: Option<StockfishEngine>,
    /// Display log: one entry per applied move plus a terminal entry.
    pub history: Vec<String>,
    pub thinking: Option<String>,
}

impl MatchState {
    pub fn new(
        game: Game,
        seats: Seats,
        config: MatchConfig,
        selector: Arc<dyn MoveSelector>,
    ) -> Self {
        Self {
            game,
            phase: MatchPhase::Idle,
            seats,
            config,
            selector,
            epoch: 0,
            in_flight: false,
            engine_wait: None,
            white_stale_bestmoves: 0,
            black_stale_bestmoves: 0,
            white_engine: None,
            black_engine: None,
            history: Vec::new(),
            thinking: None,
        }
    }

    /// Build a full snapshot of the current state.
    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            fen: self.game.to_fen(),
            side_to_move: self.game.side_to_move(),
            phase: self.phase,
            history: self.history.clone(),
            thinking: self.thinking.clone(),
            move_count: self.game.history().len(),
        }
    }

    pub fn try_start(&mut self) -> Result<(), MatchError> {
        if self.phase == MatchPhase::Idle {
            self.phase = MatchPhase::Running;
            Ok(())
        } else {
            Err(MatchError::InvalidPhaseTransition(format!(
                "Cannot start from {:?}",
                self.phase
            )))
        }
    }

    pub fn try_pause(&mut self) -> Result<(), MatchError> {
        if self.phase == MatchPhase::Running {
            // In-flight computations are not cancelled; their results
            // still land while paused.
            self.phase = MatchPhase::Paused;
            Ok(())
        } else {
            Err(MatchError::InvalidPhaseTransition(format!(
                "Cannot pause from {:?}",
                self.phase
            )))
        }
    }

    pub fn try_resume(&mut self) -> Result<(), MatchError> {
        if self.phase == MatchPhase::Paused {
            self.phase = MatchPhase::Running;
            Ok(())
        } else {
            Err(MatchError::InvalidPhaseTransition(format!(
                "Cannot resume from {:?}",
                self.phase
            )))
        }
    }

    /// Return to Idle with a fresh game. Bumping the epoch makes any
    /// in-flight result stale; engines stay alive for the next game.
    pub fn apply_reset(&mut self) {
        self.epoch += 1;
        self.game.reset();
        self.history.clear();
        self.thinking = None;
        self.in_flight = false;
        self.engine_wait = None;
        self.phase = MatchPhase::Idle;
    }

    /// The description the selector gets for the previous move.
    pub fn last_move_description(&self) -> String {
        self.history
            .last()
            .cloned()
            .unwrap_or_else(|| NO_PREVIOUS_MOVE.to_string())
    }

    /// Lazily spawn the engine for a side.
    pub async fn ensure_engine(&mut self, side: PlayerSide) -> Result<(), EngineError> {
        let slot = self.engine_slot(side);
        if slot.is_none() {
            *slot = Some(StockfishEngine::spawn().await?);
        }
        Ok(())
    }

    pub fn engine(&self, side: PlayerSide) -> Option<&StockfishEngine> {
        match side {
            PlayerSide::White => self.white_engine.as_ref(),
            PlayerSide::Black => self.black_engine.as_ref(),
        }
    }

    pub fn drop_engine(&mut self, side: PlayerSide) {
        *self.engine_slot(side) = None;
        // A fresh process owes nothing.
        *self.stale_bestmove_slot(side) = 0;
    }

    /// Record that a side's search was abandoned with its forced answer
    /// still in flight. That answer belongs to the old game.
    pub fn note_abandoned_search(&mut self, side: PlayerSide) {
        *self.stale_bestmove_slot(side) += 1;
    }

    /// Consume one owed stale bestmove for a side, if any.
    pub fn take_stale_bestmove(&mut self, side: PlayerSide) -> bool {
        let owed = self.stale_bestmove_slot(side);
        if *owed > 0 {
            *owed -= 1;
            true
        } else {
            false
        }
    }

    fn stale_bestmove_slot(&mut self, side: PlayerSide) -> &mut u32 {
        match side {
            PlayerSide::White => &mut self.white_stale_bestmoves,
            PlayerSide::Black => &mut self.black_stale_bestmoves,
        }
    }

    fn engine_slot(&mut self, side: PlayerSide) -> &mut Option<StockfishEngine> {
        match side {
            PlayerSide::White => &mut self.white_engine,
            PlayerSide::Black => &mut self.black_engine,
        }
    }

    /// Wait for the next event from either engine.
    ///
    /// Both engines are always polled so that a late bestmove is drained
    /// and can be discarded, rather than sitting in a channel until the
    /// next time that engine is waited on. A `None` event means the
    /// engine's channel closed.
    pub async fn next_engine_event(&mut self) -> (PlayerSide, Option<EngineEvent>) {
        match (self.white_engine.as_mut(), self.black_engine.as_mut()) {
            (None, None) => std::future::pending().await,
            (Some(white), None) => (PlayerSide::White, white.recv_event().await),
            (None, Some(black)) => (PlayerSide::Black, black.recv_event().await),
            (Some(white), Some(black)) => tokio::select! {
                event = white.recv_event() => (PlayerSide::White, event),
                event = black.recv_event() => (PlayerSide::Black, event),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selector::ScriptedSelector;

    fn state() -> MatchState {
        MatchState::new(
            Game::new(),
            Seats::default(),
            MatchConfig::default(),
            Arc::new(ScriptedSelector::always(0)),
        )
    }

    #[test]
    fn test_transitions_follow_the_phase_machine() {
        let mut state = state();
        assert!(state.try_pause().is_err());
        assert!(state.try_resume().is_err());

        assert!(state.try_start().is_ok());
        assert!(state.try_start().is_err());
        assert!(state.try_resume().is_err());

        assert!(state.try_pause().is_ok());
        assert!(state.try_pause().is_err());

        assert!(state.try_resume().is_ok());
        assert_eq!(state.phase, MatchPhase::Running);
    }

    #[test]
    fn test_reset_is_idempotent_apart_from_the_epoch() {
        let mut state = state();
        state.try_start().unwrap();
        state.in_flight = true;
        state.engine_wait = Some(PlayerSide::White);
        state.thinking = Some("White is thinking...".to_string());
        state.history.push("White: Pawn moves to e4".to_string());

        state.apply_reset();
        let first = state.snapshot();
        state.apply_reset();
        let second = state.snapshot();

        assert_eq!(first.phase, MatchPhase::Idle);
        assert_eq!(first.fen, second.fen);
        assert_eq!(first.history, second.history);
        assert!(first.history.is_empty());
        assert!(first.thinking.is_none());
        assert!(!state.in_flight);
        assert!(state.engine_wait.is_none());
    }

    #[test]
    fn test_last_move_description_uses_the_sentinel() {
        let mut state = state();
        assert_eq!(state.last_move_description(), NO_PREVIOUS_MOVE);

        state.history.push("White: Pawn moves to e4".to_string());
        assert_eq!(state.last_move_description(), "White: Pawn moves to e4");
    }
}
