use std::sync::Arc;

use chess::{convert_uci_castling_to_cozy, describe_move, DisplayBoard, PlayerSide, SanMove};
use engine::{EngineCommand, EngineEvent};
use selector::{MoveSelector, PlayerKind, SelectionRequest, SelectorError};
use tokio::sync::{broadcast, mpsc};
use tokio::time;

use super::commands::MatchCommand;
use super::events::MatchEvent;
use super::snapshot::MatchPhase;
use super::state::{MatchState, RetryPolicy};

/// Result of one asynchronous selection attempt, routed back into the
/// actor loop. The epoch pins it to the game it was started for.
pub(crate) struct SelectionOutcome {
    pub epoch: u64,
    pub side: PlayerSide,
    pub result: Result<usize, SelectorError>,
}

/// The main match actor loop.
/// Owns all mutable state. Processes commands, selection outcomes, and
/// engine events sequentially; a fixed-delay tick schedules move attempts.
pub(crate) async fn run_match_actor(
    mut state: MatchState,
    mut cmd_rx: mpsc::Receiver<MatchCommand>,
    event_tx: broadcast::Sender<MatchEvent>,
) {
    tracing::info!("Match actor started");

    let (outcome_tx, mut outcome_rx) = mpsc::channel::<SelectionOutcome>(8);
    let mut tick = time::interval(state.config.move_delay);
    tick.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(MatchCommand::Shutdown) | None => {
                        tracing::info!("Match actor shutting down");
                        if let Some(engine) = state.white_engine.take() {
                            engine.shutdown().await;
                        }
                        if let Some(engine) = state.black_engine.take() {
                            engine.shutdown().await;
                        }
                        break;
                    }
                    Some(cmd) => handle_command(&mut state, cmd, &event_tx).await,
                }
            }

            Some(outcome) = outcome_rx.recv() => {
                handle_selection_outcome(&mut state, outcome, &event_tx);
            }

            (side, event) = state.next_engine_event() => {
                handle_engine_event(&mut state, side, event, &event_tx);
            }

            _ = tick.tick(), if state.phase == MatchPhase::Running && !state.in_flight => {
                run_tick(&mut state, &outcome_tx, &event_tx).await;
            }
        }
    }

    tracing::info!("Match actor exited");
}

async fn handle_command(
    state: &mut MatchState,
    cmd: MatchCommand,
    event_tx: &broadcast::Sender<MatchEvent>,
) {
    match cmd {
        MatchCommand::Start { reply } => {
            let result = state.try_start();
            if result.is_ok() {
                let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
            }
            let _ = reply.send(result);
        }
        MatchCommand::Pause { reply } => {
            let result = state.try_pause();
            if result.is_ok() {
                let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
            }
            let _ = reply.send(result);
        }
        MatchCommand::Resume { reply } => {
            let result = state.try_resume();
            if result.is_ok() {
                let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
            }
            let _ = reply.send(result);
        }
        MatchCommand::Reset { reply } => {
            if let Some(side) = state.engine_wait {
                if let Some(engine) = state.engine(side) {
                    if engine.send_command(EngineCommand::Stop).await.is_ok() {
                        // The interrupted search still emits one bestmove;
                        // it must not reach the next game.
                        state.note_abandoned_search(side);
                    }
                }
            }
            state.apply_reset();
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
            let _ = reply.send(state.snapshot());
        }
        MatchCommand::SaveSeats { seats, reply } => {
            state.seats = seats;
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
            let _ = reply.send(());
        }
        MatchCommand::GetSnapshot { reply } => {
            let _ = reply.send(state.snapshot());
        }
        MatchCommand::Subscribe { reply } => {
            let snapshot = state.snapshot();
            let rx = event_tx.subscribe();
            let _ = reply.send((snapshot, rx));
        }
        MatchCommand::Shutdown => unreachable!(),
    }
}

/// One move attempt. Runs only while the match is Running with nothing
/// in flight; any failure before a move is resolved aborts the attempt
/// and leaves the next tick to try again.
async fn run_tick(
    state: &mut MatchState,
    outcome_tx: &mpsc::Sender<SelectionOutcome>,
    event_tx: &broadcast::Sender<MatchEvent>,
) {
    if state.game.is_game_over() {
        state.phase = MatchPhase::Over;
        let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
        return;
    }

    let side = state.game.side_to_move();
    let legal = state.game.legal_moves();

    // A single legal move needs no selection.
    if legal.len() == 1 {
        if let Some(only) = legal.into_iter().next() {
            tracing::debug!("{} has a forced move: {}", side.as_str(), only.san);
            commit_move(state, only, event_tx);
        }
        return;
    }

    let Some(seat) = state.seats.seat(side) else {
        tracing::warn!("{} seat is not configured; skipping this tick", side.as_str());
        return;
    };
    let player = seat.player;
    let api_key = seat.api_key.clone();

    match player.kind {
        PlayerKind::Engine(settings) => {
            if let Err(e) = state.ensure_engine(side).await {
                tracing::warn!("Failed to start engine for {}: {}", side.as_str(), e);
                return;
            }
            let fen = state.game.to_fen();
            let Some(engine) = state.engine(side) else {
                return;
            };
            let sent = engine.send_command(EngineCommand::SetPosition { fen }).await;
            let sent = match sent {
                Ok(()) => {
                    engine
                        .send_command(EngineCommand::Go {
                            depth: settings.depth,
                        })
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                tracing::warn!("Engine command failed for {}: {}", side.as_str(), e);
                state.drop_engine(side);
                return;
            }
            state.in_flight = true;
            state.engine_wait = Some(side);
            state.thinking = Some(format!("{} is thinking...", side.as_str()));
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
        }
        PlayerKind::Service(provider) => {
            // Fail fast on incomplete seat data; no selector call is made.
            let Some(api_key) = api_key.filter(|k| !k.is_empty()) else {
                tracing::warn!("{} seat has no API key; skipping this tick", side.as_str());
                return;
            };

            let fen = state.game.to_fen();
            let board = match DisplayBoard::from_fen(&fen) {
                Ok(board) => format!("{}FEN: {}\n", board.to_diagram(), fen),
                Err(e) => {
                    tracing::warn!("Could not render position snapshot: {}", e);
                    return;
                }
            };

            let request = SelectionRequest {
                board,
                moves: legal.iter().map(|m| describe_move(&m.san)).collect(),
                provider,
                model: player.model.to_string(),
                color: side,
                last_move: state.last_move_description(),
                api_key,
            };

            let selector = Arc::clone(&state.selector);
            let epoch = state.epoch;
            let retry = state.config.retry;
            let tx = outcome_tx.clone();
            tokio::spawn(async move {
                let result = attempt_selection(selector.as_ref(), &request, retry).await;
                let _ = tx
                    .send(SelectionOutcome {
                        epoch,
                        side,
                        result,
                    })
                    .await;
            });

            state.in_flight = true;
            state.thinking = Some(format!("{} is thinking...", side.as_str()));
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
        }
    }
}

/// One dispatched selection with its bounded retries. The single-flight
/// guard stays held for the whole call, so retries never overlap ticks.
async fn attempt_selection(
    selector: &dyn MoveSelector,
    request: &SelectionRequest,
    retry: RetryPolicy,
) -> Result<usize, SelectorError> {
    let attempts = retry.attempts.max(1);
    let mut attempt = 1;
    loop {
        match selector.pick_move(request).await {
            Ok(index) => return Ok(index),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    "{} selection attempt {}/{} failed: {}",
                    request.color.as_str(),
                    attempt,
                    attempts,
                    e
                );
                if !retry.backoff.is_zero() {
                    time::sleep(retry.backoff).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn handle_selection_outcome(
    state: &mut MatchState,
    outcome: SelectionOutcome,
    event_tx: &broadcast::Sender<MatchEvent>,
) {
    if outcome.epoch != state.epoch {
        tracing::debug!("Discarding selection result from a previous game");
        return;
    }
    state.in_flight = false;
    state.thinking = None;

    // Pausing does not cancel an in-flight call; its result still lands.
    if !matches!(state.phase, MatchPhase::Running | MatchPhase::Paused) {
        tracing::debug!("Discarding selection result in phase {:?}", state.phase);
        return;
    }

    let index = match outcome.result {
        Ok(index) => index,
        Err(e) => {
            tracing::warn!("{} move selection failed: {}", outcome.side.as_str(), e);
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
            return;
        }
    };

    let legal = state.game.legal_moves();
    let count = legal.len();
    match legal.into_iter().nth(index) {
        Some(chosen) => commit_move(state, chosen, event_tx),
        None => {
            tracing::warn!(
                "Selector returned out-of-range index {} ({} legal moves)",
                index,
                count
            );
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
        }
    }
}

fn handle_engine_event(
    state: &mut MatchState,
    side: PlayerSide,
    event: Option<EngineEvent>,
    event_tx: &broadcast::Sender<MatchEvent>,
) {
    let Some(event) = event else {
        tracing::warn!("{} engine channel closed", side.as_str());
        state.drop_engine(side);
        if state.engine_wait == Some(side) {
            state.engine_wait = None;
            state.in_flight = false;
            state.thinking = None;
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
        }
        return;
    };

    match event {
        EngineEvent::Ready => {
            tracing::debug!("{} engine ready", side.as_str());
        }
        EngineEvent::Error(err) => {
            tracing::warn!("{} engine error: {}", side.as_str(), err);
            if state.engine_wait == Some(side) {
                state.engine_wait = None;
                state.in_flight = false;
                state.thinking = None;
                let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
            }
        }
        EngineEvent::BestMove(mv) => {
            if state.take_stale_bestmove(side) {
                // Forced answer from a search the reset abandoned. It may
                // arrive after a new search is under way, so it is counted
                // rather than keyed on the wait flag.
                tracing::debug!(
                    "Discarding bestmove from an abandoned {} search",
                    side.as_str()
                );
                return;
            }
            if state.engine_wait != Some(side) {
                // Leftover answer from before a stop.
                tracing::debug!("Discarding stale bestmove from {}", side.as_str());
                return;
            }
            state.engine_wait = None;
            state.in_flight = false;
            state.thinking = None;

            if !matches!(state.phase, MatchPhase::Running | MatchPhase::Paused) {
                tracing::debug!("Discarding bestmove in phase {:?}", state.phase);
                return;
            }

            let legal = state.game.legal_moves();
            let raw: Vec<cozy_chess::Move> = legal.iter().map(|m| m.mv).collect();
            let converted = convert_uci_castling_to_cozy(mv, &raw);
            match legal.into_iter().find(|m| m.mv == converted) {
                Some(chosen) => commit_move(state, chosen, event_tx),
                None => {
                    tracing::warn!("{} engine suggested illegal move {:?}", side.as_str(), mv);
                    let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
                }
            }
        }
    }
}

/// Apply a resolved move, record it, and check for a terminal state.
///
/// An apply failure at this point is fatal for the game: the match is
/// forcibly reset and a user-visible error is broadcast.
fn commit_move(state: &mut MatchState, chosen: SanMove, event_tx: &broadcast::Sender<MatchEvent>) {
    let mover = state.game.side_to_move();
    match state.game.make_move(chosen.mv) {
        Ok(entry) => {
            state
                .history
                .push(format!("{}: {}", mover.as_str(), describe_move(&entry.san)));
            if let Some(terminal) = terminal_entry(&state.game, mover) {
                state.history.push(terminal);
                state.phase = MatchPhase::Over;
            }
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
        }
        Err(e) => {
            tracing::error!("Failed to apply selected move {}: {}", chosen.san, e);
            state.apply_reset();
            let _ = event_tx.send(MatchEvent::Error(
                "Failed to apply the selected move; the match has been reset.".to_string(),
            ));
            let _ = event_tx.send(MatchEvent::StateChanged(state.snapshot()));
        }
    }
}

/// The trailing history entry for a finished game, if it just ended.
/// Checkmate and stalemate name the mover as the winner; other draws
/// carry no winner clause.
fn terminal_entry(game: &chess::Game, mover: PlayerSide) -> Option<String> {
    if game.is_checkmate() {
        Some(format!("Game Over: Checkmate. Winner: {}.", mover.as_str()))
    } else if game.is_stalemate() {
        Some(format!("Game Over: Stalemate. Winner: {}.", mover.as_str()))
    } else if game.is_draw() {
        Some("Game Over: Draw.".to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::match_loop::handle::MatchHandle;
    use crate::match_loop::snapshot::MatchSnapshot;
    use crate::match_loop::state::MatchConfig;
    use crate::seats::{SeatAssignment, Seats};
    use chess::Game;
    use selector::{find_by_model, Reply, ScriptedSelector};
    use std::time::Duration;

    fn llm_seat(api_key: Option<&str>) -> SeatAssignment {
        SeatAssignment {
            player: *find_by_model("gpt-4o").expect("catalog entry"),
            api_key: api_key.map(String::from),
        }
    }

    fn both_seats(api_key: Option<&str>) -> Seats {
        Seats {
            white: Some(llm_seat(api_key)),
            black: Some(llm_seat(api_key)),
        }
    }

    fn index_of_san(game: &Game, san: &str) -> usize {
        game.legal_moves()
            .iter()
            .position(|m| m.san == san)
            .unwrap_or_else(|| panic!("no legal move {}", san))
    }

    fn test_state(game: Game) -> MatchState {
        MatchState::new(
            game,
            Seats::default(),
            MatchConfig::default(),
            Arc::new(ScriptedSelector::always(0)),
        )
    }

    async fn spawn_match_with(
        game: Game,
        seats: Seats,
        selector: Arc<ScriptedSelector>,
        delay_ms: u64,
    ) -> (MatchHandle, broadcast::Receiver<MatchEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = broadcast::channel(100);
        let config = MatchConfig {
            move_delay: Duration::from_millis(delay_ms),
            ..MatchConfig::default()
        };
        let state = MatchState::new(game, seats, config, selector);
        tokio::spawn(run_match_actor(state, cmd_rx, event_tx));
        (MatchHandle::new(cmd_tx), event_rx)
    }

    async fn wait_for_snapshot(
        events: &mut broadcast::Receiver<MatchEvent>,
        pred: impl Fn(&MatchSnapshot) -> bool,
    ) -> MatchSnapshot {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match events.recv().await {
                    Ok(MatchEvent::StateChanged(snap)) if pred(&snap) => return snap,
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(e) => panic!("event channel closed: {}", e),
                }
            }
        })
        .await
        .expect("timed out waiting for snapshot")
    }

    fn test_request() -> SelectionRequest {
        let game = Game::new();
        SelectionRequest {
            board: game.to_fen(),
            moves: game.legal_moves().iter().map(|m| describe_move(&m.san)).collect(),
            provider: selector::Provider::OpenAi,
            model: "gpt-4o".to_string(),
            color: PlayerSide::White,
            last_move: "No previous moves yet.".to_string(),
            api_key: "key".to_string(),
        }
    }

    #[tokio::test]
    async fn test_retry_policy_recovers_from_a_failed_attempt() {
        let selector = ScriptedSelector::new(vec![Reply::Fail, Reply::Index(3)], Reply::Fail);
        let retry = RetryPolicy {
            attempts: 2,
            backoff: Duration::ZERO,
        };

        let result = attempt_selection(&selector, &test_request(), retry).await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(selector.call_count(), 2);
    }

    #[tokio::test]
    async fn test_default_retry_policy_makes_a_single_attempt() {
        let selector = ScriptedSelector::new(Vec::new(), Reply::Fail);

        let result = attempt_selection(&selector, &test_request(), RetryPolicy::default()).await;

        assert!(result.is_err());
        assert_eq!(selector.call_count(), 1);
    }

    #[tokio::test]
    async fn test_forced_move_applies_without_selector() {
        // Black is in check from Ra8; Kg7 is the only legal move.
        let game = Game::from_fen("R6k/7p/8/8/8/8/8/7K b - - 0 1").unwrap();
        let selector = Arc::new(ScriptedSelector::always(0));
        let seats = Seats {
            white: None,
            black: Some(llm_seat(Some("key"))),
        };
        let (handle, mut events) =
            spawn_match_with(game, seats, Arc::clone(&selector), 10).await;

        handle.start().await.unwrap();
        let snap = wait_for_snapshot(&mut events, |s| !s.history.is_empty()).await;

        assert_eq!(snap.history[0], "Black: King moves to g7");
        assert_eq!(selector.call_count(), 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_selected_index_is_applied() {
        let expected = Game::new().legal_moves().into_iter().nth(2).unwrap();
        let selector = Arc::new(ScriptedSelector::always(2));
        let (handle, mut events) = spawn_match_with(
            Game::new(),
            both_seats(Some("key")),
            Arc::clone(&selector),
            10,
        )
        .await;

        handle.start().await.unwrap();
        let snap = wait_for_snapshot(&mut events, |s| !s.history.is_empty()).await;

        assert_eq!(
            snap.history[0],
            format!("White: {}", describe_move(&expected.san))
        );
        assert!(selector.call_count() >= 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_out_of_range_index_leaves_position_unchanged() {
        let selector = Arc::new(ScriptedSelector::always(99));
        let (handle, _events) = spawn_match_with(
            Game::new(),
            both_seats(Some("key")),
            Arc::clone(&selector),
            10,
        )
        .await;

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        let snap = handle.get_snapshot().await.unwrap();
        assert!(selector.call_count() >= 1);
        assert!(snap.history.is_empty());
        assert_eq!(snap.fen, Game::new().to_fen());
        assert_eq!(snap.phase, MatchPhase::Running);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_credential_makes_no_selector_call() {
        let selector = Arc::new(ScriptedSelector::always(0));
        let (handle, _events) =
            spawn_match_with(Game::new(), both_seats(None), Arc::clone(&selector), 10).await;

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        let snap = handle.get_snapshot().await.unwrap();
        assert_eq!(selector.call_count(), 0);
        assert!(snap.history.is_empty());
        assert_eq!(snap.fen, Game::new().to_fen());
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_single_flight_guard_allows_one_outstanding_call() {
        let selector = Arc::new(ScriptedSelector::new(Vec::new(), Reply::Hang));
        let (handle, mut events) = spawn_match_with(
            Game::new(),
            both_seats(Some("key")),
            Arc::clone(&selector),
            10,
        )
        .await;

        handle.start().await.unwrap();
        let snap = wait_for_snapshot(&mut events, |s| s.thinking.is_some()).await;
        assert_eq!(snap.thinking.as_deref(), Some("White is thinking..."));

        // Many tick intervals pass; the stalled call keeps the guard held.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(selector.call_count(), 1);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_checkmate_latches_game_over() {
        let game = Game::from_fen("7k/5Q2/5K2/8/8/8/8/8 w - - 0 1").unwrap();
        let mate_index = index_of_san(&game, "Qg7#");
        let selector = Arc::new(ScriptedSelector::always(mate_index));
        let seats = Seats {
            white: Some(llm_seat(Some("key"))),
            black: None,
        };
        let (handle, mut events) = spawn_match_with(game, seats, selector, 10).await;

        handle.start().await.unwrap();
        let snap = wait_for_snapshot(&mut events, |s| s.phase == MatchPhase::Over).await;

        assert_eq!(
            snap.history,
            vec![
                "White: Queen moves to g7 and delivers checkmate".to_string(),
                "Game Over: Checkmate. Winner: White.".to_string(),
            ]
        );
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_stalemate_credits_the_mover() {
        // Qg1-g6 leaves Black with no moves and no check.
        let game = Game::from_fen("7k/8/7K/8/8/8/8/6Q1 w - - 0 1").unwrap();
        let stalemate_index = index_of_san(&game, "Qg6");
        let selector = Arc::new(ScriptedSelector::always(stalemate_index));
        let seats = Seats {
            white: Some(llm_seat(Some("key"))),
            black: None,
        };
        let (handle, mut events) = spawn_match_with(game, seats, selector, 10).await;

        handle.start().await.unwrap();
        let snap = wait_for_snapshot(&mut events, |s| s.phase == MatchPhase::Over).await;

        assert_eq!(
            snap.history.last().map(String::as_str),
            Some("Game Over: Stalemate. Winner: White.")
        );
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_fifty_move_rule_ends_with_plain_draw_entry() {
        // Black's only move (Kg8) pushes the halfmove clock to 100.
        let game = Game::from_fen("7k/8/6K1/8/8/8/8/5R2 b - - 99 80").unwrap();
        let selector = Arc::new(ScriptedSelector::always(0));
        let (handle, mut events) =
            spawn_match_with(game, Seats::default(), Arc::clone(&selector), 10).await;

        handle.start().await.unwrap();
        let snap = wait_for_snapshot(&mut events, |s| s.phase == MatchPhase::Over).await;

        assert_eq!(
            snap.history.last().map(String::as_str),
            Some("Game Over: Draw.")
        );
        assert!(!snap.history.last().unwrap().contains("Winner"));
        assert_eq!(selector.call_count(), 0);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reset_clears_history_and_returns_to_idle() {
        let selector = Arc::new(ScriptedSelector::always(0));
        let (handle, mut events) =
            spawn_match_with(Game::new(), both_seats(Some("key")), selector, 10).await;

        handle.start().await.unwrap();
        wait_for_snapshot(&mut events, |s| s.history.len() >= 2).await;

        let snap = handle.reset().await.unwrap();
        assert_eq!(snap.phase, MatchPhase::Idle);
        assert!(snap.history.is_empty());
        assert_eq!(snap.fen, Game::new().to_fen());

        // Restartable after reset.
        handle.start().await.unwrap();
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_phase_transitions() {
        let selector = Arc::new(ScriptedSelector::always(0));
        let (handle, _events) =
            spawn_match_with(Game::new(), both_seats(None), selector, 1000).await;

        assert!(handle.start().await.is_ok());
        assert!(handle.start().await.is_err());

        assert!(handle.pause().await.is_ok());
        assert!(handle.pause().await.is_err());

        assert!(handle.resume().await.is_ok());
        assert!(handle.resume().await.is_err());

        handle.reset().await.unwrap();
        let snap = handle.get_snapshot().await.unwrap();
        assert_eq!(snap.phase, MatchPhase::Idle);
        handle.shutdown().await;
    }

    #[test]
    fn test_stale_outcome_after_reset_is_discarded() {
        let (event_tx, _rx) = broadcast::channel(16);
        let mut state = test_state(Game::new());
        state.phase = MatchPhase::Running;
        state.in_flight = true;
        let stale_epoch = state.epoch;

        state.apply_reset();
        handle_selection_outcome(
            &mut state,
            SelectionOutcome {
                epoch: stale_epoch,
                side: PlayerSide::White,
                result: Ok(0),
            },
            &event_tx,
        );

        assert!(state.game.history().is_empty());
        assert!(state.history.is_empty());
        assert!(!state.in_flight);
        assert_eq!(state.phase, MatchPhase::Idle);
    }

    #[test]
    fn test_late_result_is_applied_while_paused() {
        let (event_tx, _rx) = broadcast::channel(16);
        let mut state = test_state(Game::new());
        state.phase = MatchPhase::Paused;
        state.in_flight = true;
        state.thinking = Some("White is thinking...".to_string());

        let epoch = state.epoch;
        handle_selection_outcome(
            &mut state,
            SelectionOutcome {
                epoch,
                side: PlayerSide::White,
                result: Ok(0),
            },
            &event_tx,
        );

        assert_eq!(state.game.history().len(), 1);
        assert_eq!(state.history.len(), 1);
        assert!(!state.in_flight);
        assert!(state.thinking.is_none());
        assert_eq!(state.phase, MatchPhase::Paused);
    }

    #[test]
    fn test_failed_selection_clears_thinking_without_moving() {
        let (event_tx, _rx) = broadcast::channel(16);
        let mut state = test_state(Game::new());
        state.phase = MatchPhase::Running;
        state.in_flight = true;
        state.thinking = Some("White is thinking...".to_string());

        let epoch = state.epoch;
        handle_selection_outcome(
            &mut state,
            SelectionOutcome {
                epoch,
                side: PlayerSide::White,
                result: Err(SelectorError::BadReply("nonsense".to_string())),
            },
            &event_tx,
        );

        assert!(state.game.history().is_empty());
        assert!(!state.in_flight);
        assert!(state.thinking.is_none());
        assert_eq!(state.phase, MatchPhase::Running);
    }

    #[test]
    fn test_stale_bestmove_is_discarded_when_not_waiting() {
        let (event_tx, _rx) = broadcast::channel(16);
        let mut state = test_state(Game::new());
        state.phase = MatchPhase::Running;

        let e2e4 = cozy_chess::Move {
            from: cozy_chess::Square::new(cozy_chess::File::E, cozy_chess::Rank::Second),
            to: cozy_chess::Square::new(cozy_chess::File::E, cozy_chess::Rank::Fourth),
            promotion: None,
        };
        handle_engine_event(
            &mut state,
            PlayerSide::White,
            Some(EngineEvent::BestMove(e2e4)),
            &event_tx,
        );

        assert!(state.game.history().is_empty());
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_bestmove_from_abandoned_search_is_not_applied_to_the_next_game() {
        let (event_tx, _rx) = broadcast::channel(16);
        let mut state = test_state(Game::new());
        state.phase = MatchPhase::Running;
        state.in_flight = true;
        state.engine_wait = Some(PlayerSide::White);

        // Reset interrupts the search; its forced answer is still in
        // flight when the next game starts and re-arms the wait.
        state.note_abandoned_search(PlayerSide::White);
        state.apply_reset();
        state.phase = MatchPhase::Running;
        state.in_flight = true;
        state.engine_wait = Some(PlayerSide::White);

        let e2e4 = cozy_chess::Move {
            from: cozy_chess::Square::new(cozy_chess::File::E, cozy_chess::Rank::Second),
            to: cozy_chess::Square::new(cozy_chess::File::E, cozy_chess::Rank::Fourth),
            promotion: None,
        };

        // The old game's answer is legal here too, but must be swallowed
        // and the fresh search awaited.
        handle_engine_event(
            &mut state,
            PlayerSide::White,
            Some(EngineEvent::BestMove(e2e4)),
            &event_tx,
        );
        assert!(state.game.history().is_empty());
        assert!(state.history.is_empty());
        assert_eq!(state.engine_wait, Some(PlayerSide::White));
        assert!(state.in_flight);

        // The fresh search's answer lands normally.
        handle_engine_event(
            &mut state,
            PlayerSide::White,
            Some(EngineEvent::BestMove(e2e4)),
            &event_tx,
        );
        assert_eq!(state.game.history().len(), 1);
        assert_eq!(state.history[0], "White: Pawn moves to e4");
        assert!(state.engine_wait.is_none());
    }

    #[test]
    fn test_replacing_an_engine_clears_owed_bestmoves() {
        let mut state = test_state(Game::new());
        state.note_abandoned_search(PlayerSide::White);
        state.drop_engine(PlayerSide::White);
        assert!(!state.take_stale_bestmove(PlayerSide::White));
    }

    #[test]
    fn test_engine_bestmove_converts_uci_castling() {
        let (event_tx, _rx) = broadcast::channel(16);
        let game =
            Game::from_fen("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1").unwrap();
        let mut state = test_state(game);
        state.phase = MatchPhase::Running;
        state.in_flight = true;
        state.engine_wait = Some(PlayerSide::White);

        // Stockfish reports kingside castling as e1g1.
        let e1g1 = cozy_chess::Move {
            from: cozy_chess::Square::new(cozy_chess::File::E, cozy_chess::Rank::First),
            to: cozy_chess::Square::new(cozy_chess::File::G, cozy_chess::Rank::First),
            promotion: None,
        };
        handle_engine_event(
            &mut state,
            PlayerSide::White,
            Some(EngineEvent::BestMove(e1g1)),
            &event_tx,
        );

        assert_eq!(state.game.history().len(), 1);
        assert_eq!(state.game.history()[0].san, "O-O");
        assert_eq!(state.history[0], "White: King castles kingside");
        assert!(state.engine_wait.is_none());
        assert!(!state.in_flight);
    }

    #[test]
    fn test_apply_failure_force_resets_with_error_event() {
        let (event_tx, mut rx) = broadcast::channel(16);
        let mut state = test_state(Game::new());
        state.phase = MatchPhase::Running;
        state.history.push("White: Pawn moves to e4".to_string());

        // An illegal move reaching commit models an oracle rejection.
        let bogus = SanMove {
            mv: cozy_chess::Move {
                from: cozy_chess::Square::new(cozy_chess::File::E, cozy_chess::Rank::Second),
                to: cozy_chess::Square::new(cozy_chess::File::E, cozy_chess::Rank::Fifth),
                promotion: None,
            },
            san: "e5".to_string(),
        };
        commit_move(&mut state, bogus, &event_tx);

        assert_eq!(state.phase, MatchPhase::Idle);
        assert!(state.history.is_empty());
        assert!(matches!(rx.try_recv(), Ok(MatchEvent::Error(_))));
    }
}
