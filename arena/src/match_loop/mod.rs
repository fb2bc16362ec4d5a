//! The match loop: a single actor drives two configured seats through
//! alternating move selection until the game ends or a user intervenes.

pub mod actor;
pub mod commands;
pub mod events;
pub mod handle;
pub mod snapshot;
pub mod state;

use std::sync::Arc;

use chess::Game;
use selector::MoveSelector;
use tokio::sync::{broadcast, mpsc};

use crate::seats::Seats;
use actor::run_match_actor;
pub use commands::MatchError;
pub use events::MatchEvent;
pub use handle::MatchHandle;
pub use snapshot::{MatchPhase, MatchSnapshot};
pub use state::{MatchConfig, RetryPolicy};
use state::MatchState;

/// Spawn a match actor for a fresh game and return its handle.
pub fn spawn_match(
    seats: Seats,
    config: MatchConfig,
    selector: Arc<dyn MoveSelector>,
) -> MatchHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, _) = broadcast::channel(100);

    let state = MatchState::new(Game::new(), seats, config, selector);
    tokio::spawn(run_match_actor(state, cmd_rx, event_tx));

    MatchHandle::new(cmd_tx)
}
