use tokio::sync::{broadcast, oneshot};

use super::events::MatchEvent;
use super::snapshot::MatchSnapshot;
use crate::seats::Seats;

#[derive(Debug, Clone, thiserror::Error)]
pub enum MatchError {
    #[error("Invalid phase transition: {0}")]
    InvalidPhaseTransition(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Commands sent to the match actor. Each embeds a oneshot for the reply.
pub enum MatchCommand {
    Start {
        reply: oneshot::Sender<Result<(), MatchError>>,
    },
    Pause {
        reply: oneshot::Sender<Result<(), MatchError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<(), MatchError>>,
    },
    Reset {
        reply: oneshot::Sender<MatchSnapshot>,
    },
    SaveSeats {
        seats: Seats,
        reply: oneshot::Sender<()>,
    },
    GetSnapshot {
        reply: oneshot::Sender<MatchSnapshot>,
    },
    Subscribe {
        reply: oneshot::Sender<(MatchSnapshot, broadcast::Receiver<MatchEvent>)>,
    },
    Shutdown,
}
