use tokio::sync::{broadcast, mpsc, oneshot};

use super::commands::{MatchCommand, MatchError};
use super::events::MatchEvent;
use super::snapshot::MatchSnapshot;
use crate::seats::Seats;

/// Cheap, cloneable handle to a match actor.
#[derive(Clone)]
pub struct MatchHandle {
    cmd_tx: mpsc::Sender<MatchCommand>,
}

impl MatchHandle {
    pub(crate) fn new(cmd_tx: mpsc::Sender<MatchCommand>) -> Self {
        Self { cmd_tx }
    }

    pub async fn start(&self) -> Result<(), MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::Start { reply: tx }).await?;
        rx.await
            .map_err(|_| MatchError::Internal("Reply dropped".into()))?
    }

    pub async fn pause(&self) -> Result<(), MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::Pause { reply: tx }).await?;
        rx.await
            .map_err(|_| MatchError::Internal("Reply dropped".into()))?
    }

    pub async fn resume(&self) -> Result<(), MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::Resume { reply: tx }).await?;
        rx.await
            .map_err(|_| MatchError::Internal("Reply dropped".into()))?
    }

    pub async fn reset(&self) -> Result<MatchSnapshot, MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::Reset { reply: tx }).await?;
        rx.await
            .map_err(|_| MatchError::Internal("Reply dropped".into()))
    }

    pub async fn save_seats(&self, seats: Seats) -> Result<(), MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::SaveSeats { seats, reply: tx })
            .await?;
        rx.await
            .map_err(|_| MatchError::Internal("Reply dropped".into()))
    }

    pub async fn get_snapshot(&self) -> Result<MatchSnapshot, MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::GetSnapshot { reply: tx }).await?;
        rx.await
            .map_err(|_| MatchError::Internal("Reply dropped".into()))
    }

    pub async fn subscribe(
        &self,
    ) -> Result<(MatchSnapshot, broadcast::Receiver<MatchEvent>), MatchError> {
        let (tx, rx) = oneshot::channel();
        self.send(MatchCommand::Subscribe { reply: tx }).await?;
        rx.await
            .map_err(|_| MatchError::Internal("Reply dropped".into()))
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(MatchCommand::Shutdown).await;
    }

    async fn send(&self, cmd: MatchCommand) -> Result<(), MatchError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| MatchError::Internal("Match actor closed".into()))
    }
}
