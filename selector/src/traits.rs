//! The move-selection seam between the match loop and hosted models.

use crate::catalog::Provider;
use async_trait::async_trait;
use chess::PlayerSide;

/// Everything a selector needs to pick among the legal moves.
#[derive(Debug, Clone)]
pub struct SelectionRequest {
    /// Position snapshot: text diagram plus the FEN string.
    pub board: String,
    /// Described legal moves, in the oracle's order.
    pub moves: Vec<String>,
    pub provider: Provider,
    pub model: String,
    pub color: PlayerSide,
    /// Description of the previous move, or a first-move sentinel.
    pub last_move: String,
    pub api_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Could not find a move index in the reply: {0:?}")]
    BadReply(String),
    #[error("Malformed provider response: {0}")]
    Json(#[source] serde_json::Error),
}

/// Picks one of the described legal moves.
///
/// The return value is an index into [`SelectionRequest::moves`]; the
/// caller validates the range and treats any error as a failed attempt.
/// No retries or timeouts happen here.
#[async_trait]
pub trait MoveSelector: Send + Sync {
    async fn pick_move(&self, req: &SelectionRequest) -> Result<usize, SelectorError>;
}
