pub mod stockfish;
pub mod uci;

pub use stockfish::StockfishEngine;
pub use uci::{parse_uci_line, parse_uci_move, UciError, UciLine};

/// Commands sent to the engine.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    SetPosition { fen: String },
    Go { depth: u8 },
    Stop,
    Quit,
}

/// Events received from the engine.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Ready,
    BestMove(cozy_chess::Move),
    Error(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Stockfish executable not found")]
    NotFound,
    #[error("Failed to spawn Stockfish: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Engine has no {0} pipe")]
    MissingPipe(&'static str),
    #[error("IO error talking to engine: {0}")]
    Io(#[from] std::io::Error),
    #[error("Timed out waiting for engine handshake")]
    HandshakeTimeout,
    #[error("Engine closed before completing handshake")]
    HandshakeClosed,
    #[error("Engine command channel closed")]
    ChannelClosed,
}
