pub mod board;
pub mod describe;
pub mod fen;
pub mod game;
pub mod san;
pub mod types;
pub mod uci;

pub use board::{DisplayBoard, DisplayBoardError};
pub use describe::describe_move;
pub use game::{Game, GameError, HistoryEntry, SanMove};
pub use types::{PieceColor, PieceKind, PlayerSide};
pub use uci::{convert_uci_castling_to_cozy, format_square, format_uci_move};
