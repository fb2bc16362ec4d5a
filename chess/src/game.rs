use cozy_chess::{Board, GameStatus, Move};

use crate::san::san_for_move;
use crate::types::PlayerSide;

/// Main game state wrapper around a cozy-chess board.
///
/// All mutation goes through [`Game::make_move`]; the position is always
/// reachable from the starting position by a sequence of legal moves.
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    history: Vec<HistoryEntry>,
}

/// One applied move, recorded in order.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub mv: Move,
    pub san: String,
}

/// A legal move paired with its SAN token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanMove {
    pub mv: Move,
    pub san: String,
}

impl Game {
    /// Create a new game from the standard starting position.
    pub fn new() -> Self {
        Self {
            position: Board::default(),
            history: Vec::new(),
        }
    }

    /// Create a game from a FEN string.
    pub fn from_fen(fen: &str) -> Result<Self, GameError> {
        let position = crate::fen::parse_fen(fen)?;
        Ok(Self {
            position,
            history: Vec::new(),
        })
    }

    /// Get the current board position.
    pub fn position(&self) -> &Board {
        &self.position
    }

    /// Get the move history.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// The ordered legal moves for the current position, with SAN tokens.
    pub fn legal_moves(&self) -> Vec<SanMove> {
        let raw = self.raw_legal_moves();
        raw.iter()
            .map(|&mv| SanMove {
                mv,
                san: san_for_move(&self.position, mv, &raw),
            })
            .collect()
    }

    /// Make a move on the board. Fails if the move is not legal.
    pub fn make_move(&mut self, mv: Move) -> Result<HistoryEntry, GameError> {
        let raw = self.raw_legal_moves();
        if !raw.contains(&mv) {
            return Err(GameError::IllegalMove);
        }

        let san = san_for_move(&self.position, mv, &raw);

        let mut next = self.position.clone();
        next.play(mv);
        self.position = next;

        let entry = HistoryEntry { mv, san };
        self.history.push(entry.clone());
        Ok(entry)
    }

    /// Make a move given its SAN token. Used by tests and scripted play.
    pub fn make_san_move(&mut self, san: &str) -> Result<HistoryEntry, GameError> {
        let chosen = self
            .legal_moves()
            .into_iter()
            .find(|m| m.san == san)
            .ok_or(GameError::IllegalMove)?;
        self.make_move(chosen.mv)
    }

    /// The side to move.
    pub fn side_to_move(&self) -> PlayerSide {
        PlayerSide::from(self.position.side_to_move())
    }

    /// Export the position to a FEN string.
    pub fn to_fen(&self) -> String {
        crate::fen::format_fen(&self.position)
    }

    /// Discard the game and return to the initial position.
    pub fn reset(&mut self) {
        *self = Game::new();
    }

    /// The side to move has been mated.
    pub fn is_checkmate(&self) -> bool {
        self.position.status() == GameStatus::Won
    }

    /// The side to move has no legal moves and is not in check.
    pub fn is_stalemate(&self) -> bool {
        self.position.status() == GameStatus::Drawn && self.raw_legal_moves().is_empty()
    }

    /// The rules library adjudicated a draw that is not stalemate
    /// (fifty-move rule).
    pub fn is_draw(&self) -> bool {
        self.position.status() == GameStatus::Drawn && !self.raw_legal_moves().is_empty()
    }

    pub fn is_game_over(&self) -> bool {
        self.position.status() != GameStatus::Ongoing
    }

    fn raw_legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        self.position.generate_moves(|mvs| {
            moves.extend(mvs);
            false
        });
        moves
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move")]
    IllegalMove,
    #[error("FEN parse error: {0}")]
    Fen(#[from] crate::fen::FenError),
}
