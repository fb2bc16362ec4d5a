//! Minimal UCI line parsing for driving Stockfish.
//!
//! Only the lines the orchestrator acts on are modeled; search info and
//! option announcements are ignored by the caller.

use cozy_chess::{File, Move, Piece, Rank, Square};

/// Incoming line from a UCI engine.
#[derive(Debug, Clone)]
pub enum UciLine {
    Id { name: String, value: String },
    UciOk,
    ReadyOk,
    BestMove { mv: Move, ponder: Option<Move> },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UciError {
    #[error("Malformed UCI line: {0}")]
    MalformedLine(String),
    #[error("Unknown UCI line: {0}")]
    UnknownLine(String),
    #[error("Invalid UCI move: {0}")]
    InvalidMove(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion piece: {0}")]
    InvalidPromotion(String),
}

/// Parse a single line of engine output.
pub fn parse_uci_line(line: &str) -> Result<UciLine, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    match tokens.first() {
        Some(&"uciok") => Ok(UciLine::UciOk),
        Some(&"readyok") => Ok(UciLine::ReadyOk),

        Some(&"id") => {
            if tokens.len() < 3 {
                return Err(UciError::MalformedLine(line.to_string()));
            }
            Ok(UciLine::Id {
                name: tokens[1].to_string(),
                value: tokens[2..].join(" "),
            })
        }

        Some(&"bestmove") => {
            if tokens.len() < 2 {
                return Err(UciError::MalformedLine(line.to_string()));
            }
            let mv = parse_uci_move(tokens[1])?;
            let ponder = if tokens.len() >= 4 && tokens[2] == "ponder" {
                Some(parse_uci_move(tokens[3])?)
            } else {
                None
            };
            Ok(UciLine::BestMove { mv, ponder })
        }

        _ => Err(UciError::UnknownLine(line.to_string())),
    }
}

/// Parse UCI move format (e2e4, e7e8q).
pub fn parse_uci_move(s: &str) -> Result<Move, UciError> {
    // Four coordinate characters plus an optional promotion letter.
    if !s.is_ascii() || s.len() < 4 || s.len() > 5 {
        return Err(UciError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;

    let promotion = match s.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(Piece::Queen),
        Some(b'r') => Some(Piece::Rook),
        Some(b'b') => Some(Piece::Bishop),
        Some(b'n') => Some(Piece::Knight),
        Some(_) => return Err(UciError::InvalidPromotion(s.to_string())),
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

fn parse_square(s: &str) -> Result<Square, UciError> {
    let mut chars = s.chars();
    let (Some(file_char), Some(rank_char), None) = (chars.next(), chars.next(), chars.next())
    else {
        return Err(UciError::InvalidSquare(s.to_string()));
    };

    let file = match file_char {
        'a' => File::A,
        'b' => File::B,
        'c' => File::C,
        'd' => File::D,
        'e' => File::E,
        'f' => File::F,
        'g' => File::G,
        'h' => File::H,
        _ => return Err(UciError::InvalidSquare(s.to_string())),
    };

    let rank = match rank_char {
        '1' => Rank::First,
        '2' => Rank::Second,
        '3' => Rank::Third,
        '4' => Rank::Fourth,
        '5' => Rank::Fifth,
        '6' => Rank::Sixth,
        '7' => Rank::Seventh,
        '8' => Rank::Eighth,
        _ => return Err(UciError::InvalidSquare(s.to_string())),
    };

    Ok(Square::new(file, rank))
}
