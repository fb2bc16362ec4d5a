//! Standard algebraic notation for legal moves.
//!
//! Tokens carry capture markers, minimal disambiguation, castling
//! literals, promotion suffixes, and check/checkmate markers, so they
//! can be described to a move selector without further board context.

use cozy_chess::{Board, File, GameStatus, Move, Piece, Square};

use crate::uci::format_square;

/// Generate the SAN token for `mv`, which must be legal in `board`.
/// `legal` is the full legal move list, used for disambiguation.
pub fn san_for_move(board: &Board, mv: Move, legal: &[Move]) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        // Not reachable for legal moves; fall back to coordinates.
        return format!("{}{}", format_square(mv.from), format_square(mv.to));
    };

    let suffix = check_suffix(board, mv);

    // cozy-chess encodes castling as king-takes-own-rook.
    if piece == Piece::King && board.color_on(mv.to) == Some(board.side_to_move()) {
        let literal = match mv.to.file() {
            File::A => "O-O-O",
            _ => "O-O",
        };
        return format!("{}{}", literal, suffix);
    }

    let is_capture =
        board.piece_on(mv.to).is_some() || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

    let mut san = String::new();
    match piece {
        Piece::Pawn => {
            if is_capture {
                san.push(file_char(mv.from));
                san.push('x');
            }
            san.push_str(&format_square(mv.to));
            if let Some(promo) = mv.promotion {
                san.push('=');
                san.push(piece_letter(promo));
            }
        }
        _ => {
            san.push(piece_letter(piece));
            san.push_str(&disambiguation(board, mv, piece, legal));
            if is_capture {
                san.push('x');
            }
            san.push_str(&format_square(mv.to));
        }
    }

    san.push_str(suffix);
    san
}

/// File and/or rank needed to distinguish `mv` from other legal moves of
/// the same piece kind to the same destination.
fn disambiguation(board: &Board, mv: Move, piece: Piece, legal: &[Move]) -> String {
    let rivals: Vec<Square> = legal
        .iter()
        .filter(|other| {
            other.to == mv.to && other.from != mv.from && board.piece_on(other.from) == Some(piece)
        })
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() || piece == Piece::Pawn {
        return String::new();
    }

    let file_unique = rivals.iter().all(|sq| sq.file() != mv.from.file());
    let rank_unique = rivals.iter().all(|sq| sq.rank() != mv.from.rank());

    if file_unique {
        file_char(mv.from).to_string()
    } else if rank_unique {
        rank_char(mv.from).to_string()
    } else {
        format_square(mv.from)
    }
}

/// "+" when the move gives check, "#" when it mates, "" otherwise.
fn check_suffix(board: &Board, mv: Move) -> &'static str {
    let mut after = board.clone();
    after.play(mv);
    if after.checkers().is_empty() {
        ""
    } else if after.status() == GameStatus::Won {
        "#"
    } else {
        "+"
    }
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn file_char(square: Square) -> char {
    match square.file() {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

fn rank_char(square: Square) -> char {
    match square.rank() {
        cozy_chess::Rank::First => '1',
        cozy_chess::Rank::Second => '2',
        cozy_chess::Rank::Third => '3',
        cozy_chess::Rank::Fourth => '4',
        cozy_chess::Rank::Fifth => '5',
        cozy_chess::Rank::Sixth => '6',
        cozy_chess::Rank::Seventh => '7',
        cozy_chess::Rank::Eighth => '8',
    }
}
