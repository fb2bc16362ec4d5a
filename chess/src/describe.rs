//! Natural-language descriptions of SAN move tokens.
//!
//! Pure and deterministic; needs no board context. Branch order matters
//! and follows the shipped behavior: castling literals, captures, check
//! (`+`), checkmate (`#`), promotion, then plain moves. The `+`-before-`#`
//! ordering is deliberate and must not be swapped: the two markers are
//! mutually exclusive in practice, and a token somehow carrying both is
//! described as a check.

use crate::types::PieceKind;

/// Describe a single SAN token, e.g. `"Nxf3"` -> `"Knight captures on f3"`.
///
/// Total over any input; malformed tokens get a best-effort description.
pub fn describe_move(san: &str) -> String {
    if san == "O-O" {
        return "King castles kingside".to_string();
    }
    if san == "O-O-O" {
        return "King castles queenside".to_string();
    }

    if let Some(x) = san.find('x') {
        let piece = leading_piece(san);
        return format!("{} captures on {}", piece.name(), &san[x + 1..]);
    }

    if let Some(marker) = san.find('+') {
        let (piece, square) = piece_and_square(&san[..marker]);
        return format!("{} moves to {} with check", piece.name(), square);
    }

    if let Some(marker) = san.find('#') {
        let (piece, square) = piece_and_square(&san[..marker]);
        return format!("{} moves to {} and delivers checkmate", piece.name(), square);
    }

    if let Some(eq) = san.find('=') {
        let promoted = san[eq + 1..]
            .chars()
            .next()
            .and_then(uppercase_piece)
            .unwrap_or(PieceKind::Queen);
        return format!("Pawn promotes to {}", promoted.name());
    }

    let (piece, square) = piece_and_square(san);
    format!("{} moves to {}", piece.name(), square)
}

/// The piece named by the token's leading character; a lowercase file
/// letter (or anything unrecognized) means a pawn.
fn leading_piece(san: &str) -> PieceKind {
    san.chars()
        .next()
        .and_then(uppercase_piece)
        .unwrap_or(PieceKind::Pawn)
}

/// Split a marker-free token into mover and destination, stripping the
/// leading piece letter for non-pawn moves.
fn piece_and_square(body: &str) -> (PieceKind, &str) {
    match body.chars().next().and_then(uppercase_piece) {
        Some(piece) => (piece, &body[1..]),
        None => (PieceKind::Pawn, body),
    }
}

fn uppercase_piece(c: char) -> Option<PieceKind> {
    if c.is_ascii_uppercase() {
        PieceKind::from_char(c)
    } else {
        None
    }
}
