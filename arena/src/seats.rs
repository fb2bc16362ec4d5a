//! Seat assignments: which player occupies each side.

use chess::PlayerSide;
use selector::Player;

/// One side's configuration: a catalog player plus an optional credential.
#[derive(Debug, Clone)]
pub struct SeatAssignment {
    pub player: Player,
    pub api_key: Option<String>,
}

/// Both seats. Mutated only by an explicit save; read at each tick.
#[derive(Debug, Clone, Default)]
pub struct Seats {
    pub white: Option<SeatAssignment>,
    pub black: Option<SeatAssignment>,
}

impl Seats {
    pub fn seat(&self, side: PlayerSide) -> Option<&SeatAssignment> {
        match side {
            PlayerSide::White => self.white.as_ref(),
            PlayerSide::Black => self.black.as_ref(),
        }
    }
}
