//! Classification of a single (start, end) step.

use crate::{CastleSide, Position};
use serde::{Deserialize, Serialize};

/// What kind of board edit a step performs beyond relocating one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Plain relocation, with or without a capture on the end square.
    Normal,
    /// Pawn advancing two squares from its starting rank.
    DoublePush,
    /// Pawn capturing a pawn that passed it, removing the pawn beside the end square.
    EnPassant,
    /// King moving two files along its back rank, dragging the rook with it.
    Castle(CastleSide),
}

impl MoveKind {
    /// Returns true if this is a castling move.
    #[inline]
    pub const fn is_castling(self) -> bool {
        matches!(self, MoveKind::Castle(_))
    }

    /// Returns the square of the pawn captured by an en passant step.
    #[inline]
    pub const fn en_passant_victim(start: Position, end: Position) -> Position {
        Position::new(start.rank, end.file)
    }
}
