//! A played move together with the board it produced.

use crate::board::{Board, BoardError};
use crate::rules::DrawRules;
use crate::tree::NodeId;
use chess_core::{Color, MoveKind, Position};

/// One ply: where a piece went, who moved it, how it was written, and the
/// fully computed board after it.
///
/// The root of a lineage has no parent and uses [`Position::UNSET`] for both
/// squares; its `player` is the side that moved *before* the position, so the
/// first real move belongs to the other color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub(crate) start: Position,
    pub(crate) end: Position,
    pub(crate) player: Color,
    pub(crate) kind: MoveKind,
    pub(crate) notation: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) board: Board,
}

impl Move {
    /// The root move for the standard starting position.
    pub fn root() -> Self {
        Self::root_with(Board::initial())
    }

    /// A root move for an arbitrary position.
    pub fn root_from_fen(fen: &str) -> Result<Self, BoardError> {
        Self::root_from_fen_with(fen, &DrawRules::default())
    }

    pub(crate) fn root_from_fen_with(fen: &str, rules: &DrawRules) -> Result<Self, BoardError> {
        Board::from_fen_with(fen, rules).map(Self::root_with)
    }

    fn root_with(board: Board) -> Self {
        Move {
            start: Position::UNSET,
            end: Position::UNSET,
            player: board.to_move().opposite(),
            kind: MoveKind::Normal,
            notation: String::new(),
            parent: None,
            board,
        }
    }

    #[inline]
    pub fn start(&self) -> Position {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Position {
        self.end
    }

    /// The color that made this move.
    #[inline]
    pub fn player(&self) -> Color {
        self.player
    }

    #[inline]
    pub fn kind(&self) -> MoveKind {
        self.kind
    }

    /// The notation text as submitted, annotations included.
    #[inline]
    pub fn notation(&self) -> &str {
        &self.notation
    }

    /// The node of the position this move was played from.
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The board after this move.
    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns true if both moves relocate the same squares.
    #[inline]
    pub fn same_squares(&self, other: &Move) -> bool {
        self.start == other.start && self.end == other.end
    }
}
