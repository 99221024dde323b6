//! Board state.
//!
//! A [`Layout`] is the bare piece arrangement plus the state that movement
//! rules read (castling rights, en passant file, side to move). It is `Copy`
//! so the validator can try a move on a scratch copy. A [`Board`] wraps a
//! layout with counters, derived flags and its [`AccessMap`]; it is built once
//! and never mutated afterwards.

use crate::access::AccessMap;
use crate::detect;
use crate::movement;
use crate::rules::{DrawAvailability, DrawRules, Termination};
use chess_core::{
    placement_to_fen, CastleSide, CastlingRights, Color, FenError, FenParser, MoveKind, Piece,
    PieceKind, Placement, Position,
};
use thiserror::Error;

/// Errors for positions that parse as FEN but cannot be played from.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error(transparent)]
    Fen(#[from] FenError),

    #[error("{0} has no king")]
    MissingKing(Color),

    #[error("{0} has more than one king")]
    ExtraKing(Color),
}

/// Piece arrangement and the rule state movement depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    squares: Placement,
    castling: CastlingRights,
    en_passant: Option<i8>,
    to_move: Color,
}

/// Result of relocating one piece on a layout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Applied {
    pub layout: Layout,
    pub kind: MoveKind,
    pub moved: Piece,
    pub captured: Option<Piece>,
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

impl Layout {
    /// The standard initial arrangement with White to move.
    pub fn initial() -> Self {
        let mut squares: Placement = [[None; 8]; 8];
        for (file, kind) in BACK_RANK.iter().enumerate() {
            squares[0][file] = Some(Piece::new(*kind, Color::White));
            squares[1][file] = Some(Piece::new(PieceKind::Pawn, Color::White));
            squares[6][file] = Some(Piece::new(PieceKind::Pawn, Color::Black));
            squares[7][file] = Some(Piece::new(*kind, Color::Black));
        }
        Layout {
            squares,
            castling: CastlingRights::ALL,
            en_passant: None,
            to_move: Color::White,
        }
    }

    /// Builds a layout from raw parts.
    pub fn new(
        squares: Placement,
        castling: CastlingRights,
        en_passant: Option<i8>,
        to_move: Color,
    ) -> Self {
        Layout {
            squares,
            castling,
            en_passant,
            to_move,
        }
    }

    /// Returns the piece on `pos`, or `None` for empty or off-board squares.
    #[inline]
    pub fn piece_at(&self, pos: Position) -> Option<Piece> {
        if pos.is_valid() {
            self.squares[pos.rank as usize][pos.file as usize]
        } else {
            None
        }
    }

    #[inline]
    fn set(&mut self, pos: Position, piece: Option<Piece>) {
        self.squares[pos.rank as usize][pos.file as usize] = piece;
    }

    /// Returns the full grid indexed as `[rank][file]`.
    #[inline]
    pub fn squares(&self) -> &Placement {
        &self.squares
    }

    #[inline]
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    /// File of the pawn that just advanced two squares, if any.
    #[inline]
    pub fn en_passant_file(&self) -> Option<i8> {
        self.en_passant
    }

    #[inline]
    pub fn to_move(&self) -> Color {
        self.to_move
    }

    /// Locates the king of `color`.
    pub fn king_position(&self, color: Color) -> Option<Position> {
        let king = Piece::new(PieceKind::King, color);
        Position::all().find(|&pos| self.piece_at(pos) == Some(king))
    }

    /// Iterates the occupied squares of `color`.
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all().filter_map(move |pos| {
            self.piece_at(pos)
                .filter(|piece| piece.color == color)
                .map(|piece| (pos, piece))
        })
    }

    fn classify(&self, moved: Piece, start: Position, end: Position) -> MoveKind {
        let d_rank = end.rank - start.rank;
        let d_file = end.file - start.file;
        match moved.kind {
            PieceKind::Pawn if d_rank.abs() == 2 => MoveKind::DoublePush,
            PieceKind::Pawn if d_file != 0 && self.piece_at(end).is_none() => MoveKind::EnPassant,
            PieceKind::King if d_file.abs() == 2 && d_rank == 0 => {
                if d_file > 0 {
                    MoveKind::Castle(CastleSide::Kingside)
                } else {
                    MoveKind::Castle(CastleSide::Queenside)
                }
            }
            _ => MoveKind::Normal,
        }
    }

    /// Relocates the piece on `start` to `end` without checking legality.
    ///
    /// Handles the en passant victim, the castling rook, castling-rights
    /// revocation, the en passant file and the side to move. Returns `None`
    /// if either square is off the board or `start` is empty.
    pub(crate) fn apply(&self, start: Position, end: Position) -> Option<Applied> {
        if !start.is_valid() || !end.is_valid() {
            return None;
        }
        let moved = self.piece_at(start)?;
        let kind = self.classify(moved, start, end);
        let mut next = *self;

        let captured = match kind {
            MoveKind::EnPassant => {
                let victim = MoveKind::en_passant_victim(start, end);
                let captured = next.piece_at(victim);
                next.set(victim, None);
                captured
            }
            _ => next.piece_at(end),
        };

        next.set(end, Some(moved));
        next.set(start, None);

        if let MoveKind::Castle(side) = kind {
            let rank = start.rank;
            let rook_start = Position::new(rank, side.rook_start_file());
            let rook_end = Position::new(rank, side.rook_end_file());
            let rook = next.piece_at(rook_start);
            next.set(rook_end, rook);
            next.set(rook_start, None);
        }

        match moved.kind {
            PieceKind::King => next.castling.remove_color(moved.color),
            PieceKind::Rook if start.rank == moved.color.back_rank() => {
                if let Some(side) = CastleSide::from_rook_file(start.file) {
                    next.castling.remove(moved.color, side);
                }
            }
            _ => {}
        }
        if let Some(taken) = captured {
            if taken.kind == PieceKind::Rook && end.rank == taken.color.back_rank() {
                if let Some(side) = CastleSide::from_rook_file(end.file) {
                    next.castling.remove(taken.color, side);
                }
            }
        }

        next.en_passant = match kind {
            MoveKind::DoublePush => Some(start.file),
            _ => None,
        };
        next.to_move = moved.color.opposite();

        Some(Applied {
            layout: next,
            kind,
            moved,
            captured,
        })
    }

    fn check_kings(&self) -> Result<(), BoardError> {
        for color in [Color::White, Color::Black] {
            let kings = self
                .pieces_of(color)
                .filter(|(_, piece)| piece.kind == PieceKind::King)
                .count();
            match kings {
                0 => return Err(BoardError::MissingKing(color)),
                1 => {}
                _ => return Err(BoardError::ExtraKing(color)),
            }
        }
        Ok(())
    }
}

/// A fully computed position: layout, counters, derived flags and access map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    layout: Layout,
    ply: u32,
    fifty_move_counter: u32,
    termination: Termination,
    draws: DrawAvailability,
    in_check: bool,
    access: AccessMap,
}

impl Board {
    /// The standard starting position.
    pub fn initial() -> Self {
        Self::seal(Layout::initial(), 0, 0, std::iter::empty(), &DrawRules::default())
    }

    /// Loads a position from FEN.
    ///
    /// The ply index is derived from the fullmove number when present.
    pub fn from_fen(fen: &str) -> Result<Self, BoardError> {
        Self::from_fen_with(fen, &DrawRules::default())
    }

    /// Loads a position from FEN using the given draw thresholds.
    pub fn from_fen_with(fen: &str, rules: &DrawRules) -> Result<Self, BoardError> {
        let parsed = FenParser::parse(fen)?;
        let layout = Layout::new(
            parsed.placement,
            parsed.castling,
            parsed.en_passant_file(),
            parsed.active_color,
        );
        layout.check_kings()?;

        let black_to_move = u32::from(parsed.active_color == Color::Black);
        let ply = parsed
            .fullmove_number
            .map_or(black_to_move, |n| {
                n.saturating_sub(1)
                    .saturating_mul(2)
                    .saturating_add(black_to_move)
            });
        let fifty = parsed.halfmove_clock.unwrap_or(0);
        Ok(Self::seal(layout, ply, fifty, std::iter::empty(), rules))
    }

    /// Finalizes a layout into a board: builds the access map, then derives
    /// the check flag, termination and draw flags for the side to move.
    ///
    /// `history` yields earlier boards, most recent first.
    pub(crate) fn seal<'a>(
        layout: Layout,
        ply: u32,
        fifty_move_counter: u32,
        history: impl IntoIterator<Item = &'a Board>,
        rules: &DrawRules,
    ) -> Board {
        let access = AccessMap::build(&layout);
        let mut board = Board {
            layout,
            ply,
            fifty_move_counter,
            termination: Termination::InProgress,
            draws: DrawAvailability::default(),
            in_check: false,
            access,
        };

        let player = layout.to_move();
        board.in_check = detect::in_check(&board, player);
        board.termination = if detect::in_checkmate(&board, player) {
            Termination::Victory(player.opposite())
        } else if detect::in_stalemate(&board, player) {
            Termination::Stalemate
        } else {
            Termination::InProgress
        };

        let occurrences = board.count_repetitions(history, rules.repetition_count);
        board.draws = DrawAvailability {
            fifty_move: fifty_move_counter >= rules.fifty_move_plies,
            threefold: occurrences >= rules.repetition_count,
        };
        board
    }

    /// Counts equivalent occurrences of this position, itself included,
    /// stopping once `limit` is reached.
    ///
    /// Only the boards since the last pawn move or capture can repeat, so the
    /// walk never looks further back than the fifty-move counter.
    fn count_repetitions<'a>(
        &self,
        history: impl IntoIterator<Item = &'a Board>,
        limit: usize,
    ) -> usize {
        let mut count = 1;
        for earlier in history
            .into_iter()
            .take(self.fifty_move_counter as usize)
        {
            if count >= limit {
                break;
            }
            if self.same_position(earlier) {
                count += 1;
            }
        }
        count
    }

    /// Produces the board after moving `start` to `end`.
    ///
    /// The caller has already validated the move. `history` yields the boards
    /// before this one, most recent first. Returns `None` if `start` is empty.
    pub(crate) fn successor<'a>(
        &'a self,
        start: Position,
        end: Position,
        history: impl IntoIterator<Item = &'a Board>,
        rules: &DrawRules,
    ) -> Option<Board> {
        let applied = self.layout.apply(start, end)?;
        let fifty = if applied.moved.kind == PieceKind::Pawn || applied.captured.is_some() {
            0
        } else {
            self.fifty_move_counter.saturating_add(1)
        };
        let history = std::iter::once(self).chain(history);
        Some(Self::seal(
            applied.layout,
            self.ply.saturating_add(1),
            fifty,
            history,
            rules,
        ))
    }

    /// Plays `start` to `end` for the side to move, with default draw rules
    /// and no earlier history.
    ///
    /// Returns `None` if the move is illegal or lands on a king.
    pub fn play(&self, start: Position, end: Position) -> Option<Board> {
        let onto_king = self
            .piece_at(end)
            .map_or(false, |p| p.kind == PieceKind::King);
        if onto_king || !movement::is_legal(&self.layout, start, end, self.to_move()) {
            return None;
        }
        self.successor(start, end, std::iter::empty(), &DrawRules::default())
    }

    /// Every legal (start, end) pair for the side to move.
    pub fn legal_moves(&self) -> Vec<(Position, Position)> {
        self.access.legal_moves(&self.layout, self.to_move())
    }

    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[inline]
    pub fn piece_at(&self, pos: Position) -> Option<Piece> {
        self.layout.piece_at(pos)
    }

    #[inline]
    pub fn squares(&self) -> &Placement {
        self.layout.squares()
    }

    #[inline]
    pub fn castling(&self) -> CastlingRights {
        self.layout.castling()
    }

    #[inline]
    pub fn en_passant_file(&self) -> Option<i8> {
        self.layout.en_passant_file()
    }

    #[inline]
    pub fn to_move(&self) -> Color {
        self.layout.to_move()
    }

    /// Half-moves played since the game started.
    #[inline]
    pub fn ply(&self) -> u32 {
        self.ply
    }

    /// Half-moves since the last pawn move or capture.
    #[inline]
    pub fn fifty_move_counter(&self) -> u32 {
        self.fifty_move_counter
    }

    #[inline]
    pub fn termination(&self) -> Termination {
        self.termination
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.termination.is_terminal()
    }

    #[inline]
    pub fn draws(&self) -> DrawAvailability {
        self.draws
    }

    /// Whether the side to move is in check.
    #[inline]
    pub fn in_check(&self) -> bool {
        self.in_check
    }

    #[inline]
    pub fn access_map(&self) -> &AccessMap {
        &self.access
    }

    /// Compares piece placement and castling rights only.
    pub fn same_position(&self, other: &Board) -> bool {
        self.layout.castling == other.layout.castling && self.layout.squares == other.layout.squares
    }

    /// Formats the board as FEN.
    pub fn to_fen(&self) -> String {
        let en_passant = match self.en_passant_file() {
            Some(file) => {
                // The target square sits behind the pawn that just advanced.
                let rank = match self.to_move() {
                    Color::White => 5,
                    Color::Black => 2,
                };
                Position::new(rank, file).to_algebraic()
            }
            None => "-".to_string(),
        };
        format!(
            "{} {} {} {} {} {}",
            placement_to_fen(self.squares()),
            self.to_move().to_fen_char(),
            self.castling(),
            en_passant,
            self.fifty_move_counter,
            self.ply / 2 + 1
        )
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}
