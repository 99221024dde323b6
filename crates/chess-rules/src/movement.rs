//! Per-piece movement validation.
//!
//! [`is_legal`] decides whether one piece may move from `start` to `end` on a
//! layout: range checks, occupancy, piece geometry, path blocking, castling
//! preconditions, and finally that the mover's own king is not left attacked.
//!
//! A step that lands on the opposing king skips the final check-safety test.
//! The access map relies on this: a piece pinned to its own king still gives
//! check.

use crate::board::Layout;
use chess_core::{CastleSide, Color, MoveKind, PieceKind, Position};

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

/// The eight squares around a king, as (rank, file) deltas.
pub const KING_OFFSETS: [(i8, i8); 8] = [
    (1, -1),
    (1, 0),
    (1, 1),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// Returns true if `player` may move the piece on `start` to `end`.
///
/// Never panics; off-board coordinates simply yield `false`.
pub fn is_legal(layout: &Layout, start: Position, end: Position, player: Color) -> bool {
    if !start.is_valid() || !end.is_valid() || start == end {
        return false;
    }
    let Some(piece) = layout.piece_at(start) else {
        return false;
    };
    if piece.color != player {
        return false;
    }
    let target = layout.piece_at(end);
    if target.map_or(false, |t| t.color == player) {
        return false;
    }

    let shaped = match piece.kind {
        PieceKind::Pawn => pawn_geometry(layout, start, end, player),
        PieceKind::Knight => knight_geometry(start, end),
        PieceKind::Bishop => diagonal(start, end) && !any_between(layout, start, end),
        PieceKind::Rook => straight(start, end) && !any_between(layout, start, end),
        PieceKind::Queen => {
            (straight(start, end) || diagonal(start, end)) && !any_between(layout, start, end)
        }
        PieceKind::King => {
            king_step(start, end) || castle_geometry(layout, start, end, player).is_some()
        }
    };
    if !shaped {
        return false;
    }

    if target.map_or(false, |t| t.kind == PieceKind::King) {
        return true;
    }

    match layout.apply(start, end) {
        Some(applied) => applied
            .layout
            .king_position(player)
            .map_or(true, |king| !is_attacked(&applied.layout, king, player.opposite())),
        None => false,
    }
}

/// Classifies a validated step the way [`Layout::apply`] will execute it.
pub fn classify(layout: &Layout, start: Position, end: Position) -> Option<MoveKind> {
    layout.apply(start, end).map(|applied| applied.kind)
}

fn pawn_geometry(layout: &Layout, start: Position, end: Position, player: Color) -> bool {
    let dir = player.pawn_direction();
    let d_rank = end.rank - start.rank;
    let d_file = end.file - start.file;
    let target = layout.piece_at(end);

    if d_file == 0 {
        if target.is_some() {
            return false;
        }
        if d_rank == dir {
            return true;
        }
        return d_rank == 2 * dir
            && start.rank == player.pawn_rank()
            && layout.piece_at(Position::new(start.rank + dir, start.file)).is_none();
    }

    if d_file.abs() != 1 || d_rank != dir {
        return false;
    }
    match target {
        Some(t) => t.color != player,
        None => en_passant_geometry(layout, start, end, player),
    }
}

fn en_passant_geometry(layout: &Layout, start: Position, end: Position, player: Color) -> bool {
    if layout.to_move() != player
        || layout.en_passant_file() != Some(end.file)
        || start.rank != player.en_passant_rank()
    {
        return false;
    }
    let victim = MoveKind::en_passant_victim(start, end);
    layout
        .piece_at(victim)
        .map_or(false, |p| p.kind == PieceKind::Pawn && p.color != player)
}

fn knight_geometry(start: Position, end: Position) -> bool {
    KNIGHT_OFFSETS.contains(&(end.rank - start.rank, end.file - start.file))
}

fn king_step(start: Position, end: Position) -> bool {
    (end.rank - start.rank).abs() <= 1 && (end.file - start.file).abs() <= 1
}

#[inline]
fn straight(start: Position, end: Position) -> bool {
    start.rank == end.rank || start.file == end.file
}

#[inline]
fn diagonal(start: Position, end: Position) -> bool {
    (end.rank - start.rank).abs() == (end.file - start.file).abs()
}

/// Validates a castling king move and returns its side.
///
/// The king must stand on its home square with the matching right intact,
/// its own rook on the corner, nothing between them, and neither the start,
/// transit nor end square attacked.
fn castle_geometry(
    layout: &Layout,
    start: Position,
    end: Position,
    player: Color,
) -> Option<CastleSide> {
    let home = player.back_rank();
    if start != Position::new(home, 4) || end.rank != home {
        return None;
    }
    let side = match end.file {
        6 => CastleSide::Kingside,
        2 => CastleSide::Queenside,
        _ => return None,
    };
    if !layout.castling().has(player, side) {
        return None;
    }

    let rook_square = Position::new(home, side.rook_start_file());
    let rook = layout.piece_at(rook_square)?;
    if rook.kind != PieceKind::Rook || rook.color != player {
        return None;
    }
    if any_between(layout, start, rook_square) {
        return None;
    }

    let step = if side == CastleSide::Kingside { 1 } else { -1 };
    let transit = Position::new(home, start.file + step);
    let opponent = player.opposite();
    if [start, transit, end]
        .into_iter()
        .any(|sq| is_attacked(layout, sq, opponent))
    {
        return None;
    }
    Some(side)
}

/// Returns true if any piece of color `by` attacks `target`.
///
/// Attack geometry ignores whose turn it is and whether the attacker is
/// pinned; pawns attack diagonally only.
pub fn is_attacked(layout: &Layout, target: Position, by: Color) -> bool {
    layout
        .pieces_of(by)
        .any(|(from, piece)| attacks(layout, from, piece.kind, by, target))
}

fn attacks(layout: &Layout, from: Position, kind: PieceKind, color: Color, target: Position) -> bool {
    if from == target {
        return false;
    }
    match kind {
        PieceKind::Pawn => {
            target.rank - from.rank == color.pawn_direction()
                && (target.file - from.file).abs() == 1
        }
        PieceKind::Knight => knight_geometry(from, target),
        PieceKind::King => king_step(from, target),
        PieceKind::Bishop => diagonal(from, target) && !any_between(layout, from, target),
        PieceKind::Rook => straight(from, target) && !any_between(layout, from, target),
        PieceKind::Queen => {
            (straight(from, target) || diagonal(from, target))
                && !any_between(layout, from, target)
        }
    }
}

/// Iterates the squares strictly between two aligned squares.
///
/// Yields nothing when the squares share no rank, file or diagonal, or are
/// adjacent.
pub fn squares_between(start: Position, end: Position) -> impl Iterator<Item = Position> {
    let d_rank = end.rank - start.rank;
    let d_file = end.file - start.file;
    let aligned = start != end && (d_rank == 0 || d_file == 0 || d_rank.abs() == d_file.abs());
    let steps = if aligned {
        d_rank.abs().max(d_file.abs()) - 1
    } else {
        0
    };
    let (step_rank, step_file) = (d_rank.signum(), d_file.signum());
    (1..=steps).map(move |i| Position::new(start.rank + step_rank * i, start.file + step_file * i))
}

/// Returns true if any square strictly between `start` and `end` is occupied.
pub fn any_between(layout: &Layout, start: Position, end: Position) -> bool {
    squares_between(start, end).any(|sq| layout.piece_at(sq).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Board;

    fn sq(s: &str) -> Position {
        Position::from_algebraic(s).unwrap()
    }

    fn legal(fen: &str, from: &str, to: &str) -> bool {
        let board = Board::from_fen(fen).unwrap();
        let piece = board.piece_at(sq(from)).expect("no piece on start square");
        is_legal(board.layout(), sq(from), sq(to), piece.color)
    }

    #[test]
    fn rejects_off_board_and_empty() {
        let board = Board::initial();
        let layout = board.layout();
        assert!(!is_legal(layout, Position::UNSET, sq("e4"), Color::White));
        assert!(!is_legal(layout, sq("e2"), Position::new(8, 4), Color::White));
        assert!(!is_legal(layout, sq("e4"), sq("e5"), Color::White));
        assert!(!is_legal(layout, sq("e2"), sq("e3"), Color::Black));
        assert!(!is_legal(layout, sq("e1"), sq("e2"), Color::White));
    }

    #[test]
    fn pawn_pushes() {
        let start = FenStart::new();
        assert!(start.legal("e2", "e3"));
        assert!(start.legal("e2", "e4"));
        assert!(!start.legal("e2", "e5"));
        assert!(!start.legal("e2", "d3"));
        assert!(start.legal("e7", "e5"));
        assert!(!start.legal("e7", "e8"));
    }

    #[test]
    fn pawn_double_push_blocked() {
        let fen = "4k3/8/8/8/8/4n3/4P3/4K3 w - - 0 1";
        assert!(!legal(fen, "e2", "e3"));
        assert!(!legal(fen, "e2", "e4"));
        let fen = "4k3/8/8/8/4n3/8/4P3/4K3 w - - 0 1";
        assert!(legal(fen, "e2", "e3"));
        assert!(!legal(fen, "e2", "e4"));
    }

    #[test]
    fn pawn_double_push_only_from_home_rank() {
        let fen = "4k3/8/8/8/8/4P3/8/4K3 w - - 0 1";
        assert!(legal(fen, "e3", "e4"));
        assert!(!legal(fen, "e3", "e5"));
    }

    #[test]
    fn pawn_captures() {
        let fen = "4k3/8/8/3p1p2/4P3/8/8/4K3 w - - 0 1";
        assert!(legal(fen, "e4", "d5"));
        assert!(legal(fen, "e4", "f5"));
        assert!(legal(fen, "e4", "e5"));
        assert!(!legal("4k3/8/8/4p3/4P3/8/8/4K3 w - - 0 1", "e4", "e5"));
    }

    #[test]
    fn en_passant_requires_marker_and_victim() {
        let fen = "4k3/8/8/2pP4/8/8/8/4K3 w - c6 0 2";
        assert!(legal(fen, "d5", "c6"));
        assert!(!legal(fen, "d5", "e6"));
        assert!(!legal("4k3/8/8/2pP4/8/8/8/4K3 w - - 0 2", "d5", "c6"));
        assert!(!legal("4k3/8/8/3P4/8/8/8/4K3 w - c6 0 2", "d5", "c6"));
    }

    #[test]
    fn sliders_are_blocked() {
        let start = FenStart::new();
        assert!(!start.legal("a1", "a3"));
        assert!(!start.legal("c1", "e3"));
        assert!(!start.legal("d1", "d3"));
        let open = "4k3/8/8/8/8/8/8/R2QK2B w - - 0 1";
        assert!(legal(open, "a1", "a8"));
        assert!(legal(open, "a1", "c1"));
        assert!(!legal(open, "a1", "e1"));
        assert!(legal(open, "d1", "h5"));
        assert!(!legal(open, "d1", "e3"));
        assert!(legal(open, "h1", "a8"));
    }

    #[test]
    fn knights_jump() {
        let start = FenStart::new();
        assert!(start.legal("g1", "f3"));
        assert!(start.legal("g1", "h3"));
        assert!(!start.legal("g1", "e2"));
        assert!(!start.legal("g1", "g3"));
    }

    #[test]
    fn king_cannot_step_into_check() {
        let fen = "4k3/8/8/8/8/8/r7/4K3 w - - 0 1";
        assert!(!legal(fen, "e1", "e2"));
        assert!(legal(fen, "e1", "f1"));
        assert!(!legal(fen, "e1", "e3"));
    }

    #[test]
    fn pinned_piece_cannot_leave_line() {
        let fen = "4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1";
        assert!(!legal(fen, "e2", "c3"));
        let fen = "4r1k1/8/8/8/8/8/4R3/4K3 w - - 0 1";
        assert!(legal(fen, "e2", "e5"));
        assert!(legal(fen, "e2", "e8"));
        assert!(!legal(fen, "e2", "d2"));
    }

    #[test]
    fn pinned_piece_still_attacks_king() {
        let fen = "k7/8/8/8/r3K3/8/8/R7 b - - 0 1";
        let board = Board::from_fen(fen).unwrap();
        assert!(is_legal(board.layout(), sq("a4"), sq("e4"), Color::Black));
        assert!(!is_legal(board.layout(), sq("a4"), sq("d4"), Color::Black));
    }

    #[test]
    fn castling_preconditions() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert!(legal(fen, "e1", "g1"));
        assert!(legal(fen, "e1", "c1"));
        assert!(legal(fen, "e8", "g8"));
        assert!(!legal("r3k2r/8/8/8/8/8/8/R3K2R w Qkq - 0 1", "e1", "g1"));
        assert!(!legal("r3k2r/8/8/8/8/8/8/RN2K2R w KQkq - 0 1", "e1", "c1"));
        assert!(!legal("r3k2r/8/8/8/8/8/8/R3K1NR w KQkq - 0 1", "e1", "g1"));
        assert!(!legal("r3k2r/8/8/8/8/8/8/R3K3 w KQkq - 0 1", "e1", "g1"));
    }

    #[test]
    fn castling_through_attack() {
        assert!(!legal("r3k2r/8/8/8/8/8/5r2/R3K2R w KQ - 0 1", "e1", "g1"));
        assert!(!legal("r3k2r/8/8/8/8/8/6r1/R3K2R w KQ - 0 1", "e1", "g1"));
        assert!(!legal("r3k2r/8/8/8/8/8/4r3/R3K2R w KQ - 0 1", "e1", "g1"));
        // b1 may be attacked on the queenside; the king never crosses it.
        assert!(legal("4k3/8/8/8/8/8/1r6/R3K3 w Q - 0 1", "e1", "c1"));
    }

    #[test]
    fn attacked_squares() {
        let board = Board::initial();
        let layout = board.layout();
        assert!(is_attacked(layout, sq("f3"), Color::White));
        assert!(is_attacked(layout, sq("d3"), Color::White));
        assert!(!is_attacked(layout, sq("e4"), Color::White));
        assert!(is_attacked(layout, sq("f6"), Color::Black));
    }

    #[test]
    fn between_squares() {
        let between: Vec<_> = squares_between(sq("a1"), sq("d4")).collect();
        assert_eq!(between, vec![sq("b2"), sq("c3")]);
        assert_eq!(squares_between(sq("a1"), sq("b3")).count(), 0);
        assert_eq!(squares_between(sq("e1"), sq("e2")).count(), 0);
        assert_eq!(squares_between(sq("h8"), sq("h1")).count(), 6);
    }

    struct FenStart(Board);

    impl FenStart {
        fn new() -> Self {
            FenStart(Board::initial())
        }

        fn legal(&self, from: &str, to: &str) -> bool {
            let piece = self.0.piece_at(sq(from)).expect("no piece on start square");
            is_legal(self.0.layout(), sq(from), sq(to), piece.color)
        }
    }
}
