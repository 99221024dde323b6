//! Per-square reachability cache.

use crate::board::Layout;
use crate::movement;
use chess_core::{Color, PieceKind, Position};

/// For every square, the squares whose piece may legally move there.
///
/// Built once per board by running the movement validator over all 64×64
/// (start, end) pairs for pieces of both colors, then never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessMap {
    squares: [Vec<Position>; 64],
}

impl AccessMap {
    /// Computes the map for a layout.
    pub fn build(layout: &Layout) -> Self {
        let squares = std::array::from_fn(|index| {
            let Some(end) = Position::from_index(index) else {
                return Vec::new();
            };
            Position::all()
                .filter(|&start| {
                    layout
                        .piece_at(start)
                        .map_or(false, |piece| movement::is_legal(layout, start, end, piece.color))
                })
                .collect()
        });
        AccessMap { squares }
    }

    /// Squares holding a piece that can move to `end`.
    #[inline]
    pub fn accessors(&self, end: Position) -> &[Position] {
        if end.is_valid() {
            &self.squares[end.index()]
        } else {
            &[]
        }
    }

    /// Accessors of `end` whose piece matches the optional kind and color.
    pub fn matching<'a>(
        &'a self,
        layout: &'a Layout,
        end: Position,
        kind: Option<PieceKind>,
        color: Option<Color>,
    ) -> impl Iterator<Item = Position> + 'a {
        self.accessors(end).iter().copied().filter(move |&start| {
            layout
                .piece_at(start)
                .map_or(false, |piece| piece.matches(kind, color))
        })
    }

    /// Returns true if any piece of `color` can reach `end`.
    pub fn reachable_by(&self, layout: &Layout, end: Position, color: Color) -> bool {
        self.matching(layout, end, None, Some(color)).next().is_some()
    }

    /// Enumerates every legal (start, end) pair for `player`.
    ///
    /// Steps onto the opposing king are attack entries, not playable moves,
    /// and are left out.
    pub fn legal_moves(&self, layout: &Layout, player: Color) -> Vec<(Position, Position)> {
        let mut moves = Vec::new();
        for end in Position::all() {
            if layout
                .piece_at(end)
                .map_or(false, |p| p.kind == PieceKind::King)
            {
                continue;
            }
            moves.extend(
                self.matching(layout, end, None, Some(player))
                    .map(|start| (start, end)),
            );
        }
        moves
    }

    /// Returns true if `player` has at least one accessor anywhere.
    pub fn has_any(&self, layout: &Layout, player: Color) -> bool {
        Position::all().any(|end| self.reachable_by(layout, end, player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Board;

    fn sq(s: &str) -> Position {
        Position::from_algebraic(s).unwrap()
    }

    #[test]
    fn initial_accessors() {
        let board = Board::initial();
        let map = board.access_map();
        assert_eq!(map.accessors(sq("e4")), &[sq("e2")]);
        assert_eq!(map.accessors(sq("f3")), &[sq("g1"), sq("f2")]);
        assert!(map.accessors(sq("e5")).contains(&sq("e7")));
        assert!(map.accessors(Position::UNSET).is_empty());
    }

    #[test]
    fn matching_filters_kind_and_color() {
        let board = Board::initial();
        let layout = board.layout();
        let map = board.access_map();
        let knights: Vec<_> = map
            .matching(layout, sq("f3"), Some(PieceKind::Knight), Some(Color::White))
            .collect();
        assert_eq!(knights, vec![sq("g1")]);
        assert_eq!(
            map.matching(layout, sq("f3"), None, Some(Color::Black)).count(),
            0
        );
    }

    #[test]
    fn initial_move_count() {
        let board = Board::initial();
        assert_eq!(
            board.access_map().legal_moves(board.layout(), Color::White).len(),
            20
        );
        assert_eq!(
            board.access_map().legal_moves(board.layout(), Color::Black).len(),
            20
        );
    }

    #[test]
    fn kiwipete_move_count() {
        let board = Board::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(
            board.access_map().legal_moves(board.layout(), Color::White).len(),
            48
        );
    }

    #[test]
    fn attack_entries_are_not_moves() {
        let board = Board::from_fen("k7/8/8/8/r3K3/8/8/R7 b - - 0 1").unwrap();
        let layout = board.layout();
        let map = board.access_map();
        assert!(map.reachable_by(layout, sq("e4"), Color::Black));
        assert!(!map
            .legal_moves(layout, Color::Black)
            .contains(&(sq("a4"), sq("e4"))));
    }
}
