//! Check, checkmate and stalemate classification.
//!
//! Every query reads the board's access map; only escape squares for the king
//! and en passant captures go back to the movement validator.

use crate::board::Board;
use crate::movement::{self, KING_OFFSETS};
use chess_core::{Color, PieceKind, Position};

/// Returns true if `player`'s king can be reached by an opposing piece.
///
/// A board without a king for `player` is never in check. Boards built
/// through [`Board::from_fen`] always carry one king per side.
pub fn in_check(board: &Board, player: Color) -> bool {
    let layout = board.layout();
    layout.king_position(player).map_or(false, |king| {
        board
            .access_map()
            .reachable_by(layout, king, player.opposite())
    })
}

/// Returns true if `player` is in check and cannot escape it.
pub fn in_checkmate(board: &Board, player: Color) -> bool {
    if !in_check(board, player) {
        return false;
    }
    let layout = board.layout();
    let map = board.access_map();
    let Some(king) = layout.king_position(player) else {
        return false;
    };

    let escapes = KING_OFFSETS
        .iter()
        .filter_map(|&(dr, df)| king.offset(dr, df))
        .any(|sq| movement::is_legal(layout, king, sq, player));
    if escapes {
        return false;
    }

    let attackers: Vec<Position> = map
        .matching(layout, king, None, Some(player.opposite()))
        .collect();
    let attacker = match attackers.as_slice() {
        [single] => *single,
        _ => return true,
    };

    if map.reachable_by(layout, attacker, player) || en_passant_rescue(board, attacker, player) {
        return false;
    }

    let slider = layout
        .piece_at(attacker)
        .map_or(false, |piece| piece.kind.is_slider());
    if slider
        && movement::squares_between(attacker, king).any(|sq| map.reachable_by(layout, sq, player))
    {
        return false;
    }

    true
}

/// Returns true if a checking pawn that just advanced two squares can be
/// taken en passant.
fn en_passant_rescue(board: &Board, attacker: Position, player: Color) -> bool {
    let layout = board.layout();
    let is_pawn = layout
        .piece_at(attacker)
        .map_or(false, |p| p.kind == PieceKind::Pawn);
    if !is_pawn || layout.en_passant_file() != Some(attacker.file) {
        return false;
    }
    let Some(target) = attacker.offset(player.pawn_direction(), 0) else {
        return false;
    };
    [-1, 1]
        .into_iter()
        .filter_map(|df| attacker.offset(0, df))
        .any(|from| movement::is_legal(layout, from, target, player))
}

/// Returns true if `player` is not in check and has no legal move.
pub fn in_stalemate(board: &Board, player: Color) -> bool {
    !in_check(board, player) && !board.access_map().has_any(board.layout(), player)
}
