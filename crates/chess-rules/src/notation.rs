//! Algebraic notation parser.
//!
//! Turns text such as `e4`, `Nbd7`, `exd6` or `O-O-O` into a concrete
//! (start, end) pair against a parent move's board, validates it, and builds
//! the successor board.

use crate::board::Board;
use crate::mov::Move;
use crate::movement;
use crate::rules::DrawRules;
use chess_core::{
    file_from_char, rank_from_char, CastleSide, Color, MoveKind, PieceKind, Position,
};
use thiserror::Error;
use tracing::trace;

/// Reasons a notation string does not produce a move.
///
/// None of these change any state; the caller may retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotationError {
    #[error("notation '{0}' is too short")]
    TooShort(String),

    #[error("no destination square in '{0}'")]
    InvalidSquare(String),

    #[error("unknown piece letter '{0}'")]
    UnknownPiece(char),

    #[error("invalid disambiguation in '{0}'")]
    InvalidDisambiguation(String),

    #[error("{color} cannot castle {side:?}")]
    CastlingUnavailable { color: Color, side: CastleSide },

    /// Zero or several pieces fit the notation. The two cases are not
    /// distinguished.
    #[error("no single {kind} can move to {end} ({candidates} candidates)")]
    Unresolved {
        kind: PieceKind,
        end: Position,
        candidates: usize,
    },

    #[error("illegal move from {start} to {end}")]
    IllegalMove { start: Position, end: Position },

    #[error("move from {start} to {end} would capture a king")]
    KingCapture { start: Position, end: Position },

    #[error("the game is already over")]
    GameOver,

    #[error("promotion is not supported: '{0}'")]
    PromotionUnsupported(String),
}

/// Partial source square taken from the characters before the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Hint {
    file: Option<i8>,
    rank: Option<i8>,
}

impl Hint {
    fn parse(chars: &[char], text: &str) -> Result<Self, NotationError> {
        let invalid = || NotationError::InvalidDisambiguation(text.to_string());
        match *chars {
            [] => Ok(Hint::default()),
            [c] => {
                if let Some(file) = file_from_char(c) {
                    Ok(Hint {
                        file: Some(file),
                        rank: None,
                    })
                } else if let Some(rank) = rank_from_char(c) {
                    Ok(Hint {
                        file: None,
                        rank: Some(rank),
                    })
                } else {
                    Err(invalid())
                }
            }
            [f, r] => Ok(Hint {
                file: Some(file_from_char(f).ok_or_else(invalid)?),
                rank: Some(rank_from_char(r).ok_or_else(invalid)?),
            }),
            _ => Err(invalid()),
        }
    }

    fn exact(self) -> Option<Position> {
        Some(Position::new(self.rank?, self.file?))
    }

    fn admits(self, pos: Position) -> bool {
        self.file.map_or(true, |f| f == pos.file) && self.rank.map_or(true, |r| r == pos.rank)
    }
}

/// Parses `text` against `parent` with no earlier history and default draw
/// thresholds.
pub fn parse(text: &str, parent: &Move) -> Result<Move, NotationError> {
    parse_in(text, parent, std::iter::empty(), &DrawRules::default())
}

/// Parses `text` as the next move after `parent`.
///
/// `earlier` yields the boards played before `parent`'s board, most recent
/// first; it is only read for repetition counting. The returned move has no
/// parent node yet; the game tree assigns one when it records the move.
pub fn parse_in<'a>(
    text: &str,
    parent: &'a Move,
    earlier: impl IntoIterator<Item = &'a Board>,
    rules: &DrawRules,
) -> Result<Move, NotationError> {
    let board = parent.board();
    let body = strip_annotations(text);

    if board.is_terminal() {
        return Err(NotationError::GameOver);
    }
    if body.chars().count() < 2 {
        return Err(NotationError::TooShort(text.to_string()));
    }
    if body.contains('=') {
        return Err(NotationError::PromotionUnsupported(text.to_string()));
    }

    let player = board.to_move();
    let (start, end, capture) = match castle_side(body) {
        Some(side) => {
            let (start, end) = resolve_castle(board, side, player)?;
            (start, end, false)
        }
        None => resolve(board, body, player)?,
    };
    trace!(notation = text, %start, %end, "resolved notation");

    let layout = board.layout();
    if layout
        .piece_at(end)
        .map_or(false, |p| p.kind == PieceKind::King)
    {
        return Err(NotationError::KingCapture { start, end });
    }
    if !movement::is_legal(layout, start, end, player) {
        return Err(NotationError::IllegalMove { start, end });
    }
    let kind =
        movement::classify(layout, start, end).ok_or(NotationError::IllegalMove { start, end })?;
    if capture && layout.piece_at(end).is_none() && kind != MoveKind::EnPassant {
        return Err(NotationError::IllegalMove { start, end });
    }
    let next = board
        .successor(start, end, earlier, rules)
        .ok_or(NotationError::IllegalMove { start, end })?;

    Ok(Move {
        start,
        end,
        player,
        kind,
        notation: text.trim().to_string(),
        parent: None,
        board: next,
    })
}

/// Drops surrounding whitespace, annotation glyphs and check markers.
fn strip_annotations(text: &str) -> &str {
    text.trim()
        .trim_end_matches(|c| matches!(c, '!' | '?' | '+' | '#'))
}

fn castle_side(body: &str) -> Option<CastleSide> {
    match body {
        "O-O" | "0-0" => Some(CastleSide::Kingside),
        "O-O-O" | "0-0-0" => Some(CastleSide::Queenside),
        _ => None,
    }
}

fn resolve_castle(
    board: &Board,
    side: CastleSide,
    player: Color,
) -> Result<(Position, Position), NotationError> {
    if !board.castling().has(player, side) {
        return Err(NotationError::CastlingUnavailable {
            color: player,
            side,
        });
    }
    let rank = player.back_rank();
    Ok((
        Position::new(rank, 4),
        Position::new(rank, side.king_end_file()),
    ))
}

/// Resolves piece notation to (start, end, capture marker present).
fn resolve(
    board: &Board,
    body: &str,
    player: Color,
) -> Result<(Position, Position, bool), NotationError> {
    let mut chars: Vec<char> = body.chars().collect();

    let kind = match chars.first().copied() {
        Some(c) if c.is_ascii_uppercase() => {
            chars.remove(0);
            PieceKind::from_notation_char(c).ok_or(NotationError::UnknownPiece(c))?
        }
        _ => PieceKind::Pawn,
    };

    let capture = chars.contains(&'x');
    chars.retain(|&c| c != 'x');
    if chars.len() < 2 {
        return Err(NotationError::TooShort(body.to_string()));
    }

    let split = chars.len() - 2;
    let end = match (file_from_char(chars[split]), rank_from_char(chars[split + 1])) {
        (Some(file), Some(rank)) => Position::new(rank, file),
        _ => return Err(NotationError::InvalidSquare(body.to_string())),
    };
    let hint = Hint::parse(&chars[..split], body)?;

    let start = if kind == PieceKind::Pawn {
        resolve_pawn(board, end, hint, capture, player, body)?
    } else {
        resolve_piece(board, kind, end, hint, player)?
    };
    Ok((start, end, capture))
}

/// Infers a pawn's source square from its file and the push/capture rules.
fn resolve_pawn(
    board: &Board,
    end: Position,
    hint: Hint,
    capture: bool,
    player: Color,
    body: &str,
) -> Result<Position, NotationError> {
    let dir = player.pawn_direction();
    let file = match hint.file {
        Some(file) => file,
        None if capture => return Err(NotationError::InvalidDisambiguation(body.to_string())),
        None => end.file,
    };
    if capture && file == end.file {
        return Err(NotationError::InvalidDisambiguation(body.to_string()));
    }

    let start = if let Some(rank) = hint.rank {
        Position::new(rank, file)
    } else if file != end.file {
        Position::new(end.rank - dir, file)
    } else {
        let single = Position::new(end.rank - dir, file);
        let double = Position::new(end.rank - 2 * dir, file);
        if board.piece_at(single).is_none() && double.rank == player.pawn_rank() {
            double
        } else {
            single
        }
    };

    let pawn = board
        .piece_at(start)
        .map_or(false, |p| p.kind == PieceKind::Pawn && p.color == player);
    if !pawn {
        trace!(%start, %end, "no pawn on inferred source square");
        return Err(NotationError::Unresolved {
            kind: PieceKind::Pawn,
            end,
            candidates: 0,
        });
    }
    Ok(start)
}

/// Finds the unique piece of `kind` that can reach `end` and fits the hint.
fn resolve_piece(
    board: &Board,
    kind: PieceKind,
    end: Position,
    hint: Hint,
    player: Color,
) -> Result<Position, NotationError> {
    if let Some(start) = hint.exact() {
        let fits = board
            .piece_at(start)
            .map_or(false, |p| p.kind == kind && p.color == player);
        return if fits {
            Ok(start)
        } else {
            Err(NotationError::Unresolved {
                kind,
                end,
                candidates: 0,
            })
        };
    }

    let layout = board.layout();
    let candidates: Vec<Position> = board
        .access_map()
        .matching(layout, end, Some(kind), Some(player))
        .filter(|&start| hint.admits(start))
        // Castling is only reachable through O-O / O-O-O.
        .filter(|&start| kind != PieceKind::King || (end.file - start.file).abs() < 2)
        .collect();
    trace!(%kind, %end, ?candidates, "disambiguation candidates");

    match candidates.as_slice() {
        [start] => Ok(*start),
        _ => Err(NotationError::Unresolved {
            kind,
            end,
            candidates: candidates.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Termination;
    use chess_core::Piece;

    fn sq(s: &str) -> Position {
        Position::from_algebraic(s).unwrap()
    }

    fn root(fen: &str) -> Move {
        Move::root_from_fen(fen).unwrap()
    }

    fn play(mut mv: Move, moves: &[&str]) -> Move {
        for text in moves {
            mv = parse(text, &mv).unwrap_or_else(|e| panic!("{text}: {e}"));
        }
        mv
    }

    #[test]
    fn pawn_pushes() {
        let e4 = parse("e4", &Move::root()).unwrap();
        assert_eq!((e4.start(), e4.end()), (sq("e2"), sq("e4")));
        assert_eq!(e4.kind(), MoveKind::DoublePush);
        assert_eq!(e4.player(), Color::White);
        assert_eq!(e4.board().en_passant_file(), Some(4));

        let e6 = parse("e6", &e4).unwrap();
        assert_eq!((e6.start(), e6.end()), (sq("e7"), sq("e6")));
        assert_eq!(e6.board().en_passant_file(), None);
    }

    #[test]
    fn annotations_are_ignored() {
        let plain = parse("e4", &Move::root()).unwrap();
        let noted = parse("e4!?", &Move::root()).unwrap();
        assert_eq!(plain.board(), noted.board());
        assert_eq!(noted.notation(), "e4!?");
        let nf3 = parse(" Nf3+ ", &Move::root()).unwrap();
        assert_eq!(nf3.start(), sq("g1"));
        assert_eq!(nf3.notation(), "Nf3+");
    }

    #[test]
    fn malformed_input() {
        let root = Move::root();
        assert!(matches!(parse("e", &root), Err(NotationError::TooShort(_))));
        assert!(matches!(parse("!!", &root), Err(NotationError::TooShort(_))));
        assert!(matches!(parse("Nx", &root), Err(NotationError::TooShort(_))));
        assert_eq!(parse("Zf3", &root), Err(NotationError::UnknownPiece('Z')));
        assert!(matches!(
            parse("Nf9", &root),
            Err(NotationError::InvalidSquare(_))
        ));
        assert!(matches!(
            parse("Nzzf3", &root),
            Err(NotationError::InvalidDisambiguation(_))
        ));
        assert!(matches!(
            parse("e8=Q", &root),
            Err(NotationError::PromotionUnsupported(_))
        ));
    }

    #[test]
    fn illegal_moves() {
        let root = Move::root();
        assert!(matches!(
            parse("e5", &root),
            Err(NotationError::Unresolved { .. })
        ));
        assert!(matches!(
            parse("Nd2", &root),
            Err(NotationError::Unresolved { candidates: 0, .. })
        ));
        assert!(matches!(
            parse("exd3", &root),
            Err(NotationError::IllegalMove { .. })
        ));
        assert!(matches!(
            parse("Qd3", &root),
            Err(NotationError::Unresolved { .. })
        ));
    }

    #[test]
    fn disambiguation_by_file_and_rank() {
        let fen = "4k3/8/8/8/8/8/4K3/R6R w - - 0 1";
        assert!(matches!(
            parse("Rf1", &root(fen)),
            Err(NotationError::Unresolved { candidates: 2, .. })
        ));
        let rook = parse("Rhf1", &root(fen)).unwrap();
        assert_eq!(rook.start(), sq("h1"));
        let rook = parse("Rad1", &root(fen)).unwrap();
        assert_eq!(rook.start(), sq("a1"));

        let fen = "4k3/8/8/R7/8/8/8/R3K3 w - - 0 1";
        let rook = parse("R1a3", &root(fen)).unwrap();
        assert_eq!(rook.start(), sq("a1"));
        let rook = parse("R5a3", &root(fen)).unwrap();
        assert_eq!(rook.start(), sq("a5"));
        let rook = parse("Ra5a3", &root(fen)).unwrap();
        assert_eq!(rook.start(), sq("a5"));
    }

    #[test]
    fn pinned_piece_is_not_a_candidate() {
        // The c3 knight is pinned, so only the g1 knight can reach e2.
        let fen = "4k3/8/8/b7/8/2N5/8/4K1N1 w - - 0 1";
        let knight = parse("Ne2", &root(fen)).unwrap();
        assert_eq!(knight.start(), sq("g1"));
    }

    #[test]
    fn scholars_mate_sequence() {
        let mv = play(
            Move::root(),
            &["e4", "e5", "Bc4", "Nc6", "Qh5", "Nf6", "Qxf7#"],
        );
        assert_eq!(mv.board().termination(), Termination::Victory(Color::White));
        assert_eq!(parse("Ke7", &mv), Err(NotationError::GameOver));
    }

    #[test]
    fn capture_only_where_piece_stands() {
        let mv = play(Move::root(), &["e4", "e5", "Qh5", "Nc6"]);
        let taken = parse("Qxe5+", &mv).unwrap();
        assert_eq!(taken.start(), sq("h5"));
        assert_eq!(
            taken.board().piece_at(sq("e5")),
            Some(Piece::new(PieceKind::Queen, Color::White))
        );
        assert!(taken.board().in_check());

        assert!(matches!(
            parse("Qxg6", &mv),
            Err(NotationError::IllegalMove { .. })
        ));
        assert!(parse("Qe2", &mv).is_ok());

        let mv = play(Move::root(), &["e4", "d5", "exd5"]);
        assert_eq!(mv.board().fifty_move_counter(), 0);
        assert!(matches!(
            parse("exd4", &play(Move::root(), &["e4", "e5"])),
            Err(NotationError::Unresolved { .. }) | Err(NotationError::IllegalMove { .. })
        ));
    }

    #[test]
    fn castling_notation() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let short = parse("O-O", &root(fen)).unwrap();
        assert_eq!((short.start(), short.end()), (sq("e1"), sq("g1")));
        assert_eq!(short.kind(), MoveKind::Castle(CastleSide::Kingside));
        assert_eq!(
            short.board().piece_at(sq("f1")),
            Some(Piece::new(PieceKind::Rook, Color::White))
        );
        let long = parse("0-0-0", &root(fen)).unwrap();
        assert_eq!(long.end(), sq("c1"));

        assert!(matches!(
            parse("Kg1", &root(fen)),
            Err(NotationError::Unresolved { .. })
        ));
        assert_eq!(
            parse("O-O", &root("r3k2r/8/8/8/8/8/8/R3K2R w Qkq - 0 1")),
            Err(NotationError::CastlingUnavailable {
                color: Color::White,
                side: CastleSide::Kingside
            })
        );
    }

    #[test]
    fn cannot_castle_into_check() {
        let fen = "r3k2r/8/8/8/8/8/6r1/R3K2R w KQkq - 0 1";
        assert!(matches!(
            parse("O-O", &root(fen)),
            Err(NotationError::IllegalMove { .. })
        ));
    }

    #[test]
    fn king_capture_is_rejected() {
        let fen = "k7/8/8/8/r3K3/8/8/R7 b - - 0 1";
        assert!(matches!(
            parse("Rxe4", &root(fen)),
            Err(NotationError::KingCapture { .. })
        ));
    }

    #[test]
    fn en_passant_notation() {
        let mv = play(
            root("3k4/p1p5/8/3P4/8/8/P7/3K4 b - - - -"),
            &["c5", "dxc6"],
        );
        assert_eq!(mv.kind(), MoveKind::EnPassant);
        assert_eq!(mv.board().piece_at(sq("c5")), None);
        assert_eq!(
            mv.board().piece_at(sq("c6")),
            Some(Piece::new(PieceKind::Pawn, Color::White))
        );
    }

    #[test]
    fn en_passant_expires_after_one_ply() {
        let mv = play(
            root("3k4/p1p5/8/3P4/8/8/P7/3K4 b - - - -"),
            &["c5", "a3", "a6"],
        );
        assert!(parse("dxc6", &mv).is_err());
    }

    #[test]
    fn parsing_is_deterministic() {
        let parent = play(Move::root(), &["d4", "d5", "c4"]);
        let a = parse("dxc4", &parent).unwrap();
        let b = parse("dxc4", &parent).unwrap();
        assert_eq!(a, b);
    }
}
