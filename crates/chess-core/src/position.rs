//! Board coordinates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A square on the board addressed by rank and file.
///
/// Both components are signed so that offsets can step off the board without
/// wrapping; [`Position::is_valid`] tells whether a position may index a board.
/// Rank 0 is White's back rank, file 0 is the a-file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub rank: i8,
    pub file: i8,
}

impl Position {
    /// Sentinel for a coordinate pair that has not been resolved.
    pub const UNSET: Position = Position::new(-1, -1);

    #[inline]
    pub const fn new(rank: i8, file: i8) -> Self {
        Position { rank, file }
    }

    /// Returns true if both components lie in `0..8`.
    #[inline]
    pub const fn is_valid(self) -> bool {
        0 <= self.rank && self.rank < 8 && 0 <= self.file && self.file < 8
    }

    /// Returns the position shifted by the given deltas, if it stays on the board.
    #[inline]
    pub const fn offset(self, d_rank: i8, d_file: i8) -> Option<Self> {
        let next = Position::new(self.rank + d_rank, self.file + d_file);
        if next.is_valid() {
            Some(next)
        } else {
            None
        }
    }

    /// Iterates every square of the board, rank by rank starting from a1.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..8).flat_map(|rank| (0..8).map(move |file| Position::new(rank, file)))
    }

    /// Returns the 0-63 index of this square (a1 = 0, h8 = 63).
    ///
    /// Only meaningful for valid positions.
    #[inline]
    pub const fn index(self) -> usize {
        (self.rank as usize) * 8 + self.file as usize
    }

    /// Builds a position from a 0-63 index.
    #[inline]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < 64 {
            Some(Position::new((index / 8) as i8, (index % 8) as i8))
        } else {
            None
        }
    }

    /// Parses a square from algebraic notation (e.g., "e4").
    pub fn from_algebraic(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let file = file_from_char(chars.next()?)?;
        let rank = rank_from_char(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Some(Position::new(rank, file))
    }

    /// Returns the algebraic notation for this square.
    pub fn to_algebraic(self) -> String {
        format!("{}{}", file_to_char(self.file), (b'1' + self.rank as u8) as char)
    }
}

/// Parses a file letter (`a`-`h`) into its index.
#[inline]
pub const fn file_from_char(c: char) -> Option<i8> {
    match c {
        'a'..='h' => Some((c as u8 - b'a') as i8),
        _ => None,
    }
}

/// Parses a rank digit (`1`-`8`) into its index.
#[inline]
pub const fn rank_from_char(c: char) -> Option<i8> {
    match c {
        '1'..='8' => Some((c as u8 - b'1') as i8),
        _ => None,
    }
}

/// Returns the letter for a file index.
#[inline]
pub const fn file_to_char(file: i8) -> char {
    (b'a' + file as u8) as char
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Position({})", self.to_algebraic())
        } else {
            write!(f, "Position(rank {}, file {})", self.rank, self.file)
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_algebraic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_from_algebraic() {
        assert_eq!(Position::from_algebraic("a1"), Some(Position::new(0, 0)));
        assert_eq!(Position::from_algebraic("e4"), Some(Position::new(3, 4)));
        assert_eq!(Position::from_algebraic("h8"), Some(Position::new(7, 7)));
        assert_eq!(Position::from_algebraic("i1"), None);
        assert_eq!(Position::from_algebraic("a9"), None);
        assert_eq!(Position::from_algebraic("a10"), None);
        assert_eq!(Position::from_algebraic(""), None);
    }

    #[test]
    fn position_to_algebraic() {
        assert_eq!(Position::new(0, 0).to_algebraic(), "a1");
        assert_eq!(Position::new(7, 7).to_algebraic(), "h8");
        assert_eq!(Position::new(3, 4).to_string(), "e4");
    }

    #[test]
    fn offsets_stay_on_board() {
        let a1 = Position::new(0, 0);
        assert_eq!(a1.offset(1, 1), Some(Position::new(1, 1)));
        assert_eq!(a1.offset(-1, 0), None);
        assert_eq!(Position::new(7, 7).offset(0, 1), None);
    }

    #[test]
    fn validity() {
        assert!(Position::new(0, 7).is_valid());
        assert!(!Position::new(8, 0).is_valid());
        assert!(!Position::new(0, -1).is_valid());
    }

    #[test]
    fn index_roundtrip() {
        for pos in Position::all() {
            assert_eq!(Position::from_index(pos.index()), Some(pos));
        }
        assert_eq!(Position::all().count(), 64);
        assert_eq!(Position::from_index(64), None);
    }

    #[test]
    fn debug_format() {
        assert_eq!(format!("{:?}", Position::new(3, 4)), "Position(e4)");
        assert_eq!(
            format!("{:?}", Position::new(-1, 2)),
            "Position(rank -1, file 2)"
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn offset_never_leaves_board(
                rank in 0i8..8,
                file in 0i8..8,
                dr in -8i8..=8,
                df in -8i8..=8,
            ) {
                let start = Position::new(rank, file);
                match start.offset(dr, df) {
                    Some(next) => {
                        prop_assert!(next.is_valid());
                        prop_assert_eq!(next.rank - start.rank, dr);
                    }
                    None => prop_assert!(!Position::new(rank + dr, file + df).is_valid()),
                }
            }
        }
    }
}
