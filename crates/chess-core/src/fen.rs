//! FEN (Forsyth-Edwards Notation) field reader.
//!
//! The reader is deliberately tolerant about the trailing fields: en passant,
//! halfmove clock and fullmove number may each be `-`, and the two counters
//! may be omitted entirely.

use crate::{CastlingRights, Color, Piece, Position};
use thiserror::Error;

/// Piece placement grid indexed as `[rank][file]`.
pub type Placement = [[Option<Piece>; 8]; 8];

/// Errors that can occur when parsing FEN strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("invalid FEN: expected 4 to 6 fields, got {0}")]
    InvalidPartCount(usize),

    #[error("invalid piece placement: {0}")]
    InvalidPiecePlacement(String),

    #[error("invalid active color: expected 'w' or 'b', got '{0}'")]
    InvalidActiveColor(String),

    #[error("invalid castling rights: {0}")]
    InvalidCastlingRights(String),

    #[error("invalid en passant square: {0}")]
    InvalidEnPassantSquare(String),

    #[error("invalid halfmove clock: {0}")]
    InvalidHalfmoveClock(String),

    #[error("invalid fullmove number: {0}")]
    InvalidFullmoveNumber(String),
}

/// Parsed FEN data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenParser {
    /// Pieces by `[rank][file]`, rank 0 being White's back rank.
    pub placement: Placement,
    /// The side to move.
    pub active_color: Color,
    /// Castling availability.
    pub castling: CastlingRights,
    /// En passant target square, if any.
    pub en_passant: Option<Position>,
    /// Halfmove clock for the fifty-move rule, if recorded.
    pub halfmove_clock: Option<u32>,
    /// Fullmove number, if recorded.
    pub fullmove_number: Option<u32>,
}

impl FenParser {
    /// The standard starting position FEN.
    pub const STARTPOS: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Parses a FEN string.
    pub fn parse(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if !(4..=6).contains(&parts.len()) {
            return Err(FenError::InvalidPartCount(parts.len()));
        }

        let placement = Self::parse_placement(parts[0])?;

        let active_color = match parts[1].chars().collect::<Vec<_>>().as_slice() {
            [c] => Color::from_fen_char(*c),
            _ => None,
        }
        .ok_or_else(|| FenError::InvalidActiveColor(parts[1].to_string()))?;

        let castling = CastlingRights::from_fen(parts[2])
            .ok_or_else(|| FenError::InvalidCastlingRights(parts[2].to_string()))?;

        let en_passant = Self::parse_en_passant(parts[3])?;

        let halfmove_clock = Self::parse_counter(parts.get(4).copied())
            .map_err(FenError::InvalidHalfmoveClock)?;
        let fullmove_number = Self::parse_counter(parts.get(5).copied())
            .map_err(FenError::InvalidFullmoveNumber)?;

        Ok(FenParser {
            placement,
            active_color,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        })
    }

    fn parse_placement(field: &str) -> Result<Placement, FenError> {
        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::InvalidPiecePlacement(format!(
                "expected 8 ranks, got {}",
                ranks.len()
            )));
        }

        let mut placement: Placement = [[None; 8]; 8];
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10).filter(|d| (1..=8).contains(d)) {
                    file += skip as usize;
                } else if let Some(piece) = Piece::from_fen_char(c) {
                    if file < 8 {
                        placement[rank][file] = Some(piece);
                    }
                    file += 1;
                } else {
                    return Err(FenError::InvalidPiecePlacement(format!(
                        "invalid character '{}' in rank {}",
                        c,
                        rank + 1
                    )));
                }
            }
            if file != 8 {
                return Err(FenError::InvalidPiecePlacement(format!(
                    "rank {} has {} squares, expected 8",
                    rank + 1,
                    file
                )));
            }
        }

        Ok(placement)
    }

    fn parse_en_passant(field: &str) -> Result<Option<Position>, FenError> {
        if field == "-" {
            return Ok(None);
        }
        let square = Position::from_algebraic(field)
            .filter(|sq| sq.rank == 2 || sq.rank == 5)
            .ok_or_else(|| FenError::InvalidEnPassantSquare(field.to_string()))?;
        Ok(Some(square))
    }

    fn parse_counter(field: Option<&str>) -> Result<Option<u32>, String> {
        match field {
            None | Some("-") => Ok(None),
            Some(s) => s.parse::<u32>().map(Some).map_err(|_| s.to_string()),
        }
    }

    /// Returns the en passant file, if any.
    pub fn en_passant_file(&self) -> Option<i8> {
        self.en_passant.map(|sq| sq.file)
    }
}

/// Formats a placement grid as the first FEN field.
pub fn placement_to_fen(placement: &Placement) -> String {
    let mut fen = String::new();
    for rank in (0..8).rev() {
        let mut empty_count = 0;
        for square in &placement[rank] {
            match square {
                Some(piece) => {
                    if empty_count > 0 {
                        fen.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    fen.push(piece.to_fen_char());
                }
                None => empty_count += 1,
            }
        }
        if empty_count > 0 {
            fen.push_str(&empty_count.to_string());
        }
        if rank > 0 {
            fen.push('/');
        }
    }
    fen
}
