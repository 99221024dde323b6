//! Core types for chess.
//!
//! This crate provides the value types shared by the rules engine:
//! - [`Piece`], [`PieceKind`] and [`Color`] for piece representation
//! - [`Position`] for board coordinates
//! - [`CastlingRights`] and [`CastleSide`]
//! - [`MoveKind`] for classifying a step
//! - FEN field parsing

mod castling;
mod color;
mod fen;
mod mov;
mod piece;
mod position;

pub use castling::{CastleSide, CastlingRights};
pub use color::Color;
pub use fen::{placement_to_fen, FenError, FenParser, Placement};
pub use mov::MoveKind;
pub use piece::{Piece, PieceKind};
pub use position::{file_from_char, file_to_char, rank_from_char, Position};
