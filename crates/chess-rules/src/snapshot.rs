//! Serializable views of boards and games.

use crate::board::Board;
use crate::rules::{DrawAvailability, GameResult, Termination};
use crate::tree::PlayerId;
use chess_core::Color;
use serde::{Deserialize, Serialize};

/// Read-only rendering of a [`Board`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub fen: String,
    /// Ranks from 8 down to 1, each a string of FEN piece letters with `.`
    /// for empty squares.
    pub grid: Vec<String>,
    pub to_move: Color,
    /// FEN castling field, `-` if none.
    pub castling: String,
    pub en_passant_file: Option<char>,
    pub ply: u32,
    pub fifty_move_counter: u32,
    pub termination: Termination,
    pub draws: DrawAvailability,
    pub in_check: bool,
}

impl From<&Board> for BoardSnapshot {
    fn from(board: &Board) -> Self {
        let grid = board
            .squares()
            .iter()
            .rev()
            .map(|rank| {
                rank.iter()
                    .map(|square| square.map_or('.', |piece| piece.to_fen_char()))
                    .collect()
            })
            .collect();
        BoardSnapshot {
            fen: board.to_fen(),
            grid,
            to_move: board.to_move(),
            castling: board.castling().to_string(),
            en_passant_file: board.en_passant_file().map(chess_core::file_to_char),
            ply: board.ply(),
            fifty_move_counter: board.fifty_move_counter(),
            termination: board.termination(),
            draws: board.draws(),
            in_check: board.in_check(),
        }
    }
}

/// Read-only rendering of a game and its current position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: usize,
    pub white: PlayerId,
    pub black: PlayerId,
    pub result: Option<GameResult>,
    /// Notation from the first move to the current position.
    pub moves: Vec<String>,
    pub board: BoardSnapshot,
}
