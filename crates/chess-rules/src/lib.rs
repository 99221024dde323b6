//! Chess rules engine.
//!
//! Validates moves written in algebraic notation and records them in a
//! branching [`GameTree`] shared by any number of games.
//!
//! - [`Board`] is an immutable position with its [`AccessMap`] and derived
//!   check, termination and draw flags
//! - [`movement`] decides whether a single piece may move between two squares
//! - [`detect`] classifies check, checkmate and stalemate
//! - [`notation`] resolves text like `Nbd7` or `O-O` to a concrete move
//! - [`GameTree`] stores moves in an append-only arena and deduplicates
//!   equivalent moves from the same position
//!
//! # Example
//!
//! ```
//! use chess_rules::GameTree;
//!
//! let mut tree = GameTree::new();
//! let game = tree.new_game(1, 2).unwrap();
//! tree.make_move(game, "e4").unwrap();
//! tree.make_move(game, "e5").unwrap();
//! let board = tree.make_move(game, "Nf3").unwrap();
//! assert_eq!(board.ply(), 3);
//! assert!(tree.make_move(game, "Ke3").is_err());
//! ```

mod access;
mod board;
mod config;
pub mod detect;
mod mov;
pub mod movement;
pub mod notation;
mod pgn;
mod rules;
mod snapshot;
mod tree;

pub use access::AccessMap;
pub use board::{Board, BoardError, Layout};
pub use config::{ConfigError, EngineConfig, Limits};
pub use mov::Move;
pub use notation::NotationError;
pub use pgn::{Pgn, PgnError};
pub use rules::{DrawAvailability, DrawReason, DrawRules, GameResult, Termination};
pub use snapshot::{BoardSnapshot, GameSnapshot};
pub use tree::{Game, GameId, GameTree, Lineage, NodeId, PlayerId, StateNode, TreeError};

pub use chess_core;
