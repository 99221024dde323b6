//! Game outcomes and draw thresholds.

use chess_core::Color;
use serde::{Deserialize, Serialize};

/// Termination state recorded on a board.
///
/// Only outcomes that follow from the position itself live here; resignation
/// and agreed draws are recorded on the [`Game`](crate::Game) as a [`GameResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The side to move has at least one legal move.
    #[default]
    InProgress,
    /// The side to move is checkmated; the color given won.
    Victory(Color),
    /// The side to move has no legal move and is not in check.
    Stalemate,
}

impl Termination {
    /// Returns true if no further move can be played.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Termination::InProgress)
    }
}

/// Draws a player may claim in the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DrawAvailability {
    /// The fifty-move counter reached its threshold.
    pub fifty_move: bool,
    /// The position occurred often enough for a repetition claim.
    pub threefold: bool,
}

impl DrawAvailability {
    /// Returns true if any draw can be claimed.
    #[inline]
    pub const fn any(self) -> bool {
        self.fifty_move || self.threefold
    }
}

/// Voluntary result of a game, recorded on the game rather than the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    /// The given color resigned.
    Resignation(Color),
    /// Draw with a specific reason.
    Draw(DrawReason),
}

impl GameResult {
    /// Returns the winning color, if there is one.
    pub const fn winner(self) -> Option<Color> {
        match self {
            GameResult::Resignation(loser) => Some(loser.opposite()),
            GameResult::Draw(_) => None,
        }
    }
}

/// Reason for a recorded draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    /// Both players agreed.
    Agreement,
    /// Claimed under the fifty-move rule.
    FiftyMoveRule,
    /// Claimed on repetition of position.
    ThreefoldRepetition,
}

/// Thresholds for the claimable draw flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawRules {
    /// Half-moves without a pawn move or capture before the fifty-move flag is set.
    pub fifty_move_plies: u32,
    /// Equivalent occurrences (current one included) needed for the repetition flag.
    pub repetition_count: usize,
}

impl Default for DrawRules {
    fn default() -> Self {
        DrawRules {
            fifty_move_plies: 100,
            repetition_count: 3,
        }
    }
}
