//! Branching store of every position reached by every game.
//!
//! Nodes live in an append-only arena addressed by [`NodeId`]; a node's parent
//! is an index, so a parent always outlives its children. Games point at the
//! node of their current position and are the only thing that moves.
//!
//! All mutation goes through `&mut GameTree`. A rejected operation returns an
//! error before touching the arena, so no partial state is ever visible.

use crate::board::{Board, BoardError};
use crate::config::EngineConfig;
use crate::mov::Move;
use crate::notation::{self, NotationError};
use crate::pgn::{Pgn, PgnError};
use crate::rules::{DrawReason, GameResult};
use crate::snapshot::{BoardSnapshot, GameSnapshot};
use chess_core::Color;
use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

/// Opaque identifier of a player, supplied by the caller.
pub type PlayerId = u64;

/// Index of a node in the tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Index of a game in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(usize);

impl GameId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Errors from game tree operations. None of them change the tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error(transparent)]
    Notation(#[from] NotationError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Pgn(#[from] PgnError),

    /// A ply of a bulk load failed; nothing from the load was recorded.
    #[error("ply {index} ({text}) rejected: {source}")]
    Replay {
        index: usize,
        text: String,
        #[source]
        source: NotationError,
    },

    #[error("unknown game {0}")]
    UnknownGame(GameId),

    #[error("player {player} does not hold the {expected} pieces in game {game}")]
    WrongPlayer {
        game: GameId,
        player: PlayerId,
        expected: Color,
    },

    #[error("game {0} is already over")]
    GameOver(GameId),

    #[error("no draw can be claimed in game {0}")]
    CannotClaimDraw(GameId),

    #[error("{what} limit of {limit} reached")]
    CapacityExceeded { what: &'static str, limit: usize },

    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
}

/// A move and the children played from it.
#[derive(Debug, Clone)]
pub struct StateNode {
    mv: Move,
    children: Vec<NodeId>,
}

impl StateNode {
    #[inline]
    pub fn mv(&self) -> &Move {
        &self.mv
    }

    #[inline]
    pub fn board(&self) -> &Board {
        self.mv.board()
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.mv.parent()
    }

    /// Children in insertion order.
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A game between two players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    id: GameId,
    white: PlayerId,
    black: PlayerId,
    current: NodeId,
    result: Option<GameResult>,
}

impl Game {
    #[inline]
    pub fn id(&self) -> GameId {
        self.id
    }

    #[inline]
    pub fn white(&self) -> PlayerId {
        self.white
    }

    #[inline]
    pub fn black(&self) -> PlayerId {
        self.black
    }

    /// The player holding `color`.
    #[inline]
    pub fn player(&self, color: Color) -> PlayerId {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }

    /// Node of the current position.
    #[inline]
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Voluntary result (resignation or draw), if one was recorded.
    #[inline]
    pub fn result(&self) -> Option<GameResult> {
        self.result
    }
}

/// Iterator from a node up to its root.
#[derive(Clone)]
pub struct Lineage<'a> {
    tree: &'a GameTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Lineage<'a> {
    type Item = (NodeId, &'a StateNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.tree.nodes.get(id.0)?;
        self.next = node.parent();
        Some((id, node))
    }
}

/// The arena of nodes plus every game played over it.
#[derive(Debug, Clone)]
pub struct GameTree {
    nodes: Vec<StateNode>,
    games: Vec<Game>,
    config: EngineConfig,
}

impl Default for GameTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GameTree {
    /// The node of the shared standard starting position.
    pub const ROOT: NodeId = NodeId(0);

    /// Creates a tree with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates a tree whose boards use the given draw thresholds and limits.
    pub fn with_config(config: EngineConfig) -> Self {
        let root = Move::root();
        GameTree {
            nodes: vec![StateNode {
                mv: root,
                children: Vec::new(),
            }],
            games: Vec::new(),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of nodes in the arena, roots included.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn game_count(&self) -> usize {
        self.games.len()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&StateNode> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub fn get_game(&self, id: GameId) -> Option<&Game> {
        self.games.get(id.0)
    }

    fn game(&self, id: GameId) -> Result<&Game, TreeError> {
        self.games.get(id.0).ok_or(TreeError::UnknownGame(id))
    }

    fn game_mut(&mut self, id: GameId) -> Result<&mut Game, TreeError> {
        self.games.get_mut(id.0).ok_or(TreeError::UnknownGame(id))
    }

    fn node_at(&self, id: NodeId) -> &StateNode {
        &self.nodes[id.0]
    }

    /// The board of a game's current position.
    pub fn board(&self, game: GameId) -> Result<&Board, TreeError> {
        let current = self.game(game)?.current;
        Ok(self.node_at(current).board())
    }

    /// Walks from `node` to its root, `node` first.
    pub fn lineage(&self, node: NodeId) -> Lineage<'_> {
        Lineage {
            tree: self,
            next: self.node(node).map(|_| node),
        }
    }

    /// Boards strictly before `node`, most recent first.
    fn earlier_boards(&self, node: NodeId) -> impl Iterator<Item = &Board> + Clone + '_ {
        self.lineage(node).skip(1).map(|(_, n)| n.board())
    }

    /// Notation of every move from the root to the game's current position.
    pub fn history(&self, game: GameId) -> Result<Vec<String>, TreeError> {
        let current = self.game(game)?.current;
        let mut moves: Vec<String> = self
            .lineage(current)
            .filter(|(_, node)| !node.mv.is_root())
            .map(|(_, node)| node.mv.notation().to_string())
            .collect();
        moves.reverse();
        Ok(moves)
    }

    fn ensure_node_room(&mut self, additional: usize) -> Result<(), TreeError> {
        if let Some(limit) = self.config.limits.max_nodes {
            if self.nodes.len() + additional > limit {
                return Err(TreeError::CapacityExceeded {
                    what: "node",
                    limit,
                });
            }
        }
        self.nodes.try_reserve(additional)?;
        Ok(())
    }

    fn ensure_game_room(&mut self) -> Result<(), TreeError> {
        if let Some(limit) = self.config.limits.max_games {
            if self.games.len() >= limit {
                return Err(TreeError::CapacityExceeded {
                    what: "game",
                    limit,
                });
            }
        }
        self.games.try_reserve(1)?;
        Ok(())
    }

    fn push_game(&mut self, white: PlayerId, black: PlayerId, current: NodeId) -> GameId {
        let id = GameId(self.games.len());
        self.games.push(Game {
            id,
            white,
            black,
            current,
            result: None,
        });
        id
    }

    /// Starts a game at the shared initial position.
    pub fn new_game(&mut self, white: PlayerId, black: PlayerId) -> Result<GameId, TreeError> {
        self.ensure_game_room()?;
        let id = self.push_game(white, black, Self::ROOT);
        info!(game = %id, white, black, "new game");
        Ok(id)
    }

    /// Starts a game from a FEN position. The position gets its own root.
    pub fn new_game_from_fen(
        &mut self,
        white: PlayerId,
        black: PlayerId,
        fen: &str,
    ) -> Result<GameId, TreeError> {
        let root = Move::root_from_fen_with(fen, &self.config.draw)?;
        self.ensure_game_room()?;
        self.ensure_node_room(1)?;
        let node = NodeId(self.nodes.len());
        self.nodes.push(StateNode {
            mv: root,
            children: Vec::new(),
        });
        let id = self.push_game(white, black, node);
        info!(game = %id, white, black, fen, "new game from FEN");
        Ok(id)
    }

    /// Plays `text` for whichever side is to move.
    ///
    /// Returns the board of the new position. On error the game and the tree
    /// are unchanged.
    pub fn make_move(&mut self, game: GameId, text: &str) -> Result<&Board, TreeError> {
        let node = self.advance(game, text)?;
        Ok(self.node_at(node).board())
    }

    /// Plays `text` on behalf of `player`, who must hold the side to move.
    pub fn make_move_as(
        &mut self,
        game: GameId,
        player: PlayerId,
        text: &str,
    ) -> Result<&Board, TreeError> {
        let g = self.game(game)?;
        let expected = self.node_at(g.current).board().to_move();
        if g.player(expected) != player {
            debug!(game = %game, player, %expected, "move from wrong player");
            return Err(TreeError::WrongPlayer {
                game,
                player,
                expected,
            });
        }
        self.make_move(game, text)
    }

    fn advance(&mut self, game: GameId, text: &str) -> Result<NodeId, TreeError> {
        let g = self.game(game)?;
        if g.result.is_some() {
            return Err(TreeError::GameOver(game));
        }
        let current = g.current;

        let parsed = notation::parse_in(
            text,
            self.node_at(current).mv(),
            self.earlier_boards(current),
            &self.config.draw,
        );
        let mv = match parsed {
            Ok(mv) => mv,
            Err(err) => {
                debug!(game = %game, notation = text, error = %err, "move rejected");
                return Err(err.into());
            }
        };

        let (next, reused) = self.attach(current, mv)?;
        self.game_mut(game)?.current = next;
        debug!(
            game = %game,
            notation = text,
            ply = self.node_at(next).board().ply(),
            node = %next,
            reused,
            "move accepted"
        );
        Ok(next)
    }

    /// Returns the existing child of `parent` with the same squares, or
    /// appends `mv` as a new child.
    fn attach(&mut self, parent: NodeId, mut mv: Move) -> Result<(NodeId, bool), TreeError> {
        if let Some(existing) = self.find_child(parent, &mv) {
            return Ok((existing, true));
        }
        self.ensure_node_room(1)?;
        self.nodes[parent.0].children.try_reserve(1)?;
        let id = NodeId(self.nodes.len());
        mv.parent = Some(parent);
        self.nodes.push(StateNode {
            mv,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        Ok((id, false))
    }

    fn find_child(&self, parent: NodeId, mv: &Move) -> Option<NodeId> {
        self.node_at(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.node_at(child).mv.same_squares(mv))
    }

    /// Returns the game if it still accepts moves and results.
    fn ongoing(&self, game: GameId) -> Result<&Game, TreeError> {
        let g = self.game(game)?;
        if g.result.is_some() || self.node_at(g.current).board().is_terminal() {
            return Err(TreeError::GameOver(game));
        }
        Ok(g)
    }

    /// Records that `player` resigned.
    pub fn resign(&mut self, game: GameId, player: PlayerId) -> Result<GameResult, TreeError> {
        let g = self.ongoing(game)?;
        let color = if g.white == player {
            Color::White
        } else if g.black == player {
            Color::Black
        } else {
            return Err(TreeError::WrongPlayer {
                game,
                player,
                expected: self.node_at(g.current).board().to_move(),
            });
        };
        let result = GameResult::Resignation(color);
        self.game_mut(game)?.result = Some(result);
        info!(game = %game, %color, "resignation");
        Ok(result)
    }

    /// Records a draw both players agreed to.
    pub fn agree_draw(&mut self, game: GameId) -> Result<GameResult, TreeError> {
        self.ongoing(game)?;
        let result = GameResult::Draw(DrawReason::Agreement);
        self.game_mut(game)?.result = Some(result);
        info!(game = %game, "draw agreed");
        Ok(result)
    }

    /// Records a draw claimed under the fifty-move or repetition rule.
    pub fn claim_draw(&mut self, game: GameId) -> Result<GameResult, TreeError> {
        let g = self.ongoing(game)?;
        let draws = self.node_at(g.current).board().draws();
        if !draws.any() {
            return Err(TreeError::CannotClaimDraw(game));
        }
        let reason = if draws.fifty_move {
            DrawReason::FiftyMoveRule
        } else {
            DrawReason::ThreefoldRepetition
        };
        let result = GameResult::Draw(reason);
        self.game_mut(game)?.result = Some(result);
        info!(game = %game, ?reason, "draw claimed");
        Ok(result)
    }

    /// Starts a game and replays `moves` from the initial position.
    ///
    /// Every ply is parsed before the tree is touched; if any ply fails, no
    /// game is created and no node is added.
    pub fn new_game_from_moves<I, S>(
        &mut self,
        white: PlayerId,
        black: PlayerId,
        moves: I,
    ) -> Result<GameId, TreeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let plies = self.replay(Self::ROOT, moves)?;
        self.ensure_game_room()?;
        let reused = self.reused_prefix(Self::ROOT, &plies);
        let fresh = plies.len() - reused;
        self.ensure_node_room(fresh)?;

        let count = plies.len();
        let mut current = Self::ROOT;
        for mv in plies {
            current = self.attach(current, mv)?.0;
        }
        let id = self.push_game(white, black, current);
        info!(game = %id, plies = count, new_nodes = fresh, "game loaded");
        Ok(id)
    }

    /// Starts a game from PGN text.
    ///
    /// A `FEN` tag, when present, sets the starting position.
    pub fn new_game_from_pgn(
        &mut self,
        white: PlayerId,
        black: PlayerId,
        text: &str,
    ) -> Result<GameId, TreeError> {
        let pgn = Pgn::parse(text)?;
        match pgn.tag("FEN") {
            None => self.new_game_from_moves(white, black, &pgn.moves),
            Some(fen) => {
                let root = Move::root_from_fen_with(fen, &self.config.draw)?;
                let plies = replay_from(&root, std::iter::empty(), &pgn.moves, &self.config)?;
                self.ensure_game_room()?;
                self.ensure_node_room(plies.len() + 1)?;

                let count = plies.len();
                let mut current = NodeId(self.nodes.len());
                self.nodes.push(StateNode {
                    mv: root,
                    children: Vec::new(),
                });
                for mv in plies {
                    current = self.attach(current, mv)?.0;
                }
                let id = self.push_game(white, black, current);
                info!(game = %id, plies = count, fen, "game loaded from FEN");
                Ok(id)
            }
        }
    }

    /// Parses every ply against a scratch lineage starting at `from`.
    fn replay<I, S>(&self, from: NodeId, moves: I) -> Result<Vec<Move>, TreeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        replay_from(
            self.node_at(from).mv(),
            self.earlier_boards(from),
            moves,
            &self.config,
        )
    }

    /// Number of leading plies already present as children along the path.
    fn reused_prefix(&self, from: NodeId, plies: &[Move]) -> usize {
        let mut current = from;
        for (i, mv) in plies.iter().enumerate() {
            match self.find_child(current, mv) {
                Some(child) => current = child,
                None => return i,
            }
        }
        plies.len()
    }

    /// Serializable view of a game.
    pub fn snapshot(&self, game: GameId) -> Result<GameSnapshot, TreeError> {
        let g = self.game(game)?;
        Ok(GameSnapshot {
            id: g.id.0,
            white: g.white,
            black: g.black,
            result: g.result,
            moves: self.history(game)?,
            board: BoardSnapshot::from(self.node_at(g.current).board()),
        })
    }
}

/// Parses `moves` one after another starting from `root`.
///
/// `earlier` yields the boards before `root`'s board, most recent first.
fn replay_from<'a, I, S>(
    root: &'a Move,
    earlier: impl Iterator<Item = &'a Board> + Clone,
    moves: I,
    config: &EngineConfig,
) -> Result<Vec<Move>, TreeError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let moves = moves.into_iter();
    let mut plies: Vec<Move> = Vec::new();
    plies.try_reserve(moves.size_hint().0)?;

    for (index, text) in moves.enumerate() {
        let text = text.as_ref();
        let parsed = {
            let parent = plies.last().unwrap_or(root);
            let before_parent = plies
                .iter()
                .rev()
                .skip(1)
                .map(Move::board)
                .chain(plies.first().map(|_| root.board()))
                .chain(earlier.clone().map(|board| board));
            notation::parse_in(text, parent, before_parent, &config.draw)
        };
        match parsed {
            Ok(mv) => {
                plies.try_reserve(1)?;
                plies.push(mv);
            }
            Err(source) => {
                debug!(ply = index, notation = text, error = %source, "replay rejected");
                return Err(TreeError::Replay {
                    index,
                    text: text.to_string(),
                    source,
                });
            }
        }
    }
    Ok(plies)
}
