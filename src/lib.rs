//! # Connect 4 MCTS Engine
//!
//! Monte Carlo Tree Search with RAVE for Connect 4, built on a board engine
//! that tracks winning cells incrementally.
//!
//! ## Modules
//! - [`games::connect4`]: board engine, fingerprints, clever move filter
//! - [`turn`]: cyclic turn order
//! - [`tree`]: fingerprint-keyed node statistics
//! - [`search`]: the four-phase search loop
//! - [`evaluator`]: priors and value estimates
//! - [`players`]: random, MCTS and epsilon-greedy players
//! - [`config`]: difficulty profiles and TOML loading
//! - [`game_controller`]: authoritative games and series
//!
//! ## Example
//! ```
//! use mcts::{Connect4State, Difficulty, Mcts};
//!
//! let game = Connect4State::new();
//! let config = Difficulty::Normal.config().with_max_count(200);
//! let mut mcts = Mcts::with_seed(config, 7);
//! let result = mcts.search(&game);
//! assert!(result.action < 7);
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod game_controller;
pub mod games;
pub mod logging;
pub mod players;
pub mod search;
pub mod tree;
pub mod turn;

pub use config::{AppConfig, Difficulty, MctsConfig};
pub use error::{BoardError, ConfigError, MoveValidationError, ParseMoveError};
pub use evaluator::{Evaluation, Evaluator, QModel, QModelEvaluator, UniformEvaluator};
pub use game_controller::{GameController, GameRecord, SeriesTally};
pub use games::connect4::{Connect4Move, Connect4State, Fingerprint, GameStatus};
pub use players::{Decision, EpsilonGreedyPlayer, MctsPlayer, Player, RandomPlayer};
pub use search::{Mcts, SearchResult, SearchStats};
pub use tree::{Node, PrincipalVariation, Tree};
pub use turn::TurnSequencer;
