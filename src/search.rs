//! # Monte Carlo Tree Search Engine
//!
//! Runs `max_count` simulations from a cloned copy of the position. Each
//! simulation has four phases:
//!
//! 1. **Selection**: walk stored nodes with UCB1 (optionally RAVE-blended),
//!    maximizing on the searching player's turns and minimizing on the
//!    opponent's, for at most `max_depth + 1` nodes.
//! 2. **Expansion**: the first unknown position gets a node whose actions
//!    are the clever actions and whose priors come from the evaluator.
//! 3. **Simulation**: the rollout player plays clever actions to the end.
//! 4. **Backpropagation**: the reward, seen by the searching player, updates
//!    every visited node along with the AMAF statistics.
//!
//! The final move is the root action with the highest mean reward.

use crate::config::MctsConfig;
use crate::evaluator::{Evaluator, UniformEvaluator};
use crate::games::connect4::{Connect4State, Fingerprint};
use crate::players::{Player, RandomPlayer};
use crate::tree::Tree;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Prior sums at or below this fall back to uniform priors
const PRIOR_EPSILON: f64 = 1e-12;

/// Statistics of one search call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchStats {
    pub simulations: u32,
    /// Positions stored in the tree after the search
    pub tree_size: usize,
    pub elapsed: Duration,
}

impl SearchStats {
    pub fn simulations_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.simulations as f64 / secs
        } else {
            0.0
        }
    }
}

/// Outcome of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Root action with the highest mean reward
    pub action: usize,
    /// Mean reward of that action for the searching player
    pub winning_probability: f64,
    pub stats: SearchStats,
}

/// Single-threaded MCTS engine with a persistent tree.
///
/// The evaluator and the rollout player are injected; the rollout player
/// can itself be an MCTS player.
pub struct Mcts {
    config: MctsConfig,
    evaluator: Box<dyn Evaluator>,
    rollout: Box<dyn Player>,
    tree: Tree,
    /// Player whose point of view the stored rewards take
    side: Option<i32>,
}

impl Mcts {
    pub fn new(config: MctsConfig, evaluator: Box<dyn Evaluator>, rollout: Box<dyn Player>) -> Self {
        Self {
            config,
            evaluator,
            rollout,
            tree: Tree::new(),
            side: None,
        }
    }

    /// Uniform evaluator and random rollouts seeded with `seed`.
    pub fn with_seed(config: MctsConfig, seed: u64) -> Self {
        Self::new(
            config,
            Box::new(UniformEvaluator::new()),
            Box::new(RandomPlayer::with_seed(seed)),
        )
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Drops all statistics, and resets the rollout player.
    pub fn reset(&mut self) {
        self.tree.clear();
        self.rollout.reset();
        self.side = None;
    }

    /// Searches `state` for the player to move.
    ///
    /// Without `reuse_tree` the tree is cleared first; otherwise statistics
    /// from earlier searches of the same side are kept. Rewards are stored
    /// for the searching player, so a search for the other side always
    /// starts from an empty tree.
    ///
    /// # Panics
    /// Panics if `state` is already terminal or `max_count` is zero.
    pub fn search(&mut self, state: &Connect4State) -> SearchResult {
        assert!(!state.is_terminal(), "cannot search a finished game");
        assert!(self.config.max_count > 0, "max_count must be at least 1");

        let root_player = state.current_player();
        if self.side != Some(root_player) {
            if self.side.is_some() && !self.tree.is_empty() {
                debug!(player = root_player, "side changed, discarding search tree");
            }
            self.tree.clear();
            self.side = Some(root_player);
        } else if !self.config.reuse_tree {
            self.tree.clear();
        }

        let start = Instant::now();
        let root = state.fingerprint();
        let mut game = state.clone();

        for _ in 0..self.config.max_count {
            game.reset_from(state);
            self.run_simulation(&mut game, root_player);
        }

        let node = self.tree.get(root);
        let action = node.best_action();
        let winning_probability = node.q_value(action);
        let stats = SearchStats {
            simulations: self.config.max_count,
            tree_size: self.tree.len(),
            elapsed: start.elapsed(),
        };

        debug!(
            player = root_player,
            simulations = stats.simulations,
            tree_size = stats.tree_size,
            action,
            winning_probability,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "search finished"
        );

        SearchResult {
            action,
            winning_probability,
            stats,
        }
    }

    fn run_simulation(&mut self, game: &mut Connect4State, root_player: i32) {
        let max_depth = self.config.max_depth;
        let mut visited: Vec<Fingerprint> = Vec::with_capacity(max_depth + 1);
        let mut actions: Vec<usize> = Vec::new();
        let mut rows: Vec<usize> = Vec::new();
        let mut leaf_value = 0.5;

        // Selection
        while !game.is_terminal() && visited.len() <= max_depth {
            let fingerprint = game.fingerprint();
            visited.push(fingerprint);
            if let (Some(&parent), Some(&action)) = (visited.iter().rev().nth(1), actions.last()) {
                self.tree.link(parent, action, fingerprint);
            }

            let to_move = game.current_player();
            if !self.tree.contains(fingerprint) {
                // Expansion
                let prediction = self.expand(game, fingerprint);
                leaf_value = from_root_view(prediction, to_move, root_player);
                break;
            }

            let node = self.tree.get(fingerprint);
            leaf_value = from_root_view(node.prior_win_prediction(), to_move, root_player);
            let action = node.select_action(
                self.config.confidence_value,
                self.config.rave_param,
                to_move == root_player,
            );
            rows.push(game.landing_row(action));
            actions.push(action);
            game.place(action);
            game.advance_turn();
        }

        let reward = if game.is_terminal() {
            outcome_reward(game, root_player)
        } else if self.config.rollout_weight > 0.0 {
            // Simulation
            while !game.is_terminal() {
                let available = game.clever_available_actions();
                let action = self.rollout.choose(game, &available);
                rows.push(game.landing_row(action));
                actions.push(action);
                game.place(action);
                game.advance_turn();
            }
            let w = self.config.rollout_weight;
            w * outcome_reward(game, root_player) + (1.0 - w) * leaf_value
        } else {
            leaf_value
        };

        trace!(
            depth = visited.len(),
            plies = actions.len(),
            reward,
            "simulation finished"
        );

        // Backpropagation
        let use_rave = self.config.rave_param.is_some();
        for (idx, (&fingerprint, &action)) in visited.iter().zip(&actions).enumerate() {
            let tail = (idx + 2).min(actions.len());
            self.tree.update(
                fingerprint,
                action,
                reward,
                &actions[tail..],
                &rows[tail..],
                use_rave,
            );
        }
    }

    /// Creates the node for `game` and returns the evaluator's estimate for
    /// the player to move.
    fn expand(&mut self, game: &Connect4State, fingerprint: Fingerprint) -> f64 {
        let actions = game.clever_available_actions();
        let evaluation = self.evaluator.evaluate(game);

        let mut priors: Vec<f64> = actions
            .iter()
            .map(|&a| evaluation.priors[a].max(0.0))
            .collect();
        let total: f64 = priors.iter().sum();
        if total > PRIOR_EPSILON && total.is_finite() {
            priors.iter_mut().for_each(|p| *p /= total);
        } else {
            let uniform = 1.0 / actions.len() as f64;
            priors.iter_mut().for_each(|p| *p = uniform);
        }

        let landing_rows = actions.iter().map(|&a| game.landing_row(a)).collect();
        let prediction = if evaluation.win_probability.is_finite() {
            evaluation.win_probability.clamp(0.0, 1.0)
        } else {
            0.5
        };
        self.tree
            .create(fingerprint, actions, landing_rows, priors, prediction);
        prediction
    }
}

/// Reward of a finished game for `root_player`: 1 win, 0.5 draw, 0 loss.
fn outcome_reward(game: &Connect4State, root_player: i32) -> f64 {
    match game.winner() {
        Some(winner) if winner == root_player => 1.0,
        Some(_) => 0.0,
        None => 0.5,
    }
}

/// Converts a win probability of `to_move` into one for `root_player`.
fn from_root_view(probability: f64, to_move: i32, root_player: i32) -> f64 {
    if to_move == root_player {
        probability
    } else {
        1.0 - probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Evaluation;
    use crate::games::connect4::{PLAYER_A, PLAYER_B};
    use connect4_shared::COLS;

    fn play(game: &mut Connect4State, columns: &[usize]) {
        for &c in columns {
            game.place(c);
            game.advance_turn();
        }
    }

    fn small_config() -> MctsConfig {
        MctsConfig::default().with_max_count(300).with_max_depth(4)
    }

    #[test]
    fn test_takes_immediate_win() {
        let mut game = Connect4State::new();
        play(&mut game, &[3, 2, 3, 2, 3, 6]);
        let mut mcts = Mcts::with_seed(small_config(), 1);
        let result = mcts.search(&game);
        assert_eq!(result.action, 3);
        assert_eq!(result.winning_probability, 1.0);
    }

    #[test]
    fn test_blocks_opponent_threat() {
        let mut game = Connect4State::new();
        play(&mut game, &[0, 4, 6, 4, 0, 4]);
        assert_eq!(game.current_player(), PLAYER_A);
        let mut mcts = Mcts::with_seed(small_config(), 2);
        assert_eq!(mcts.search(&game).action, 4);
    }

    #[test]
    fn test_search_leaves_state_untouched() {
        let mut game = Connect4State::new();
        play(&mut game, &[3, 3]);
        let before = game.clone();
        let mut mcts = Mcts::with_seed(small_config(), 3);
        mcts.search(&game);
        assert_eq!(game.cells(), before.cells());
        assert_eq!(game.current_player(), before.current_player());
        assert_eq!(game.winning_mask(PLAYER_A), before.winning_mask(PLAYER_A));
    }

    #[test]
    fn test_root_visits_match_simulations() {
        let game = Connect4State::new();
        let mut mcts = Mcts::with_seed(small_config().with_max_count(123), 4);
        let result = mcts.search(&game);

        let root = mcts.tree().get(game.fingerprint());
        assert_eq!(root.total_visits(), 123);
        assert_eq!(root.visits().iter().sum::<u32>(), 123);
        assert_eq!(result.stats.simulations, 123);
        assert_eq!(result.stats.tree_size, mcts.tree().len());
    }

    #[test]
    fn test_same_seed_same_result() {
        let game = Connect4State::new();
        let config = small_config().with_rave_param(Some(1.0));
        let a = Mcts::with_seed(config.clone(), 99).search(&game);
        let b = Mcts::with_seed(config, 99).search(&game);
        assert_eq!(a.action, b.action);
        assert_eq!(a.winning_probability, b.winning_probability);
    }

    #[test]
    fn test_tree_reuse_accumulates() {
        let game = Connect4State::new();
        let config = small_config().with_max_count(50);

        let mut reuse = Mcts::with_seed(config.clone(), 5);
        reuse.search(&game);
        reuse.search(&game);
        assert_eq!(reuse.tree().get(game.fingerprint()).total_visits(), 100);

        let mut fresh = Mcts::with_seed(config.with_reuse_tree(false), 5);
        fresh.search(&game);
        fresh.search(&game);
        assert_eq!(fresh.tree().get(game.fingerprint()).total_visits(), 50);
    }

    #[test]
    fn test_zero_depth_only_expands_root() {
        let game = Connect4State::new();
        let mut mcts = Mcts::with_seed(small_config().with_max_depth(0).with_max_count(20), 6);
        mcts.search(&game);
        assert_eq!(mcts.tree().len(), 1);
    }

    struct FixedEvaluator(Evaluation);

    impl Evaluator for FixedEvaluator {
        fn evaluate(&self, _state: &Connect4State) -> Evaluation {
            self.0.clone()
        }
    }

    #[test]
    fn test_prior_only_reward_without_rollouts() {
        // the evaluator says the player to move always wins with 0.8
        let evaluator = FixedEvaluator(Evaluation {
            priors: [1.0 / COLS as f64; COLS],
            win_probability: 0.8,
        });
        let config = small_config().with_rollout_weight(0.0).with_max_count(2);
        let mut mcts = Mcts::new(
            config,
            Box::new(evaluator),
            Box::new(RandomPlayer::with_seed(7)),
        );
        let game = Connect4State::new();
        mcts.search(&game);

        // first simulation only expands the root, second expands a child
        // where the opponent is to move: 1 - 0.8 seen from the root
        let root = mcts.tree().get(game.fingerprint());
        assert_eq!(root.total_visits(), 1);
        assert!((root.q_value(0) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_zero_priors_fall_back_to_uniform() {
        let evaluator = FixedEvaluator(Evaluation {
            priors: [0.0; COLS],
            win_probability: 0.5,
        });
        let mut mcts = Mcts::new(
            small_config().with_max_count(1),
            Box::new(evaluator),
            Box::new(RandomPlayer::with_seed(8)),
        );
        let game = Connect4State::new();
        mcts.search(&game);
        let root = mcts.tree().get(game.fingerprint());
        assert!(root.priors().iter().all(|&p| (p - 1.0 / 7.0).abs() < 1e-12));
    }

    #[test]
    fn test_children_are_linked() {
        let game = Connect4State::new();
        let mut mcts = Mcts::with_seed(small_config().with_max_count(200), 9);
        mcts.search(&game);

        let root = mcts.tree().get(game.fingerprint());
        let mut child_state = game.clone();
        child_state.place(0);
        child_state.advance_turn();
        assert_eq!(root.child(0), Some(child_state.fingerprint()));
        assert!(mcts.tree().contains(child_state.fingerprint()));
    }

    #[test]
    fn test_searches_for_second_player() {
        let mut game = Connect4State::new();
        // O to move, X threatens the bottom row
        play(&mut game, &[1, 1, 2, 2, 3]);
        assert_eq!(game.current_player(), PLAYER_B);
        let mut mcts = Mcts::with_seed(small_config(), 10);
        let action = mcts.search(&game).action;
        assert!(action == 0 || action == 4);
    }

    #[test]
    fn test_other_side_does_not_inherit_statistics() {
        let mut x_to_move = Connect4State::new();
        play(&mut x_to_move, &[1, 1, 2, 2]);
        // X takes the centre: open three on the bottom row, O is lost
        let mut o_to_move = x_to_move.clone();
        play(&mut o_to_move, &[3]);

        let mut fresh = Mcts::with_seed(small_config(), 12);
        assert_eq!(fresh.search(&o_to_move).winning_probability, 0.0);

        let mut reused = Mcts::with_seed(small_config(), 12);
        reused.search(&x_to_move);
        let result = reused.search(&o_to_move);
        assert_eq!(result.winning_probability, 0.0);
        assert!(!reused.tree().contains(x_to_move.fingerprint()));
        assert_eq!(reused.tree().get(o_to_move.fingerprint()).total_visits(), 300);
    }

    #[test]
    fn test_rollout_and_estimate_are_blended() {
        // the player to move is credited 0.2 by the evaluator, and wins in column 3
        let mut game = Connect4State::new();
        play(&mut game, &[3, 2, 3, 2, 3, 6]);
        let engine = |max_count| {
            Mcts::new(
                small_config().with_rollout_weight(0.5).with_max_count(max_count),
                Box::new(FixedEvaluator(Evaluation {
                    priors: [1.0 / COLS as f64; COLS],
                    win_probability: 0.2,
                })),
                Box::new(RandomPlayer::with_seed(13)),
            )
        };

        // expansion plus a winning rollout: 0.5 * 1 + 0.5 * 0.2
        let mut one = engine(1);
        assert!((one.search(&game).winning_probability - 0.6).abs() < 1e-12);

        // the second simulation reaches the win inside the tree: exact 1.0
        let mut two = engine(2);
        assert!((two.search(&game).winning_probability - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_estimate_is_neutral() {
        let evaluator = FixedEvaluator(Evaluation {
            priors: [1.0 / COLS as f64; COLS],
            win_probability: f64::NAN,
        });
        let mut mcts = Mcts::new(
            small_config().with_rollout_weight(0.0).with_max_count(50),
            Box::new(evaluator),
            Box::new(RandomPlayer::with_seed(14)),
        );
        let game = Connect4State::new();
        let result = mcts.search(&game);

        let root = mcts.tree().get(game.fingerprint());
        assert_eq!(root.prior_win_prediction(), 0.5);
        assert!(root.q_values().iter().all(|q| q.is_finite()));
        assert!(result.winning_probability.is_finite());
    }

    #[test]
    #[should_panic(expected = "finished game")]
    fn test_terminal_root_panics() {
        let mut game = Connect4State::new();
        play(&mut game, &[0, 1, 0, 1, 0, 1, 0]);
        Mcts::with_seed(small_config(), 11).search(&game);
    }
}
