//! # Players
//!
//! A [`Player`] picks one of the columns it is offered. The same trait
//! serves as rollout policy inside a search and as a participant in a game,
//! so an [`MctsPlayer`] can also drive the rollouts of another search.

use crate::config::MctsConfig;
use crate::evaluator::{Evaluator, QModel, UniformEvaluator};
use crate::games::connect4::Connect4State;
use crate::search::{Mcts, SearchStats};
use crate::tree::PrincipalVariation;
use connect4_shared::COLS;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

/// Chooses moves.
pub trait Player: Send {
    /// Picks one of `available_actions` for the player to move in `state`.
    ///
    /// # Panics
    /// Implementations may panic if `available_actions` is empty.
    fn choose(&mut self, state: &Connect4State, available_actions: &[usize]) -> usize;

    /// Forgets everything learned during the current game.
    fn reset(&mut self) {}
}

/// Uniformly random choice among the offered columns.
#[derive(Debug, Clone)]
pub struct RandomPlayer {
    rng: Xoshiro256PlusPlus,
}

impl RandomPlayer {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Player for RandomPlayer {
    fn choose(&mut self, _state: &Connect4State, available_actions: &[usize]) -> usize {
        assert!(!available_actions.is_empty(), "no actions to choose from");
        available_actions[self.rng.random_range(0..available_actions.len())]
    }
}

/// What an [`MctsPlayer`] decided on its last move.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Column played
    pub action: usize,
    /// Mean reward of the best root action
    pub winning_probability: f64,
    /// Visit distribution the move was sampled from, with `randomize_action`
    pub probabilities: Option<[f64; COLS]>,
    /// Best line according to the tree after the search
    pub principal_variation: PrincipalVariation,
    pub stats: SearchStats,
}

/// Plays the move found by a tree search.
pub struct MctsPlayer {
    mcts: Mcts,
    /// Samples randomized moves
    rng: Xoshiro256PlusPlus,
    last_decision: Option<Decision>,
}

impl MctsPlayer {
    pub fn new(mcts: Mcts, seed: u64) -> Self {
        Self {
            mcts,
            // offset so the sampling stream differs from a rollout player built from the same seed
            rng: Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(1)),
            last_decision: None,
        }
    }

    /// Uniform evaluator and random rollouts, all seeded from `seed`.
    pub fn with_seed(config: MctsConfig, seed: u64) -> Self {
        Self::new(Mcts::with_seed(config, seed), seed)
    }

    /// Plugs in an evaluator and a rollout policy.
    pub fn with_components(
        config: MctsConfig,
        evaluator: Box<dyn Evaluator>,
        rollout: Box<dyn Player>,
        seed: u64,
    ) -> Self {
        Self::new(Mcts::new(config, evaluator, rollout), seed)
    }

    /// Uses another MCTS player as rollout policy. `depth` bounds the
    /// nesting: 0 gives a plain random rollout.
    pub fn nested(config: MctsConfig, rollout_config: MctsConfig, depth: usize, seed: u64) -> Self {
        let rollout: Box<dyn Player> = if depth == 0 {
            Box::new(RandomPlayer::with_seed(seed))
        } else {
            Box::new(Self::nested(
                rollout_config.clone(),
                rollout_config,
                depth - 1,
                seed.wrapping_add(1),
            ))
        };
        Self::with_components(config, Box::new(UniformEvaluator::new()), rollout, seed)
    }

    pub fn config(&self) -> &MctsConfig {
        self.mcts.config()
    }

    pub fn mcts(&self) -> &Mcts {
        &self.mcts
    }

    /// The last decision, if any move was made since the last reset
    pub fn last_decision(&self) -> Option<&Decision> {
        self.last_decision.as_ref()
    }

    pub fn winning_probability(&self) -> Option<f64> {
        self.last_decision.as_ref().map(|d| d.winning_probability)
    }

    /// Searches `state` and records the decision.
    pub fn decide(&mut self, state: &Connect4State) -> &Decision {
        let to_move = state.current_player();
        let result = self.mcts.search(state);
        let root = state.fingerprint();
        let config = self.mcts.config();

        let probabilities = config
            .randomize_action
            .then(|| self.mcts.tree().action_probabilities(root, config.temperature));
        let action = match &probabilities {
            Some(p) => sample(&mut self.rng, p).unwrap_or(result.action),
            None => result.action,
        };
        let principal_variation = self.mcts.tree().principal_variation(root);

        debug!(
            player = to_move,
            action,
            winning_probability = result.winning_probability,
            line = ?principal_variation.actions,
            "mcts decision"
        );

        self.last_decision.insert(Decision {
            action,
            winning_probability: result.winning_probability,
            probabilities,
            principal_variation,
            stats: result.stats,
        })
    }
}

impl Player for MctsPlayer {
    fn choose(&mut self, state: &Connect4State, available_actions: &[usize]) -> usize {
        let action = self.decide(state).action;
        debug_assert!(
            available_actions.contains(&action),
            "search picked column {} outside {:?}",
            action,
            available_actions
        );
        action
    }

    fn reset(&mut self) {
        self.mcts.reset();
        self.last_decision = None;
    }
}

/// Draws an index from a probability vector.
fn sample(rng: &mut impl Rng, probabilities: &[f64]) -> Option<usize> {
    let total: f64 = probabilities.iter().sum();
    if !(total > 0.0) {
        return None;
    }
    let mut target = rng.random::<f64>() * total;
    let mut last_positive = None;
    for (i, &p) in probabilities.iter().enumerate() {
        if p <= 0.0 {
            continue;
        }
        if target < p {
            return Some(i);
        }
        target -= p;
        last_positive = Some(i);
    }
    last_positive
}

/// Plays randomly with probability `epsilon`, else the offered column with
/// the highest Q-value.
pub struct EpsilonGreedyPlayer<M> {
    model: M,
    epsilon: f64,
    rng: Xoshiro256PlusPlus,
}

impl<M: QModel> EpsilonGreedyPlayer<M> {
    /// # Panics
    /// Panics unless `epsilon` lies in [0, 1].
    pub fn new(model: M, epsilon: f64, seed: u64) -> Self {
        assert!((0.0..=1.0).contains(&epsilon), "epsilon must lie in [0, 1]");
        Self {
            model,
            epsilon,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl<M: QModel> Player for EpsilonGreedyPlayer<M> {
    fn choose(&mut self, state: &Connect4State, available_actions: &[usize]) -> usize {
        assert!(!available_actions.is_empty(), "no actions to choose from");
        if self.rng.random::<f64>() < self.epsilon {
            return available_actions[self.rng.random_range(0..available_actions.len())];
        }

        let q_values = self.model.predict(state.cells());
        let mut best = available_actions[0];
        for &action in &available_actions[1..] {
            if q_values[action] > q_values[best] {
                best = action;
            }
        }
        best
    }
}
