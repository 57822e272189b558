//! Position evaluators.
//!
//! An evaluator maps a position to a prior distribution over columns and an
//! estimate of the chance that the player to move wins. The search uses the
//! priors to bias exploration of a freshly expanded node and blends the
//! estimate with rollout results.
//!
//! Implementations:
//! - [`UniformEvaluator`]: equal priors and a neutral 0.5 estimate
//! - [`QModelEvaluator`]: adapts a learned action-value model

use crate::games::connect4::Connect4State;
use connect4_shared::{CELLS, COLS};

/// Result of evaluating a position.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Preference per column. Index i is column i; mass on full columns is
    /// ignored and the rest is renormalized by the search.
    pub priors: [f64; COLS],

    /// Probability that the player to move wins, in [0, 1].
    pub win_probability: f64,
}

/// Trait for position evaluators.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, state: &Connect4State) -> Evaluation;
}

/// Evaluator used when no model is plugged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for UniformEvaluator {
    fn evaluate(&self, _state: &Connect4State) -> Evaluation {
        Evaluation {
            priors: [1.0 / COLS as f64; COLS],
            win_probability: 0.5,
        }
    }
}

/// Action-value model over raw board cells.
///
/// `predict` returns one Q-value per column in [-1, 1] for the player to
/// move: -1 is a certain loss, +1 a certain win.
pub trait QModel: Send + Sync {
    fn predict(&self, cells: &[i32; CELLS]) -> [f64; COLS];
}

impl<F> QModel for F
where
    F: Fn(&[i32; CELLS]) -> [f64; COLS] + Send + Sync,
{
    fn predict(&self, cells: &[i32; CELLS]) -> [f64; COLS] {
        self(cells)
    }
}

/// Turns a [`QModel`] into priors and a value estimate.
///
/// Priors are a softmax of the Q-values over the open columns; the win
/// probability is the best open Q-value mapped from [-1, 1] onto [0, 1].
#[derive(Debug, Clone)]
pub struct QModelEvaluator<M> {
    model: M,
    /// Softmax temperature
    temperature: f64,
}

impl<M: QModel> QModelEvaluator<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            temperature: 1.0,
        }
    }

    /// Builder pattern: set softmax temperature.
    ///
    /// # Panics
    /// Panics if `temperature` is not positive.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        assert!(temperature > 0.0, "softmax temperature must be positive");
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: QModel> Evaluator for QModelEvaluator<M> {
    fn evaluate(&self, state: &Connect4State) -> Evaluation {
        let q_values = self.model.predict(state.cells());
        let open = state.available_actions();

        let best = open
            .iter()
            .map(|&c| q_values[c])
            .fold(f64::NEG_INFINITY, f64::max);
        if !best.is_finite() {
            return UniformEvaluator.evaluate(state);
        }

        let mut priors = [0.0; COLS];
        for &c in &open {
            // shifted by the max for numerical stability
            priors[c] = ((q_values[c] - best) / self.temperature).exp();
        }
        let total: f64 = priors.iter().sum();
        priors.iter_mut().for_each(|p| *p /= total);

        Evaluation {
            priors,
            win_probability: ((best + 1.0) / 2.0).clamp(0.0, 1.0),
        }
    }
}
