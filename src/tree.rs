//! # Search Tree
//!
//! Statistics store shared by all simulations of a search, and across moves
//! when tree reuse is enabled. Nodes are keyed by board fingerprint, so two
//! move orders reaching the same position share one node.
//!
//! Every node keeps parallel per-action arrays: visit counts, mean rewards
//! (Q), AMAF visit counts and AMAF Q-values, priors, the row the action
//! lands on and the fingerprint of the position it leads to once known.
//! All rewards are stored from the searching player's point of view.

use crate::games::connect4::Fingerprint;
use connect4_shared::COLS;
use std::collections::HashMap;

/// Statistics of one searched position.
#[derive(Debug, Clone)]
pub struct Node {
    actions: Vec<usize>,
    /// Slot of each column in the per-action arrays
    slots: [Option<usize>; COLS],
    landing_rows: Vec<usize>,
    total_visits: u32,
    visits: Vec<u32>,
    q_values: Vec<f64>,
    amaf_visits: Vec<u32>,
    amaf_q_values: Vec<f64>,
    priors: Vec<f64>,
    prior_win_prediction: f64,
    children: Vec<Option<Fingerprint>>,
}

impl Node {
    fn new(
        actions: Vec<usize>,
        landing_rows: Vec<usize>,
        priors: Vec<f64>,
        prior_win_prediction: f64,
    ) -> Self {
        assert!(!actions.is_empty(), "a tree node needs at least one action");
        assert_eq!(actions.len(), landing_rows.len(), "one landing row per action");
        assert_eq!(actions.len(), priors.len(), "one prior per action");

        let mut slots = [None; COLS];
        for (slot, &action) in actions.iter().enumerate() {
            slots[action] = Some(slot);
        }
        let n = actions.len();
        Self {
            actions,
            slots,
            landing_rows,
            total_visits: 0,
            visits: vec![0; n],
            q_values: vec![0.0; n],
            amaf_visits: vec![0; n],
            amaf_q_values: vec![0.0; n],
            priors,
            prior_win_prediction,
            children: vec![None; n],
        }
    }

    /// Slot of `action`
    ///
    /// # Panics
    /// Panics if `action` is not one of this node's actions.
    fn slot(&self, action: usize) -> usize {
        self.slots
            .get(action)
            .copied()
            .flatten()
            .unwrap_or_else(|| panic!("action {} is not available at this node", action))
    }

    /// Picks an action by UCB1 with optional RAVE blending.
    ///
    /// ```text
    /// exploration = prior * sqrt(total_visits) / (visits + 1)
    /// beta        = m / (n + m + 4 n m r^2)          (0 when m = 0)
    /// value       = (1 - beta) * Q + beta * AMAF_Q   (Q without RAVE)
    /// score       = value +/- confidence * exploration
    /// ```
    ///
    /// The highest score wins when `maximize` is set (the searching player's
    /// turn), the lowest otherwise. Ties go to the lowest slot, i.e. the
    /// lowest column.
    pub fn select_action(&self, confidence_value: f64, rave_param: Option<f64>, maximize: bool) -> usize {
        let sqrt_total = (self.total_visits as f64).sqrt();

        let mut best_slot = 0;
        let mut best_score = 0.0;
        for slot in 0..self.actions.len() {
            let n = self.visits[slot] as f64;
            let exploration = self.priors[slot] * sqrt_total / (n + 1.0);

            let value = match rave_param {
                Some(r) => {
                    let m = self.amaf_visits[slot] as f64;
                    let beta = if m > 0.0 {
                        m / (n + m + 4.0 * n * m * r * r)
                    } else {
                        0.0
                    };
                    (1.0 - beta) * self.q_values[slot] + beta * self.amaf_q_values[slot]
                }
                None => self.q_values[slot],
            };

            let score = if maximize {
                value + confidence_value * exploration
            } else {
                value - confidence_value * exploration
            };

            let better = if maximize {
                score > best_score
            } else {
                score < best_score
            };
            if slot == 0 || better {
                best_slot = slot;
                best_score = score;
            }
        }
        self.actions[best_slot]
    }

    /// Action with the highest mean reward, ties to the lowest column
    pub fn best_action(&self) -> usize {
        self.select_action(0.0, None, true)
    }

    /// Actions of this node in ascending column order
    pub fn actions(&self) -> &[usize] {
        &self.actions
    }

    pub fn landing_rows(&self) -> &[usize] {
        &self.landing_rows
    }

    /// Number of updates applied to this node
    pub fn total_visits(&self) -> u32 {
        self.total_visits
    }

    pub fn visits(&self) -> &[u32] {
        &self.visits
    }

    pub fn q_values(&self) -> &[f64] {
        &self.q_values
    }

    pub fn amaf_visits(&self) -> &[u32] {
        &self.amaf_visits
    }

    pub fn amaf_q_values(&self) -> &[f64] {
        &self.amaf_q_values
    }

    pub fn priors(&self) -> &[f64] {
        &self.priors
    }

    /// Evaluator estimate of this position for the player to move
    pub fn prior_win_prediction(&self) -> f64 {
        self.prior_win_prediction
    }

    /// Mean reward of `action`
    pub fn q_value(&self, action: usize) -> f64 {
        self.q_values[self.slot(action)]
    }

    pub fn amaf_q_value(&self, action: usize) -> f64 {
        self.amaf_q_values[self.slot(action)]
    }

    /// Position reached by `action`, once a simulation has linked it
    pub fn child(&self, action: usize) -> Option<Fingerprint> {
        self.children[self.slot(action)]
    }
}

/// Best line through the tree, one entry per ply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrincipalVariation {
    pub actions: Vec<usize>,
    pub q_values: Vec<f64>,
    pub amaf_q_values: Vec<f64>,
}

/// Fingerprint-indexed table of search nodes.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: HashMap<Fingerprint, Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, fingerprint: Fingerprint) -> bool {
        self.nodes.contains_key(&fingerprint)
    }

    /// Node stored under `fingerprint`
    ///
    /// # Panics
    /// Panics if the fingerprint is not in the tree; check with
    /// [`contains`](Self::contains) first.
    pub fn get(&self, fingerprint: Fingerprint) -> &Node {
        self.nodes
            .get(&fingerprint)
            .unwrap_or_else(|| panic!("fingerprint {:#018x} is not in the tree", fingerprint))
    }

    fn get_mut(&mut self, fingerprint: Fingerprint) -> &mut Node {
        self.nodes
            .get_mut(&fingerprint)
            .unwrap_or_else(|| panic!("fingerprint {:#018x} is not in the tree", fingerprint))
    }

    /// Inserts a fresh node. `priors` must already be normalized over
    /// `actions`, and `landing_rows[i]` is the row `actions[i]` lands on.
    pub fn create(
        &mut self,
        fingerprint: Fingerprint,
        actions: Vec<usize>,
        landing_rows: Vec<usize>,
        priors: Vec<f64>,
        prior_win_prediction: f64,
    ) -> &Node {
        self.nodes.insert(
            fingerprint,
            Node::new(actions, landing_rows, priors, prior_win_prediction),
        );
        self.get(fingerprint)
    }

    /// Records one simulation result for `action` at `fingerprint`.
    ///
    /// `following_actions` and `following_rows` are the rest of the
    /// trajectory starting at the mover's next turn, so every second entry
    /// was played by the same side. With `use_rave`, every other action of
    /// the node whose first same-side occurrence landed on the row it would
    /// land on here gets the same reward in its AMAF statistics.
    pub fn update(
        &mut self,
        fingerprint: Fingerprint,
        action: usize,
        reward: f64,
        following_actions: &[usize],
        following_rows: &[usize],
        use_rave: bool,
    ) {
        let node = self.get_mut(fingerprint);
        let chosen = node.slot(action);

        node.total_visits += 1;
        node.visits[chosen] += 1;
        node.q_values[chosen] += (reward - node.q_values[chosen]) / node.visits[chosen] as f64;

        if !use_rave {
            return;
        }
        for slot in 0..node.actions.len() {
            if slot == chosen {
                continue;
            }
            let candidate = node.actions[slot];
            let first = following_actions
                .iter()
                .zip(following_rows)
                .step_by(2)
                .find(|&(&a, _)| a == candidate);
            if let Some((_, &row)) = first {
                if row == node.landing_rows[slot] {
                    node.amaf_visits[slot] += 1;
                    node.amaf_q_values[slot] +=
                        (reward - node.amaf_q_values[slot]) / node.amaf_visits[slot] as f64;
                }
            }
        }
    }

    /// Records that `action` at `parent` leads to `child`.
    pub fn link(&mut self, parent: Fingerprint, action: usize, child: Fingerprint) {
        let node = self.get_mut(parent);
        let slot = node.slot(action);
        node.children[slot] = Some(child);
    }

    /// Visit distribution over all columns, with counts raised to
    /// `1 / temperature`. Columns not available at the node get zero mass.
    /// A node without visits yields a uniform distribution over its actions.
    ///
    /// # Panics
    /// Panics if `temperature` is not positive.
    pub fn action_probabilities(&self, fingerprint: Fingerprint, temperature: f64) -> [f64; COLS] {
        assert!(temperature > 0.0, "temperature must be positive, got {}", temperature);
        let node = self.get(fingerprint);

        let mut probabilities = [0.0; COLS];
        for (slot, &action) in node.actions.iter().enumerate() {
            probabilities[action] = (node.visits[slot] as f64).powf(1.0 / temperature);
        }
        let total: f64 = probabilities.iter().sum();
        if total > 0.0 && total.is_finite() {
            probabilities.iter_mut().for_each(|p| *p /= total);
        } else {
            probabilities = [0.0; COLS];
            let uniform = 1.0 / node.actions.len() as f64;
            for &action in &node.actions {
                probabilities[action] = uniform;
            }
        }
        probabilities
    }

    /// Follows the best action through linked children, starting at `root`.
    ///
    /// The root belongs to the searching player, so plies alternate between
    /// highest and lowest mean reward. Stops at the first action whose
    /// resulting position was never linked.
    pub fn principal_variation(&self, root: Fingerprint) -> PrincipalVariation {
        let mut line = PrincipalVariation::default();
        let mut current = self.nodes.get(&root);
        let mut maximize = true;

        while let Some(node) = current {
            let action = node.select_action(0.0, None, maximize);
            let slot = node.slot(action);
            line.actions.push(action);
            line.q_values.push(node.q_values[slot]);
            line.amaf_q_values.push(node.amaf_q_values[slot]);

            current = node.children[slot].and_then(|child| self.nodes.get(&child));
            maximize = !maximize;
        }
        line
    }

    /// Number of positions stored
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_node(tree: &mut Tree, fingerprint: Fingerprint, actions: &[usize]) {
        let n = actions.len();
        tree.create(
            fingerprint,
            actions.to_vec(),
            vec![0; n],
            vec![1.0 / n as f64; n],
            0.5,
        );
    }

    #[test]
    fn test_create_and_get() {
        let mut tree = Tree::new();
        assert!(!tree.contains(7));
        uniform_node(&mut tree, 7, &[0, 3, 6]);
        assert!(tree.contains(7));
        assert_eq!(tree.len(), 1);

        let node = tree.get(7);
        assert_eq!(node.actions(), &[0, 3, 6]);
        assert_eq!(node.total_visits(), 0);
        assert_eq!(node.child(3), None);
        assert_eq!(node.prior_win_prediction(), 0.5);
    }

    #[test]
    #[should_panic(expected = "not in the tree")]
    fn test_get_missing_panics() {
        Tree::new().get(42);
    }

    #[test]
    fn test_update_running_mean() {
        let mut tree = Tree::new();
        uniform_node(&mut tree, 1, &[2, 3]);
        tree.update(1, 3, 1.0, &[], &[], false);
        tree.update(1, 3, 0.0, &[], &[], false);
        tree.update(1, 3, 0.5, &[], &[], false);

        let node = tree.get(1);
        assert_eq!(node.visits(), &[0, 3]);
        assert_eq!(node.total_visits(), 3);
        assert!((node.q_value(3) - 0.5).abs() < 1e-12);
        assert_eq!(node.q_value(2), 0.0);
    }

    #[test]
    fn test_amaf_credits_same_side_actions_on_matching_row() {
        let mut tree = Tree::new();
        // actions 0, 1, 2 all land on row 0 here
        tree.create(1, vec![0, 1, 2], vec![0, 0, 0], vec![1.0 / 3.0; 3], 0.5);

        // same side later plays 1 (row 0) and 2 (row 1); opponent plays 0
        let following = [1, 0, 2];
        let rows = [0, 0, 1];
        tree.update(1, 0, 1.0, &following, &rows, true);

        let node = tree.get(1);
        assert_eq!(node.amaf_visits(), &[0, 1, 0]);
        assert_eq!(node.amaf_q_value(1), 1.0);
        assert_eq!(node.visits(), &[1, 0, 0]);
    }

    #[test]
    fn test_amaf_uses_first_occurrence_only() {
        let mut tree = Tree::new();
        tree.create(1, vec![4, 5], vec![2, 0], vec![0.5, 0.5], 0.5);

        // first same-side 4 lands on row 3, a later one on row 2
        let following = [4, 6, 4];
        let rows = [3, 0, 2];
        tree.update(1, 5, 0.0, &following, &rows, true);

        assert_eq!(tree.get(1).amaf_visits(), &[0, 0]);
    }

    #[test]
    fn test_amaf_disabled_without_rave() {
        let mut tree = Tree::new();
        tree.create(1, vec![0, 1], vec![0, 0], vec![0.5, 0.5], 0.5);
        tree.update(1, 0, 1.0, &[1], &[0], false);
        assert_eq!(tree.get(1).amaf_visits(), &[0, 0]);
    }

    #[test]
    fn test_select_ties_go_to_lowest_column() {
        let mut tree = Tree::new();
        uniform_node(&mut tree, 1, &[1, 4, 5]);
        let node = tree.get(1);
        assert_eq!(node.select_action(4.0, None, true), 1);
        assert_eq!(node.select_action(4.0, Some(1.0), false), 1);
        assert_eq!(node.best_action(), 1);
    }

    #[test]
    fn test_zero_confidence_is_argmax_q() {
        let mut tree = Tree::new();
        uniform_node(&mut tree, 1, &[0, 1, 2]);
        tree.update(1, 0, 0.2, &[], &[], false);
        tree.update(1, 1, 0.9, &[], &[], false);
        tree.update(1, 2, 0.9, &[], &[], false);

        let node = tree.get(1);
        assert_eq!(node.select_action(0.0, None, true), 1);
        assert_eq!(node.select_action(0.0, None, false), 0);
    }

    #[test]
    fn test_exploration_prefers_unvisited_action() {
        let mut tree = Tree::new();
        uniform_node(&mut tree, 1, &[0, 1]);
        for _ in 0..10 {
            tree.update(1, 0, 0.6, &[], &[], false);
        }
        let node = tree.get(1);
        // unvisited bonus: 0.5 * sqrt(10) * 4 ~ 6.3 beats 0.6 + 0.5 * sqrt(10) / 11 * 4
        assert_eq!(node.select_action(4.0, None, true), 1);
        assert_eq!(node.select_action(0.0, None, true), 0);
    }

    #[test]
    fn test_rave_blends_amaf_value() {
        let mut tree = Tree::new();
        tree.create(1, vec![0, 1], vec![0, 0], vec![0.5, 0.5], 0.5);
        // action 1 is never chosen but shows up in every winning playout
        for _ in 0..5 {
            tree.update(1, 0, 1.0, &[1], &[0], true);
        }
        for _ in 0..5 {
            tree.update(1, 0, 0.0, &[], &[], true);
        }
        let node = tree.get(1);
        assert_eq!(node.amaf_visits(), &[0, 5]);
        assert_eq!(node.amaf_q_value(1), 1.0);
        // beta = 1 for an action with n = 0, so its value is the AMAF mean
        assert_eq!(node.select_action(0.0, Some(1.0), true), 1);
        assert_eq!(node.select_action(0.0, None, true), 0);
    }

    #[test]
    fn test_action_probabilities_temperature() {
        let mut tree = Tree::new();
        uniform_node(&mut tree, 1, &[2, 5]);
        for _ in 0..3 {
            tree.update(1, 2, 1.0, &[], &[], false);
        }
        tree.update(1, 5, 1.0, &[], &[], false);

        let p = tree.action_probabilities(1, 1.0);
        assert!((p[2] - 0.75).abs() < 1e-12);
        assert!((p[5] - 0.25).abs() < 1e-12);
        assert_eq!(p[0], 0.0);

        let sharp = tree.action_probabilities(1, 0.5);
        assert!((sharp[2] - 0.9).abs() < 1e-12);
        assert!((sharp.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_action_probabilities_without_visits_is_uniform() {
        let mut tree = Tree::new();
        uniform_node(&mut tree, 1, &[0, 6]);
        let p = tree.action_probabilities(1, 1.0);
        assert_eq!(p[0], 0.5);
        assert_eq!(p[6], 0.5);
    }

    #[test]
    #[should_panic(expected = "temperature")]
    fn test_zero_temperature_panics() {
        let mut tree = Tree::new();
        uniform_node(&mut tree, 1, &[0]);
        tree.action_probabilities(1, 0.0);
    }

    #[test]
    fn test_principal_variation_alternates_sides() {
        let mut tree = Tree::new();
        uniform_node(&mut tree, 1, &[0, 1]);
        uniform_node(&mut tree, 2, &[0, 1]);
        uniform_node(&mut tree, 3, &[3]);

        tree.update(1, 1, 0.8, &[], &[], false);
        tree.update(1, 0, 0.3, &[], &[], false);
        tree.link(1, 1, 2);

        // opponent's turn: lowest Q wins
        tree.update(2, 0, 0.9, &[], &[], false);
        tree.update(2, 1, 0.1, &[], &[], false);
        tree.link(2, 1, 3);

        let pv = tree.principal_variation(1);
        assert_eq!(pv.actions, vec![1, 1, 3]);
        assert_eq!(pv.q_values, vec![0.8, 0.1, 0.0]);
        assert_eq!(pv.amaf_q_values.len(), 3);
    }

    #[test]
    fn test_principal_variation_of_missing_root_is_empty() {
        assert_eq!(Tree::new().principal_variation(9), PrincipalVariation::default());
    }
}
