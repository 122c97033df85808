//! Regression tree with greedy variance-reduction splits.
//!
//! Nodes live in a flat arena (root at index 0) so a fitted tree serializes
//! as a plain list and prediction is a loop, not recursion.
//!
//! ## Split search
//! At each node a random subset of `max_features` features is visited in
//! random order. For each feature the node's samples are sorted by value and
//! swept once, maintaining running sums so every boundary between two
//! distinct values is scored in O(1). The score is the reduction in sum of
//! squared errors; the first best candidate wins ties. Thresholds sit at
//! the midpoint of the two neighbouring values.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::types::{FeatureVector, NUM_FEATURES};

/// Growth limits shared by every tree in a forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: NUM_FEATURES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
        n_samples: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
    /// Total SSE reduction credited to each feature
    importances: [f64; NUM_FEATURES],
}

/// Best split found for one node.
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Samples going left, after sorting by `feature`
    n_left: usize,
    sse_decrease: f64,
}

struct TreeBuilder<'a> {
    x: &'a [FeatureVector],
    y: &'a [f64],
    params: TreeParams,
    nodes: Vec<TreeNode>,
    importances: [f64; NUM_FEATURES],
}

impl RegressionTree {
    /// Grow a tree over the rows named by `indices` (duplicates allowed,
    /// as produced by bootstrap resampling).
    ///
    /// `indices` must be non-empty and every index must be in bounds of `x`
    /// and `y`.
    pub fn fit(
        x: &[FeatureVector],
        y: &[f64],
        mut indices: Vec<usize>,
        params: TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let mut builder = TreeBuilder {
            x,
            y,
            params,
            nodes: Vec::new(),
            importances: [0.0; NUM_FEATURES],
        };
        builder.build(&mut indices, 0, rng);
        Self {
            nodes: builder.nodes,
            importances: builder.importances,
        }
    }

    /// Value of the leaf `x` falls into.
    pub fn predict(&self, x: &FeatureVector) -> f64 {
        let mut i = 0;
        loop {
            match self.nodes[i] {
                TreeNode::Leaf { value, .. } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if x.0[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn split_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Split { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], i: usize) -> usize {
            match nodes[i] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Importances normalized to sum to 1, or `None` for a single-leaf tree.
    pub fn normalized_importances(&self) -> Option<[f64; NUM_FEATURES]> {
        let total: f64 = self.importances.iter().sum();
        if total <= 0.0 {
            return None;
        }
        let mut out = self.importances;
        for v in &mut out {
            *v /= total;
        }
        Some(out)
    }

    /// Structural sanity: child links point forward and inside the arena.
    pub fn is_well_formed(&self) -> bool {
        self.nodes.iter().enumerate().all(|(i, n)| match *n {
            TreeNode::Leaf { value, .. } => value.is_finite(),
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                feature < NUM_FEATURES
                    && threshold.is_finite()
                    && left > i
                    && right > i
                    && left < self.nodes.len()
                    && right < self.nodes.len()
            }
        })
    }
}

impl TreeBuilder<'_> {
    /// Build the subtree for `indices`, returning its node index.
    fn build(&mut self, indices: &mut [usize], depth: usize, rng: &mut StdRng) -> usize {
        let n = indices.len();
        let (mean, sse) = self.mean_and_sse(indices);

        let node_index = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { value: mean, n_samples: n });

        let at_max_depth = self.params.max_depth.is_some_and(|d| depth >= d);
        if n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
            || at_max_depth
            || sse <= f64::EPSILON * mean.abs().max(1.0)
        {
            return node_index;
        }

        let Some(split) = self.find_best_split(indices, sse, rng) else {
            return node_index;
        };

        sort_by_feature(self.x, indices, split.feature);
        let (left_idx, right_idx) = indices.split_at_mut(split.n_left);

        self.importances[split.feature] += split.sse_decrease;
        let left = self.build(left_idx, depth + 1, rng);
        let right = self.build(right_idx, depth + 1, rng);

        self.nodes[node_index] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_index
    }

    fn mean_and_sse(&self, indices: &[usize]) -> (f64, f64) {
        let n = indices.len() as f64;
        let mean = indices.iter().map(|&i| self.y[i]).sum::<f64>() / n;
        let sse = indices
            .iter()
            .map(|&i| (self.y[i] - mean).powi(2))
            .sum::<f64>();
        (mean, sse)
    }

    fn find_best_split(
        &self,
        indices: &mut [usize],
        node_sse: f64,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let mut features: [usize; NUM_FEATURES] = std::array::from_fn(|i| i);
        features.shuffle(rng);
        let max_features = self.params.max_features.clamp(1, NUM_FEATURES);

        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let min_leaf = self.params.min_samples_leaf;

        let mut best: Option<SplitCandidate> = None;

        for &feature in &features[..max_features] {
            sort_by_feature(self.x, indices, feature);

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for pos in 0..n - 1 {
                let yi = self.y[indices[pos]];
                left_sum += yi;
                left_sq += yi * yi;

                let here = self.x[indices[pos]].0[feature];
                let next = self.x[indices[pos + 1]].0[feature];
                if here >= next {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let sse_left = (left_sq - left_sum * left_sum / n_left as f64).max(0.0);
                let sse_right = (right_sq - right_sum * right_sum / n_right as f64).max(0.0);
                let decrease = (node_sse - sse_left - sse_right).max(0.0);

                if best.map_or(true, |b| decrease > b.sse_decrease) {
                    let mut threshold = (here + next) / 2.0;
                    // Midpoint can round up onto `next`; keep it strictly below.
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        n_left,
                        sse_decrease: decrease,
                    });
                }
            }
        }

        best
    }
}

/// Stable sort of row indices by one feature's value.
fn sort_by_feature(x: &[FeatureVector], indices: &mut [usize], feature: usize) {
    indices.sort_by(|&a, &b| x[a].0[feature].total_cmp(&x[b].0[feature]));
}
