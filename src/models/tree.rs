//! CART decision trees, the building block of the forests.
//!
//! Nodes live in a flat arena and refer to their children by index, which keeps the
//! fitted tree a plain serde value. Regression trees split on squared error and
//! store the mean target in their leaves; classification trees split on weighted
//! Gini impurity and store the weighted class distribution.

use crate::models::error::ModelError;
use ordered_float::OrderedFloat;
use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const IMPURITY_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features considered per split; `None` considers all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// What a tree is fit against.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TreeTarget<'a> {
    Continuous(&'a [f64]),
    Classes {
        labels: &'a [usize],
        /// Weight of each class, indexed by label.
        class_weights: &'a [f64],
        n_classes: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf(Vec<f64>),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

impl DecisionTree {
    /// Fits a tree on the rows selected by `indices` (repeats allowed, as produced by
    /// bootstrap sampling).
    pub(crate) fn fit(
        x: &[Vec<f64>],
        target: TreeTarget<'_>,
        indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Result<Self, ModelError> {
        let n_features = x.first().map(Vec::len).ok_or(ModelError::EmptyTrainingSet)?;
        if indices.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if let Some(row) = x.iter().find(|row| row.len() != n_features) {
            return Err(ModelError::DimensionMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }

        let mut builder = TreeBuilder {
            x,
            target,
            params,
            n_features,
            rng,
            nodes: Vec::new(),
        };
        builder.grow(indices, 0);
        Ok(Self {
            nodes: builder.nodes,
            n_features,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// The leaf value reached by `row`: `[mean]` for regression trees, the class
    /// distribution for classification trees.
    pub fn leaf_for(&self, row: &[f64]) -> Result<&[f64], ModelError> {
        if row.len() != self.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let mut at = 0;
        loop {
            match self.nodes.get(at) {
                Some(Node::Leaf(value)) => return Ok(value),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
                None => return Err(ModelError::CorruptModel),
            }
        }
    }
}

struct TreeBuilder<'a, 'r> {
    x: &'a [Vec<f64>],
    target: TreeTarget<'a>,
    params: &'a TreeParams,
    n_features: usize,
    rng: &'r mut ChaCha8Rng,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

impl TreeBuilder<'_, '_> {
    /// Grows the subtree for `indices` and returns the index of its root node.
    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let stats = Stats::collect(self.target, &indices);
        let impurity = stats.impurity();

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        let too_small = indices.len() < self.params.min_samples_split.max(2);
        if depth_reached || too_small || impurity <= IMPURITY_EPSILON {
            return self.push(Node::Leaf(stats.leaf_value()));
        }

        match self.best_split(&indices, impurity) {
            Some(split) => {
                let at = self.push(Node::Leaf(Vec::new()));
                let left = self.grow(split.left, depth + 1);
                let right = self.grow(split.right, depth + 1);
                self.nodes[at] = Node::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                at
            }
            None => self.push(Node::Leaf(stats.leaf_value())),
        }
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        match self.params.max_features {
            Some(k) if k > 0 && k < self.n_features => {
                sample(&mut *self.rng, self.n_features, k).into_vec()
            }
            _ => (0..self.n_features).collect(),
        }
    }

    fn best_split(&mut self, indices: &[usize], parent_impurity: f64) -> Option<SplitCandidate> {
        let min_leaf = self.params.min_samples_leaf.max(1);
        let n = indices.len();
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in self.candidate_features() {
            let mut sorted = indices.to_vec();
            sorted.sort_by_key(|&i| OrderedFloat(self.x[i][feature]));

            let mut left = Stats::empty(self.target);
            let mut right = Stats::collect(self.target, &sorted);
            for k in 0..n - 1 {
                left.add(self.target, sorted[k]);
                right.remove(self.target, sorted[k]);

                let (left_count, right_count) = (k + 1, n - k - 1);
                if left_count < min_leaf || right_count < min_leaf {
                    continue;
                }
                let here = self.x[sorted[k]][feature];
                let next = self.x[sorted[k + 1]][feature];
                if here >= next {
                    continue;
                }

                let score = left.impurity() + right.impurity();
                let improves = match best {
                    None => true,
                    Some((_, _, best_score)) => score < best_score - IMPURITY_EPSILON,
                };
                if improves {
                    best = Some((feature, here + (next - here) / 2.0, score));
                }
            }
        }

        let (feature, threshold, score) = best?;
        if score >= parent_impurity - IMPURITY_EPSILON {
            return None;
        }
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.x[i][feature] <= threshold);
        Some(SplitCandidate {
            feature,
            threshold,
            left,
            right,
        })
    }
}

/// Running sufficient statistics of a node.
#[derive(Debug, Clone)]
enum Stats {
    Continuous { count: f64, sum: f64, sum_sq: f64 },
    Classes { total: f64, per_class: Vec<f64> },
}

impl Stats {
    fn empty(target: TreeTarget<'_>) -> Self {
        match target {
            TreeTarget::Continuous(_) => Stats::Continuous {
                count: 0.0,
                sum: 0.0,
                sum_sq: 0.0,
            },
            TreeTarget::Classes { n_classes, .. } => Stats::Classes {
                total: 0.0,
                per_class: vec![0.0; n_classes],
            },
        }
    }

    fn collect(target: TreeTarget<'_>, indices: &[usize]) -> Self {
        let mut stats = Self::empty(target);
        for &i in indices {
            stats.add(target, i);
        }
        stats
    }

    fn add(&mut self, target: TreeTarget<'_>, i: usize) {
        self.shift(target, i, 1.0);
    }

    fn remove(&mut self, target: TreeTarget<'_>, i: usize) {
        self.shift(target, i, -1.0);
    }

    fn shift(&mut self, target: TreeTarget<'_>, i: usize, sign: f64) {
        match (self, target) {
            (Stats::Continuous { count, sum, sum_sq }, TreeTarget::Continuous(y)) => {
                *count += sign;
                *sum += sign * y[i];
                *sum_sq += sign * y[i] * y[i];
            }
            (
                Stats::Classes { total, per_class },
                TreeTarget::Classes {
                    labels,
                    class_weights,
                    ..
                },
            ) => {
                let label = labels[i];
                let weight = class_weights.get(label).copied().unwrap_or(1.0);
                *total += sign * weight;
                per_class[label] += sign * weight;
            }
            _ => {}
        }
    }

    /// Impurity scaled by node size: squared error for regression, weighted Gini
    /// times total weight for classification. Child scores are directly summable.
    fn impurity(&self) -> f64 {
        match self {
            Stats::Continuous { count, sum, sum_sq } => {
                if *count <= 0.0 {
                    0.0
                } else {
                    (sum_sq - sum * sum / count).max(0.0)
                }
            }
            Stats::Classes { total, per_class } => {
                if *total <= 0.0 {
                    0.0
                } else {
                    let squares: f64 = per_class.iter().map(|w| w * w).sum();
                    (total - squares / total).max(0.0)
                }
            }
        }
    }

    fn leaf_value(&self) -> Vec<f64> {
        match self {
            Stats::Continuous { count, sum, .. } => {
                vec![if *count > 0.0 { sum / count } else { 0.0 }]
            }
            Stats::Classes { total, per_class } => {
                if *total > 0.0 {
                    per_class.iter().map(|w| w / total).collect()
                } else {
                    per_class.clone()
                }
            }
        }
    }
}
