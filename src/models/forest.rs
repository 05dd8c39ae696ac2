//! Bagged ensembles of [`DecisionTree`]s.
//!
//! Fitting is deterministic for a given seed: a master `ChaCha8Rng` hands every tree
//! its own seed, which drives both the bootstrap sample and the feature subsets.

use crate::models::error::ModelError;
use crate::models::tree::{DecisionTree, TreeParams, TreeTarget};
use crate::models::{Classifier, Regressor};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// How many features each split may look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Count(usize),
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> Option<usize> {
        match self {
            MaxFeatures::All => None,
            MaxFeatures::Sqrt => Some(((n_features as f64).sqrt().round() as usize).max(1)),
            MaxFeatures::Count(k) => Some((*k).clamp(1, n_features.max(1))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeight {
    Uniform,
    /// Weights inversely proportional to class frequency: `n / (k * count_c)`.
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub class_weight: ClassWeight,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
            class_weight: ClassWeight::Uniform,
        }
    }
}

impl ForestParams {
    pub fn regressor() -> Self {
        Self::default()
    }

    pub fn classifier() -> Self {
        Self {
            max_features: MaxFeatures::Sqrt,
            class_weight: ClassWeight::Balanced,
            ..Self::default()
        }
    }

    fn tree_params(&self, n_features: usize) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features.resolve(n_features),
        }
    }
}

fn validate(x: &[Vec<f64>], targets: usize) -> Result<usize, ModelError> {
    let n_features = x.first().map(Vec::len).ok_or(ModelError::EmptyTrainingSet)?;
    if x.len() != targets {
        return Err(ModelError::LengthMismatch {
            features: x.len(),
            targets,
        });
    }
    Ok(n_features)
}

fn fit_trees(
    x: &[Vec<f64>],
    target: TreeTarget<'_>,
    params: &ForestParams,
    seed: u64,
) -> Result<Vec<DecisionTree>, ModelError> {
    let n_features = validate(x, x.len())?;
    let tree_params = params.tree_params(n_features);
    let mut master = ChaCha8Rng::seed_from_u64(seed);

    (0..params.n_estimators.max(1))
        .map(|_| {
            let mut rng = ChaCha8Rng::seed_from_u64(master.gen());
            let indices = if params.bootstrap {
                (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect()
            } else {
                (0..x.len()).collect()
            };
            DecisionTree::fit(x, target, indices, &tree_params, &mut rng)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams, seed: u64) -> Result<Self, ModelError> {
        let n_features = validate(x, y.len())?;
        let trees = fit_trees(x, TreeTarget::Continuous(y), params, seed)?;
        Ok(Self {
            params: *params,
            trees,
            n_features,
        })
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }
}

impl Regressor for RandomForestRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        let mut total = 0.0;
        for tree in &self.trees {
            let leaf = tree.leaf_for(features)?;
            total += leaf.first().copied().ok_or(ModelError::CorruptModel)?;
        }
        Ok(total / self.trees.len().max(1) as f64)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: ForestParams,
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForestClassifier {
    /// Fits on dense class indices in `0..n_classes`.
    pub fn fit(
        x: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        params: &ForestParams,
        seed: u64,
    ) -> Result<Self, ModelError> {
        let n_features = validate(x, labels.len())?;
        if let Some(&label) = labels.iter().find(|&&label| label >= n_classes) {
            return Err(ModelError::UnknownClass { label, n_classes });
        }

        let class_weights = class_weights(labels, n_classes, params.class_weight);
        let target = TreeTarget::Classes {
            labels,
            class_weights: &class_weights,
            n_classes,
        };
        let trees = fit_trees(x, target, params, seed)?;
        Ok(Self {
            params: *params,
            trees,
            n_features,
            n_classes,
        })
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }
}

impl Classifier for RandomForestClassifier {
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        let mut totals = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = tree.leaf_for(features)?;
            for (total, p) in totals.iter_mut().zip(leaf) {
                *total += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        Ok(totals.into_iter().map(|t| t / n).collect())
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

fn class_weights(labels: &[usize], n_classes: usize, mode: ClassWeight) -> Vec<f64> {
    match mode {
        ClassWeight::Uniform => vec![1.0; n_classes],
        ClassWeight::Balanced => {
            let mut counts = vec![0usize; n_classes];
            for &label in labels {
                counts[label] += 1;
            }
            let present = counts.iter().filter(|&&c| c > 0).count().max(1) as f64;
            let n = labels.len() as f64;
            counts
                .into_iter()
                .map(|c| if c == 0 { 0.0 } else { n / (present * c as f64) })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i % 4) as f64]).collect();
        let y = (0..n).map(|i| 2.0 * i as f64 + 1.0).collect();
        (x, y)
    }

    fn small() -> ForestParams {
        ForestParams {
            n_estimators: 15,
            ..ForestParams::regressor()
        }
    }

    #[test]
    fn test_regressor_tracks_trend() {
        let (x, y) = linear_data(60);
        let forest = RandomForestRegressor::fit(&x, &y, &small(), 42).unwrap();
        let low = forest.predict(&[5.0, 1.0]).unwrap();
        let high = forest.predict(&[55.0, 3.0]).unwrap();
        assert!(low < high);
        assert!((low - 11.0).abs() < 10.0, "low {low}");
        assert!((high - 111.0).abs() < 10.0, "high {high}");
    }

    #[test]
    fn test_same_seed_same_model() {
        let (x, y) = linear_data(40);
        let a = RandomForestRegressor::fit(&x, &y, &small(), 3).unwrap();
        let b = RandomForestRegressor::fit(&x, &y, &small(), 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_classifier_probabilities_sum_to_one() {
        let x: Vec<Vec<f64>> = (0..45)
            .map(|i| {
                let class = (i % 3) as f64;
                vec![class * 10.0, class * 2.0 + 1.0]
            })
            .collect();
        let labels: Vec<usize> = (0..45).map(|i| i % 3).collect();
        let params = ForestParams {
            n_estimators: 10,
            ..ForestParams::classifier()
        };
        let forest = RandomForestClassifier::fit(&x, &labels, 3, &params, 42).unwrap();

        let proba = forest.predict_proba(&[10.0, 3.0]).unwrap();
        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(forest.predict(&[20.0, 5.0]).unwrap(), 2);
    }

    #[test]
    fn test_single_class_always_predicts_it() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let labels = vec![0; 10];
        let forest = RandomForestClassifier::fit(&x, &labels, 1, &ForestParams::classifier(), 1).unwrap();
        assert_eq!(forest.predict(&[100.0]).unwrap(), 0);
    }

    #[test]
    fn test_balanced_weights() {
        let weights = class_weights(&[0, 0, 0, 1], 3, ClassWeight::Balanced);
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((weights[1] - 2.0).abs() < 1e-12);
        assert_eq!(weights[2], 0.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let (x, y) = linear_data(5);
        assert!(matches!(
            RandomForestRegressor::fit(&x, &y[..4], &small(), 0),
            Err(ModelError::LengthMismatch { .. })
        ));
        assert!(matches!(
            RandomForestRegressor::fit(&[], &[], &small(), 0),
            Err(ModelError::EmptyTrainingSet)
        ));
        assert!(matches!(
            RandomForestClassifier::fit(&x, &[0, 1, 2, 3, 4], 3, &small(), 0),
            Err(ModelError::UnknownClass { label: 3, n_classes: 3 })
        ));
    }
}
