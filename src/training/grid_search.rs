//! Classifier hyperparameter search with stratified k-fold cross validation.

use crate::models::error::ModelError;
use crate::models::forest::{ForestParams, RandomForestClassifier};
use crate::models::metrics::accuracy;
use crate::models::Classifier;
use log::debug;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Values tried for each searched hyperparameter. Every combination is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ClassifierGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![100, 150],
            max_depth: vec![Some(5), Some(10), None],
            min_samples_leaf: vec![1, 3],
        }
    }
}

impl ClassifierGrid {
    /// Expands the grid over `base`. An empty axis keeps the base value.
    pub fn candidates(&self, base: &ForestParams) -> Vec<ForestParams> {
        let or_base = |values: &[usize], base: usize| {
            if values.is_empty() { vec![base] } else { values.to_vec() }
        };
        let n_estimators = or_base(&self.n_estimators, base.n_estimators);
        let min_samples_leaf = or_base(&self.min_samples_leaf, base.min_samples_leaf);
        let max_depth = if self.max_depth.is_empty() {
            vec![base.max_depth]
        } else {
            self.max_depth.clone()
        };

        let mut out = Vec::with_capacity(n_estimators.len() * max_depth.len() * min_samples_leaf.len());
        for &n in &n_estimators {
            for &depth in &max_depth {
                for &leaf in &min_samples_leaf {
                    out.push(ForestParams {
                        n_estimators: n,
                        max_depth: depth,
                        min_samples_leaf: leaf,
                        ..*base
                    });
                }
            }
        }
        out
    }
}

/// Splits sample indices into `k` folds keeping class proportions roughly equal.
///
/// Indices of each class are shuffled with the seed and dealt round-robin, so every
/// fold receives `count_c / k` members of class `c` (plus or minus one).
pub fn stratified_folds(labels: &[usize], k: usize, seed: u64) -> Vec<Vec<usize>> {
    let k = k.max(1);
    let n_classes = labels.iter().max().map_or(0, |m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &label) in labels.iter().enumerate() {
        by_class[label].push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut next = 0;
    for mut members in by_class {
        members.shuffle(&mut rng);
        for index in members {
            folds[next % k].push(index);
            next += 1;
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub params: ForestParams,
    /// Mean validation accuracy of the chosen candidate.
    pub score: f64,
    pub candidates_evaluated: usize,
}

/// Picks the candidate with the best mean cross-validated accuracy. Ties keep the
/// earlier candidate. Returns `None` when there are no candidates or too few samples
/// to form `k` non-empty folds.
pub fn search(
    x: &[Vec<f64>],
    labels: &[usize],
    n_classes: usize,
    candidates: &[ForestParams],
    k: usize,
    seed: u64,
) -> Result<Option<SearchOutcome>, ModelError> {
    if candidates.is_empty() || k < 2 || labels.len() < k {
        return Ok(None);
    }
    let folds = stratified_folds(labels, k, seed);

    let mut best: Option<SearchOutcome> = None;
    for params in candidates {
        let mut total = 0.0;
        for (f, validation) in folds.iter().enumerate() {
            let train: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(g, _)| *g != f)
                .flat_map(|(_, fold)| fold.iter().copied())
                .collect();

            let train_x: Vec<Vec<f64>> = train.iter().map(|&i| x[i].clone()).collect();
            let train_y: Vec<usize> = train.iter().map(|&i| labels[i]).collect();
            let model = RandomForestClassifier::fit(&train_x, &train_y, n_classes, params, seed)?;

            let val_x: Vec<Vec<f64>> = validation.iter().map(|&i| x[i].clone()).collect();
            let val_y: Vec<usize> = validation.iter().map(|&i| labels[i]).collect();
            let predicted = model.predict_batch(&val_x)?;
            total += accuracy(&val_y, &predicted).unwrap_or(0.0);
        }
        let score = total / folds.len() as f64;
        debug!("Grid candidate {:?} scored {:.4}", params, score);

        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(SearchOutcome {
                params: *params,
                score,
                candidates_evaluated: 0,
            });
        }
    }

    Ok(best.map(|outcome| SearchOutcome {
        candidates_evaluated: candidates.len(),
        ..outcome
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forest::MaxFeatures;

    #[test]
    fn test_grid_expansion() {
        let grid = ClassifierGrid::default();
        let candidates = grid.candidates(&ForestParams::classifier());
        assert_eq!(candidates.len(), 12);
        assert!(candidates.iter().all(|c| c.class_weight == ForestParams::classifier().class_weight));

        let empty = ClassifierGrid {
            n_estimators: vec![],
            max_depth: vec![],
            min_samples_leaf: vec![],
        };
        assert_eq!(empty.candidates(&ForestParams::classifier()), vec![ForestParams::classifier()]);
    }

    #[test]
    fn test_folds_are_stratified_and_cover_everything() {
        let labels: Vec<usize> = (0..30).map(|i| if i < 21 { 0 } else { 1 }).collect();
        let folds = stratified_folds(&labels, 3, 42);
        assert_eq!(folds.len(), 3);

        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..30).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.len(), 10);
            let minority = fold.iter().filter(|&&i| labels[i] == 1).count();
            assert!((2..=4).contains(&minority), "minority count {minority}");
        }
    }

    #[test]
    fn test_search_prefers_deeper_trees_on_separable_data() {
        let x: Vec<Vec<f64>> = (0..60).map(|i| vec![(i % 6) as f64]).collect();
        let labels: Vec<usize> = (0..60).map(|i| (i % 6) / 2).collect();
        // A single unbagged stump can split off only one of the three bands.
        let base = ForestParams {
            n_estimators: 1,
            bootstrap: false,
            max_features: MaxFeatures::All,
            ..ForestParams::classifier()
        };
        let candidates = vec![
            ForestParams { max_depth: Some(1), ..base },
            ForestParams { max_depth: None, ..base },
        ];

        let outcome = search(&x, &labels, 3, &candidates, 3, 42).unwrap().unwrap();
        assert_eq!(outcome.params.max_depth, None);
        assert_eq!(outcome.candidates_evaluated, 2);
        assert!(outcome.score > 0.9, "score {}", outcome.score);
    }

    #[test]
    fn test_search_needs_enough_samples() {
        let x = vec![vec![1.0], vec![2.0]];
        let labels = vec![0, 1];
        let result = search(&x, &labels, 2, &[ForestParams::classifier()], 3, 0).unwrap();
        assert!(result.is_none());
    }
}
