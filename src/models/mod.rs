pub mod error;
pub mod forest;
pub mod label_encoder;
pub mod metrics;
pub mod tree;

use crate::models::error::ModelError;

/// A fitted model predicting a continuous target from a feature vector.
pub trait Regressor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;

    /// Length of the feature vectors the model was fit on.
    fn n_features(&self) -> usize;

    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

/// A fitted model predicting a dense class index from a feature vector.
pub trait Classifier: Send + Sync {
    /// Per-class probabilities, indexed by class.
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;

    fn n_classes(&self) -> usize;

    fn n_features(&self) -> usize;

    /// The most probable class. Ties go to the lowest index.
    fn predict(&self, features: &[f64]) -> Result<usize, ModelError> {
        let proba = self.predict_proba(features)?;
        if proba.is_empty() {
            return Err(ModelError::CorruptModel);
        }
        let mut best = 0;
        for (class, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = class;
            }
        }
        Ok(best)
    }

    fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<usize>, ModelError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}
