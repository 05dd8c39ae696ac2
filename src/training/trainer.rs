use crate::features::preprocess::prepare_series;
use crate::features::samples::{build_samples, Sample};
use crate::features::schema::FeatureSchema;
use crate::models::forest::{ForestParams, RandomForestClassifier, RandomForestRegressor};
use crate::models::label_encoder::LabelEncoder;
use crate::models::metrics::{accuracy, mean_absolute_error};
use crate::models::{Classifier, Regressor};
use crate::training::error::TrainingError;
use crate::training::grid_search::{search, ClassifierGrid};
use crate::types::location::LatLon;
use crate::types::observation::{LocationId, Observation};
use crate::types::required_fields::RequiredField;
use bon::Builder;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Held-out quality figures of a trained pair. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Raw observations the series had before preprocessing, when trained from one.
    pub observations: Option<usize>,
    pub samples: usize,
    pub train_samples: usize,
    pub test_samples: usize,
    /// Mean absolute temperature error on the test split, `None` when it is empty.
    pub mae: Option<f64>,
    /// Condition accuracy on the test split, `None` when it is empty.
    pub accuracy: Option<f64>,
    pub classifier_params: ForestParams,
    /// Mean cross-validated accuracy of the chosen classifier, when a search ran.
    pub cv_accuracy: Option<f64>,
}

/// Everything needed to forecast one location.
///
/// The label encoder only ever decodes this pair's classifier output, and `schema`
/// records the feature layout both models were fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPair {
    pub location: LocationId,
    pub coordinates: LatLon,
    pub schema: FeatureSchema,
    pub regressor: RandomForestRegressor,
    pub classifier: RandomForestClassifier,
    pub label_encoder: LabelEncoder,
    pub metrics: TrainingMetrics,
    pub trained_at: DateTime<Utc>,
}

/// Fits a [`ModelPair`] per location.
#[derive(Debug, Clone, Builder)]
pub struct Trainer {
    #[builder(default = 6)]
    lag: usize,
    #[builder(default = 50)]
    min_observations: usize,
    #[builder(default = RequiredField::STANDARD)]
    required_fields: RequiredField,
    #[builder(default = 0.8)]
    train_fraction: f64,
    #[builder(default = ForestParams::regressor())]
    regressor_params: ForestParams,
    #[builder(default = ForestParams::classifier())]
    classifier_params: ForestParams,
    #[builder(default)]
    classifier_grid: ClassifierGrid,
    #[builder(default = 3)]
    cv_folds: usize,
    #[builder(default = 42)]
    seed: u64,
    #[builder(default = true)]
    refit_on_full_data: bool,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Trainer {
    pub fn lag(&self) -> usize {
        self.lag
    }

    pub fn schema(&self) -> FeatureSchema {
        FeatureSchema::new(self.lag)
    }

    /// Preprocesses a raw series, builds samples and trains on them.
    ///
    /// Series with fewer than `min_observations` raw records are rejected before any
    /// work is done.
    pub fn train_series(
        &self,
        location: LocationId,
        coordinates: LatLon,
        observations: &[Observation],
    ) -> Result<ModelPair, TrainingError> {
        if observations.len() < self.min_observations {
            return Err(TrainingError::InsufficientData {
                location,
                available: observations.len(),
                required: self.min_observations,
            });
        }

        let (series, report) = prepare_series(observations, self.required_fields);
        debug!(
            "'{}': {} of {} observations usable",
            location, report.kept, report.input
        );
        let samples = build_samples(&series, self.lag)?;
        let mut pair = self.train(location, coordinates, &samples)?;
        pair.metrics.observations = Some(observations.len());
        Ok(pair)
    }

    /// Trains the temperature regressor and condition classifier of one location.
    pub fn train(
        &self,
        location: LocationId,
        coordinates: LatLon,
        samples: &[Sample],
    ) -> Result<ModelPair, TrainingError> {
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            return Err(TrainingError::InvalidConfig(format!(
                "train_fraction must be in (0, 1], got {}",
                self.train_fraction
            )));
        }
        let schema = self.schema();
        if let Some(sample) = samples.iter().find(|s| s.features.len() != schema.len()) {
            return Err(TrainingError::InvalidConfig(format!(
                "sample has {} features, lag {} expects {}",
                sample.features.len(),
                self.lag,
                schema.len()
            )));
        }

        let n = samples.len();
        let split = (n as f64 * self.train_fraction).floor() as usize;
        if split == 0 {
            return Err(TrainingError::InsufficientData {
                location,
                available: n,
                required: (1.0 / self.train_fraction).ceil() as usize,
            });
        }

        let x: Vec<Vec<f64>> = samples.iter().map(|s| s.features.clone()).collect();
        let temperatures: Vec<f64> = samples.iter().map(|s| s.temperature).collect();
        let conditions: Vec<_> = samples.iter().map(|s| s.condition).collect();
        let label_encoder = LabelEncoder::fit(&conditions)?;
        let labels = label_encoder.transform(&conditions)?;
        let n_classes = label_encoder.n_classes();

        let (train_x, test_x) = x.split_at(split);
        let (train_t, test_t) = temperatures.split_at(split);
        let (train_y, test_y) = labels.split_at(split);

        let regressor = RandomForestRegressor::fit(train_x, train_t, &self.regressor_params, self.seed)?;

        let (classifier_params, cv_accuracy) = self.choose_classifier(&location, train_x, train_y, n_classes)?;
        let classifier = RandomForestClassifier::fit(train_x, train_y, n_classes, &classifier_params, self.seed)?;

        let mae = mean_absolute_error(test_t, &regressor.predict_batch(test_x)?);
        let accuracy = accuracy(test_y, &classifier.predict_batch(test_x)?);

        let (regressor, classifier) = if self.refit_on_full_data && split < n {
            (
                RandomForestRegressor::fit(&x, &temperatures, &self.regressor_params, self.seed)?,
                RandomForestClassifier::fit(&x, &labels, n_classes, &classifier_params, self.seed)?,
            )
        } else {
            (regressor, classifier)
        };

        info!(
            "Trained '{}' on {} samples ({} train / {} test), MAE {}, accuracy {}, classes {:?}",
            location,
            n,
            split,
            n - split,
            mae.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}")),
            accuracy.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0)),
            label_encoder.classes(),
        );

        Ok(ModelPair {
            location,
            coordinates,
            schema,
            regressor,
            classifier,
            label_encoder,
            metrics: TrainingMetrics {
                observations: None,
                samples: n,
                train_samples: split,
                test_samples: n - split,
                mae,
                accuracy,
                classifier_params,
                cv_accuracy,
            },
            trained_at: Utc::now(),
        })
    }

    fn choose_classifier(
        &self,
        location: &LocationId,
        x: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<(ForestParams, Option<f64>), TrainingError> {
        let mut distinct = labels.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < 2 {
            debug!("'{}': single condition class, skipping classifier search", location);
            return Ok((self.classifier_params, None));
        }

        let candidates = self.classifier_grid.candidates(&self.classifier_params);
        match search(x, labels, n_classes, &candidates, self.cv_folds, self.seed)? {
            Some(outcome) => {
                debug!(
                    "'{}': best of {} classifier candidates {:?} (cv accuracy {:.3})",
                    location, outcome.candidates_evaluated, outcome.params, outcome.score
                );
                Ok((outcome.params, Some(outcome.score)))
            }
            None => Ok((self.classifier_params, None)),
        }
    }
}
