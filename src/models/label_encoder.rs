use crate::models::error::LabelEncoderError;
use crate::types::condition::ConditionLabel;
use serde::{Deserialize, Serialize};

/// Maps condition labels to dense class indices and back.
///
/// The vocabulary is the sorted set of labels seen at fit time. An encoder belongs to
/// exactly one classifier; a class index is only meaningful to the encoder that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<ConditionLabel>,
}

impl LabelEncoder {
    pub fn fit(labels: &[ConditionLabel]) -> Result<Self, LabelEncoderError> {
        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();
        if classes.is_empty() {
            return Err(LabelEncoderError::Empty);
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[ConditionLabel] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, label: ConditionLabel) -> Result<usize, LabelEncoderError> {
        self.classes
            .binary_search(&label)
            .map_err(|_| LabelEncoderError::UnseenLabel(label.to_string()))
    }

    pub fn transform(&self, labels: &[ConditionLabel]) -> Result<Vec<usize>, LabelEncoderError> {
        labels.iter().map(|label| self.encode(*label)).collect()
    }

    pub fn decode(&self, index: usize) -> Result<ConditionLabel, LabelEncoderError> {
        self.classes
            .get(index)
            .copied()
            .ok_or(LabelEncoderError::UnknownIndex(index))
    }

    pub fn inverse_transform(&self, indices: &[usize]) -> Result<Vec<ConditionLabel>, LabelEncoderError> {
        indices.iter().map(|index| self.decode(*index)).collect()
    }
}
