use crate::features::error::FeatureError;
use crate::models::error::{LabelEncoderError, ModelError};
use crate::types::observation::LocationId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Not enough data for '{location}': {available} usable, {required} required")]
    InsufficientData {
        location: LocationId,
        available: usize,
        required: usize,
    },

    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    LabelEncoder(#[from] LabelEncoderError),

    #[error("Failed to read evaluation log '{0}'")]
    EvaluationLogRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write evaluation log '{0}'")]
    EvaluationLogWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse evaluation log")]
    EvaluationLogParse(#[from] serde_json::Error),
}
