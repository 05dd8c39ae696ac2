use crate::features::error::FeatureError;
use crate::models::error::{LabelEncoderError, ModelError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Seed window has {actual} records, at least {required} required")]
    SeedWindowTooShort { required: usize, actual: usize },

    #[error(
        "Model was trained with feature schema v{model_version} ({model_len} features), \
         forecaster uses v{expected_version} ({expected_len} features)"
    )]
    SchemaMismatch {
        model_version: u32,
        model_len: usize,
        expected_version: u32,
        expected_len: usize,
    },

    #[error("Requested horizon of {requested} hours exceeds the maximum of {max}")]
    HorizonTooLong { requested: usize, max: usize },

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    LabelEncoder(#[from] LabelEncoderError),
}
