use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Cannot fit a model on an empty training set")]
    EmptyTrainingSet,

    #[error("Feature vector has {actual} values, model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Training set has {features} feature rows but {targets} targets")]
    LengthMismatch { features: usize, targets: usize },

    #[error("Class label {label} is outside the {n_classes} known classes")]
    UnknownClass { label: usize, n_classes: usize },

    #[error("Model structure is inconsistent")]
    CorruptModel,
}

#[derive(Debug, Error)]
pub enum LabelEncoderError {
    #[error("Label encoder has not seen any labels")]
    Empty,

    #[error("Label '{0}' was not seen when the encoder was fit")]
    UnseenLabel(String),

    #[error("Encoded class {0} has no label")]
    UnknownIndex(usize),
}
