use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Feature window has {actual} records, expected {expected}")]
    WindowLength { expected: usize, actual: usize },
}
