pub mod companion;
pub mod error;
pub mod forecaster;
pub mod symbol;
