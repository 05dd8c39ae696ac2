pub mod encoder;
pub mod error;
pub mod preprocess;
pub mod samples;
pub mod schema;
pub mod time_features;
