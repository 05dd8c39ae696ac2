pub mod error;
pub mod evaluation;
pub mod grid_search;
pub mod trainer;
