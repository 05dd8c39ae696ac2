pub mod error;
pub mod forecast_cache;
pub mod model_registry;
