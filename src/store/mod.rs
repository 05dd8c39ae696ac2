pub mod error;
pub mod history_store;
pub mod parquet_store;
