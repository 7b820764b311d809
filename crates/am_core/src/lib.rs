pub mod app_error;
pub mod audit;
pub mod config;
pub mod db;
pub mod fingerprint;
pub mod identity;
pub mod merge;
pub mod run;
pub mod sanity;
pub mod schema;
pub mod store;
pub mod store_memory;
pub mod store_sqlite;
pub mod types;

pub use app_error::AppError;
