pub mod config;
pub mod error;
pub mod query;
pub mod types;

pub use types::DEFAULT_BATCH_SIZE;
pub use types::DEFAULT_MAX_LEAF_RECORDS;
