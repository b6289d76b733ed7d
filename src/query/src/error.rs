use std::result;

use arrow::error::ArrowError;
use common::error::CommonError;
use datafusion_common::DataFusionError;
use storage::error::StoreError;
use thiserror::Error;

pub type Result<T> = result::Result<T, QueryError>;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("internal {0:?}")]
    Internal(String),
    #[error("plan {0:?}")]
    Plan(String),
    #[error("execution {0:?}")]
    Execution(String),
    /// Star-tree index disagrees with itself or with the query it was selected for.
    #[error("star-tree {0:?}")]
    StarTree(String),
    #[error("datafusion {0:?}")]
    DataFusion(#[from] DataFusionError),
    #[error("arrow {0:?}")]
    Arrow(#[from] ArrowError),
    #[error("common {0:?}")]
    Common(#[from] CommonError),
    #[error("store {0:?}")]
    Store(#[from] StoreError),
}

