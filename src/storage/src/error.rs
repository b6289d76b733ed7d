use std::result;

use arrow::error::ArrowError;
use common::error::CommonError;
use thiserror::Error;

pub type Result<T> = result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("internal {0:?}")]
    Internal(String),
    #[error("invalid parameter {0:?}")]
    InvalidParameter(String),
    #[error("not yet supported {0:?}")]
    NotYetSupported(String),
    #[error("common {0:?}")]
    Common(#[from] CommonError),
    #[error("arrow {0:?}")]
    Arrow(#[from] ArrowError),
}

impl StoreError {
    pub fn nyi<T>(msg: impl Into<String>) -> Result<T> {
        Err(StoreError::NotYetSupported(msg.into()))
    }
}
