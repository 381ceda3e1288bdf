use rst_common::with_errors::thiserror::{self, Error};

#[derive(Debug, Error, PartialEq)]
pub enum AppError {
    #[error("store error: {0}")]
    StoreError(String),

    #[error("dberror: {0}")]
    DbError(String),

    #[error("bucket error: {0}")]
    BucketError(String),
}
