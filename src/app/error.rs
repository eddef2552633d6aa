use std::error::Error as StdError;
use thiserror::Error;

use crate::app::models::TaskId;

pub type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read tasks: {0}")]
    StorageRead(#[source] BoxError),

    #[error("failed to write tasks: {0}")]
    StorageWrite(#[source] BoxError),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),
}

impl StoreError {
    pub fn read(err: impl Into<BoxError>) -> StoreError {
        StoreError::StorageRead(err.into())
    }

    pub fn write(err: impl Into<BoxError>) -> StoreError {
        StoreError::StorageWrite(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
