use crate::log::LogError;
use crate::query::QueryError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors raised while starting or stopping an [`OrderNode`](super::OrderNode).
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Log(#[from] LogError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// A node task panicked or was aborted.
    #[error("Task failed: {0}")]
    Task(String),
}
