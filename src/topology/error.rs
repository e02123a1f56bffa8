//! Error types for pipeline workers.

use crate::log::{LogError, Offset, PartitionId};
use crate::store::StoreError;
use thiserror::Error;

/// Errors that stop a partition worker.
///
/// Every variant is fatal for the worker that raised it: the record's offset is not
/// committed, so the next owner of the partition picks the record up again.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Log failure: {0}")]
    Log(#[from] LogError),

    #[error("Status store failure: {0}")]
    Store(#[from] StoreError),

    /// A record that is not a valid order reached a stage.
    #[error("Unroutable record at {topic}/{partition}@{offset}: {reason}")]
    UnroutableRecord {
        topic: String,
        partition: PartitionId,
        offset: Offset,
        reason: String,
    },
}
