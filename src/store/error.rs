//! Error types for the status store.

use crate::framework::FrameworkError;
use crate::log::LogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// This node holds no open shard for the partition.
    #[error("Status shard for partition {0} is not open on this node")]
    ShardUnavailable(u32),

    #[error(transparent)]
    Shard(#[from] FrameworkError),

    #[error(transparent)]
    Log(#[from] LogError),
}
