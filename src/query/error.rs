//! Error types for status queries.

use crate::log::PartitionId;
use crate::model::OrderId;
use crate::store::StoreError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// The node responsible for the id has never seen it.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A forwarded query reached a node that no longer owns the partition.
    #[error("Node {node} does not own partition {partition}")]
    NotOwner { node: String, partition: PartitionId },

    /// The owning node has not opened the partition's shard yet.
    #[error("Status shard for partition {0} is unavailable")]
    ShardUnavailable(PartitionId),

    /// The remote node could not be reached or did not answer.
    #[error("Transport failure querying {node}: {source}")]
    Transport {
        node: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected response {status} from {node}")]
    UnexpectedResponse { node: String, status: u16 },

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Query cancelled")]
    Cancelled,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Local store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for QueryError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ShardUnavailable(partition) => QueryError::ShardUnavailable(partition),
            other => QueryError::Store(other),
        }
    }
}

impl QueryError {
    /// True for failures that say nothing about whether the order exists.
    pub fn is_lookup_failure(&self) -> bool {
        !matches!(self, QueryError::OrderNotFound(_))
    }
}
