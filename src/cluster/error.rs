//! Error types for partition assignment.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClusterError {
    /// A partition map needs at least one node.
    #[error("No nodes available for partition assignment")]
    NoNodes,

    /// Every partition must have exactly one owner.
    #[error("Partition assignment covers {actual} of {expected} partitions")]
    IncompleteAssignment { expected: u32, actual: usize },

    #[error("Unknown partition: {0}")]
    UnknownPartition(u32),
}
