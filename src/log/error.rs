//! Error types for the order log.

use thiserror::Error;

/// Errors raised while appending to or consuming from the order log.
#[derive(Debug, Error)]
pub enum LogError {
    /// The log has been shut down; no further appends or polls succeed.
    #[error("Order log closed")]
    Closed,

    /// A record could not be serialized for append.
    #[error("Failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    /// A record read back from the log is not a valid order.
    #[error("Failed to decode record at {topic}/{partition}@{offset}: {source}")]
    Decode {
        topic: String,
        partition: u32,
        offset: u64,
        #[source]
        source: serde_json::Error,
    },
}
