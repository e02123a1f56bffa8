//! # Order Log
//!
//! The ordered, partitioned, append-only log that every stage consumes from and
//! produces to. Records are keyed by [`OrderId`]; the [`Partitioner`] maps a key to
//! the same partition number on every topic, so all records for one order land in
//! the same partition everywhere.
//!
//! The pipeline only talks to the [`OrderLog`] trait. [`MemoryLog`] is the
//! in-process implementation used by the demo and the test suites; a broker-backed
//! log plugs in behind the same trait.

pub mod error;
pub mod memory;

pub use error::*;
pub use memory::MemoryLog;

use crate::model::{Order, OrderId};
use async_trait::async_trait;

/// Partition number within a topic.
pub type PartitionId = u32;

/// Position of a record within its partition. The first record is at offset 0.
pub type Offset = u64;

/// Deterministic mapping from order id to partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    partitions: u32,
}

impl Partitioner {
    /// A partitioner over `partitions` partitions (at least one).
    pub fn new(partitions: u32) -> Self {
        Self {
            partitions: partitions.max(1),
        }
    }

    pub fn partition_count(&self) -> u32 {
        self.partitions
    }

    /// CRC32 of the id bytes, modulo the partition count.
    pub fn partition_for(&self, id: &OrderId) -> PartitionId {
        crc32fast::hash(id.as_bytes()) % self.partitions
    }

    pub fn partitions(&self) -> impl Iterator<Item = PartitionId> {
        0..self.partitions
    }
}

/// A single record as stored in the log.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub topic: String,
    pub key: OrderId,
    pub partition: PartitionId,
    pub offset: Offset,
    /// JSON-encoded [`Order`].
    pub value: Vec<u8>,
}

impl LogRecord {
    pub fn encode(order: &Order) -> Result<Vec<u8>, LogError> {
        serde_json::to_vec(order).map_err(LogError::Encode)
    }

    pub fn decode(&self) -> Result<Order, LogError> {
        serde_json::from_slice(&self.value).map_err(|source| LogError::Decode {
            topic: self.topic.clone(),
            partition: self.partition,
            offset: self.offset,
            source,
        })
    }
}

/// An ordered, partitioned log with consumer-group offsets.
///
/// Topic names are plain strings taken from
/// [`PipelineConfig`](crate::topology::PipelineConfig).
#[async_trait]
pub trait OrderLog: Send + Sync + 'static {
    /// The partitioner shared by every topic of this log.
    fn partitioner(&self) -> Partitioner;

    /// Appends `order` keyed by its id and returns where it landed.
    async fn append(&self, topic: &str, order: &Order) -> Result<(PartitionId, Offset), LogError>;

    /// Waits until the record at `offset` exists and returns it.
    async fn poll(
        &self,
        topic: &str,
        partition: PartitionId,
        offset: Offset,
    ) -> Result<LogRecord, LogError>;

    /// Returns the records in `[from, to)` that currently exist.
    async fn read_range(
        &self,
        topic: &str,
        partition: PartitionId,
        from: Offset,
        to: Offset,
    ) -> Result<Vec<LogRecord>, LogError>;

    /// Records `next_offset` as the position `group` resumes from.
    async fn commit(
        &self,
        group: &str,
        topic: &str,
        partition: PartitionId,
        next_offset: Offset,
    ) -> Result<(), LogError>;

    /// The committed resume position for `group`, or 0 if none.
    async fn committed(
        &self,
        group: &str,
        topic: &str,
        partition: PartitionId,
    ) -> Result<Offset, LogError>;
}
