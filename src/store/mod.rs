//! # Partitioned Status Store
//!
//! The queryable view `order id → latest status`, split into one shard per log
//! partition. A node only holds shards for the partitions it currently owns.
//!
//! Each shard is a [`ShardActor`] over [`StatusEntry`] values:
//! - the router worker for that partition is the single writer;
//! - every write carries the log offset it came from, and the entry with the
//!   highest offset wins, so replayed records never roll a status back;
//! - reads go through the same actor, which gives the owning node
//!   read-your-writes once a write has been acknowledged.

pub mod error;

pub use error::*;

use crate::framework::{ShardActor, ShardClient, ShardEntry};
use crate::log::{Offset, OrderLog, PartitionId, Partitioner};
use crate::model::{OrderId, OrderStatus};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};

/// Stored value for one order id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEntry {
    pub status: OrderStatus,
    /// Offset of the `orders` record this status was read from.
    pub offset: Offset,
}

impl ShardEntry for StatusEntry {
    type Key = OrderId;
    type Write = (OrderStatus, Offset);

    fn from_write(_key: &OrderId, (status, offset): (OrderStatus, Offset)) -> Self {
        Self { status, offset }
    }

    /// Last writer wins by offset.
    fn merge(&mut self, (status, offset): (OrderStatus, Offset)) -> bool {
        if offset <= self.offset {
            return false;
        }
        self.status = status;
        self.offset = offset;
        true
    }
}

/// Registry of the status shards held by this node.
pub struct StatusStore {
    partitioner: Partitioner,
    buffer_size: usize,
    shards: RwLock<HashMap<PartitionId, ShardClient<StatusEntry>>>,
}

impl StatusStore {
    pub fn new(partitioner: Partitioner, buffer_size: usize) -> Self {
        Self {
            partitioner,
            buffer_size,
            shards: RwLock::new(HashMap::new()),
        }
    }

    pub fn partitioner(&self) -> Partitioner {
        self.partitioner
    }

    /// Opens the shard for `partition`, spawning its actor if needed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open(&self, partition: PartitionId) -> ShardClient<StatusEntry> {
        let mut shards = self.shards.write();
        if let Some(client) = shards.get(&partition).filter(|c| !c.is_closed()) {
            return client.clone();
        }
        let (actor, client) = ShardActor::<StatusEntry>::new(self.buffer_size);
        tokio::spawn(actor.run(format!("status-{}", partition)));
        shards.insert(partition, client.clone());
        info!(partition, "Status shard opened");
        client
    }

    /// Registers an externally created shard client, e.g. a mock.
    pub fn attach(&self, partition: PartitionId, client: ShardClient<StatusEntry>) {
        self.shards.write().insert(partition, client);
    }

    /// Forgets the shard. Its actor stops once the remaining clients are dropped.
    pub fn close(&self, partition: PartitionId) {
        if self.shards.write().remove(&partition).is_some() {
            info!(partition, "Status shard closed");
        }
    }

    pub fn shard(&self, partition: PartitionId) -> Option<ShardClient<StatusEntry>> {
        self.shards.read().get(&partition).cloned()
    }

    pub fn open_partitions(&self) -> Vec<PartitionId> {
        let mut partitions: Vec<_> = self.shards.read().keys().copied().collect();
        partitions.sort_unstable();
        partitions
    }

    /// Reads the status for `id` from the local shard.
    ///
    /// `Ok(None)` means the shard is open but has never seen the id.
    pub async fn get(&self, id: OrderId) -> Result<Option<OrderStatus>, StoreError> {
        let partition = self.partitioner.partition_for(&id);
        let shard = self
            .shard(partition)
            .ok_or(StoreError::ShardUnavailable(partition))?;
        let entry = shard.get(id).await?;
        Ok(entry.map(|entry| entry.status))
    }

    /// Materializes one `orders` record. Only the partition's router calls this.
    pub(crate) async fn record(
        &self,
        partition: PartitionId,
        id: OrderId,
        status: OrderStatus,
        offset: Offset,
    ) -> Result<bool, StoreError> {
        let shard = self
            .shard(partition)
            .ok_or(StoreError::ShardUnavailable(partition))?;
        Ok(shard.put(id, (status, offset)).await?)
    }

    /// Rebuilds a freshly opened shard from `topic` records in `[0, upto)`.
    pub async fn restore(
        &self,
        log: &dyn OrderLog,
        topic: &str,
        partition: PartitionId,
        upto: Offset,
    ) -> Result<usize, StoreError> {
        let records = log.read_range(topic, partition, 0, upto).await?;
        let mut restored = 0;
        for record in &records {
            let order = record.decode()?;
            if self.record(partition, order.id, order.status, record.offset).await? {
                restored += 1;
            }
        }
        debug!(partition, upto, restored, "Status shard restored");
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemoryLog;
    use crate::model::Order;

    #[test]
    fn entry_keeps_highest_offset() {
        let id = OrderId::generate();
        let mut entry = StatusEntry::from_write(&id, (OrderStatus::Pending, 2));
        assert!(!entry.merge((OrderStatus::Shipped, 1)));
        assert!(!entry.merge((OrderStatus::Shipped, 2)));
        assert!(entry.merge((OrderStatus::InventoryChecking, 5)));
        assert_eq!(
            entry,
            StatusEntry {
                status: OrderStatus::InventoryChecking,
                offset: 5
            }
        );
    }

    #[tokio::test]
    async fn get_requires_an_open_shard() {
        let store = StatusStore::new(Partitioner::new(1), 8);
        let id = OrderId::generate();
        assert!(matches!(store.get(id).await, Err(StoreError::ShardUnavailable(0))));

        store.open(0);
        assert_eq!(store.get(id).await.unwrap(), None);

        store.record(0, id, OrderStatus::Pending, 0).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), Some(OrderStatus::Pending));

        store.close(0);
        assert!(store.open_partitions().is_empty());
    }

    #[tokio::test]
    async fn restore_replays_the_partition_prefix() {
        let log = MemoryLog::new(1);
        let mut order = Order::new("widget");
        log.append("orders", &order).await.unwrap();
        order.advance_to(OrderStatus::InventoryChecking);
        log.append("orders", &order).await.unwrap();
        order.advance_to(OrderStatus::Shipped);
        log.append("orders", &order).await.unwrap();

        let store = StatusStore::new(log.partitioner(), 8);
        store.open(0);
        // Only the first two records were committed by the previous owner
        let restored = store.restore(&log, "orders", 0, 2).await.unwrap();
        assert_eq!(restored, 2);
        assert_eq!(
            store.get(order.id).await.unwrap(),
            Some(OrderStatus::InventoryChecking)
        );
    }
}
