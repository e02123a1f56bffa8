//! In-process [`OrderLog`] implementation.
//!
//! Each topic partition is a `Vec` of records guarded by a short-lived lock plus a
//! `Notify` that wakes consumers tailing the partition. Several nodes in one
//! process share a single `Arc<MemoryLog>`, which is how the multi-node tests and
//! the demo model a cluster.

use super::{LogError, LogRecord, Offset, OrderLog, PartitionId, Partitioner};
use crate::model::{Order, OrderId, OrderStatus};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info};

#[derive(Default)]
struct PartitionLog {
    records: Mutex<Vec<LogRecord>>,
    appended: Notify,
}

pub struct MemoryLog {
    partitioner: Partitioner,
    partitions: RwLock<HashMap<(String, PartitionId), Arc<PartitionLog>>>,
    offsets: Mutex<HashMap<(String, String, PartitionId), Offset>>,
    closed: AtomicBool,
}

impl MemoryLog {
    pub fn new(partitions: u32) -> Self {
        Self {
            partitioner: Partitioner::new(partitions),
            partitions: RwLock::new(HashMap::new()),
            offsets: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn partition(&self, topic: &str, partition: PartitionId) -> Arc<PartitionLog> {
        let key = (topic.to_string(), partition);
        if let Some(log) = self.partitions.read().get(&key) {
            return log.clone();
        }
        self.partitions.write().entry(key).or_default().clone()
    }

    /// Shuts the log down. Pending and future polls fail with [`LogError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for log in self.partitions.read().values() {
            log.appended.notify_waiters();
        }
        info!("Order log closed");
    }

    /// Snapshot of every record currently in a topic partition.
    pub fn records(&self, topic: &str, partition: PartitionId) -> Vec<LogRecord> {
        self.partition(topic, partition).records.lock().clone()
    }

    /// Statuses carried by every record for `id` on `topic`, in log order.
    pub fn status_history(&self, topic: &str, id: &OrderId) -> Vec<OrderStatus> {
        let partition = self.partitioner.partition_for(id);
        self.records(topic, partition)
            .iter()
            .filter(|record| record.key == *id)
            .filter_map(|record| record.decode().ok())
            .map(|order| order.status)
            .collect()
    }

    /// Appends raw bytes, bypassing encoding. Lets tests inject corrupt records.
    pub fn append_raw(&self, topic: &str, key: OrderId, value: Vec<u8>) -> (PartitionId, Offset) {
        let partition = self.partitioner.partition_for(&key);
        let log = self.partition(topic, partition);
        let offset = {
            let mut records = log.records.lock();
            let offset = records.len() as Offset;
            records.push(LogRecord {
                topic: topic.to_string(),
                key,
                partition,
                offset,
                value,
            });
            offset
        };
        log.appended.notify_waiters();
        (partition, offset)
    }

    fn ensure_open(&self) -> Result<(), LogError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(LogError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OrderLog for MemoryLog {
    fn partitioner(&self) -> Partitioner {
        self.partitioner
    }

    async fn append(&self, topic: &str, order: &Order) -> Result<(PartitionId, Offset), LogError> {
        self.ensure_open()?;
        let value = LogRecord::encode(order)?;
        let (partition, offset) = self.append_raw(topic, order.id, value);
        debug!(topic, partition, offset, order_id = %order.id, status = %order.status, "Appended");
        Ok((partition, offset))
    }

    async fn poll(
        &self,
        topic: &str,
        partition: PartitionId,
        offset: Offset,
    ) -> Result<LogRecord, LogError> {
        let log = self.partition(topic, partition);
        loop {
            // Register interest before checking so an append in between is not missed.
            let appended = log.appended.notified();
            self.ensure_open()?;
            if let Some(record) = log.records.lock().get(offset as usize).cloned() {
                return Ok(record);
            }
            appended.await;
        }
    }

    async fn read_range(
        &self,
        topic: &str,
        partition: PartitionId,
        from: Offset,
        to: Offset,
    ) -> Result<Vec<LogRecord>, LogError> {
        self.ensure_open()?;
        let log = self.partition(topic, partition);
        let records = log.records.lock();
        let end = (to as usize).min(records.len());
        let start = (from as usize).min(end);
        Ok(records[start..end].to_vec())
    }

    async fn commit(
        &self,
        group: &str,
        topic: &str,
        partition: PartitionId,
        next_offset: Offset,
    ) -> Result<(), LogError> {
        self.ensure_open()?;
        self.offsets
            .lock()
            .insert((group.to_string(), topic.to_string(), partition), next_offset);
        Ok(())
    }

    async fn committed(
        &self,
        group: &str,
        topic: &str,
        partition: PartitionId,
    ) -> Result<Offset, LogError> {
        self.ensure_open()?;
        Ok(self
            .offsets
            .lock()
            .get(&(group.to_string(), topic.to_string(), partition))
            .copied()
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn append_assigns_sequential_offsets_per_partition() {
        let log = MemoryLog::new(4);
        let order = Order::new("widget");
        let (p1, o1) = log.append("orders", &order).await.unwrap();
        let (p2, o2) = log.append("orders", &order).await.unwrap();
        assert_eq!(p1, p2);
        assert_eq!((o1, o2), (0, 1));

        let record = log.poll("orders", p1, 1).await.unwrap();
        assert_eq!(record.decode().unwrap(), order);
    }

    #[tokio::test]
    async fn poll_waits_for_future_append() {
        let log = Arc::new(MemoryLog::new(1));
        let waiter = {
            let log = log.clone();
            tokio::spawn(async move { log.poll("orders", 0, 0).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let order = Order::new("gadget");
        log.append("orders", &order).await.unwrap();
        let record = waiter.await.unwrap().unwrap();
        assert_eq!(record.key, order.id);
    }

    #[tokio::test]
    async fn close_wakes_pollers() {
        let log = Arc::new(MemoryLog::new(1));
        let waiter = {
            let log = log.clone();
            tokio::spawn(async move { log.poll("orders", 0, 0).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        log.close();
        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(LogError::Closed)));
        assert!(matches!(
            log.append("orders", &Order::new("late")).await,
            Err(LogError::Closed)
        ));
    }

    #[tokio::test]
    async fn committed_offsets_default_to_zero() {
        let log = MemoryLog::new(2);
        assert_eq!(log.committed("router", "orders", 1).await.unwrap(), 0);
        log.commit("router", "orders", 1, 7).await.unwrap();
        assert_eq!(log.committed("router", "orders", 1).await.unwrap(), 7);
        assert_eq!(log.committed("other", "orders", 1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_range_clamps_to_existing_records() {
        let log = MemoryLog::new(1);
        for _ in 0..3 {
            log.append("orders", &Order::new("x")).await.unwrap();
        }
        assert_eq!(log.read_range("orders", 0, 1, 10).await.unwrap().len(), 2);
        assert!(log.read_range("orders", 0, 5, 10).await.unwrap().is_empty());
    }
}
