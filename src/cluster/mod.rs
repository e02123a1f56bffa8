//! # Partition Ownership
//!
//! Maps partitions to the node currently responsible for them.
//!
//! - [`PartitionMap`] is an immutable snapshot: partition → owning [`NodeInfo`].
//! - [`Coordinator`] stands in for the external coordination service. It publishes
//!   snapshots; a rebalance swaps in a whole new map.
//! - [`ClusterView`] is a node's read handle on the latest snapshot plus the
//!   identity of the local node. Readers clone the current `Arc` out of a
//!   `tokio::sync::watch` channel, so a rebalance never blocks or tears a read.

pub mod error;

pub use error::*;

use crate::log::{PartitionId, Partitioner};
use crate::model::OrderId;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Network identity of a node's query endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeInfo {
    pub host: String,
    pub port: u16,
}

impl NodeInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl From<SocketAddr> for NodeInfo {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl Display for NodeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Immutable partition → owner assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMap {
    partitioner: Partitioner,
    owners: Vec<NodeInfo>,
    epoch: u64,
}

impl PartitionMap {
    /// Create from an explicit owner per partition.
    pub fn from_owners(partitioner: Partitioner, owners: Vec<NodeInfo>) -> Result<Self, ClusterError> {
        if owners.len() != partitioner.partition_count() as usize {
            return Err(ClusterError::IncompleteAssignment {
                expected: partitioner.partition_count(),
                actual: owners.len(),
            });
        }
        Ok(Self {
            partitioner,
            owners,
            epoch: 0,
        })
    }

    /// Deals partitions out to `nodes` in turn.
    pub fn round_robin(partitioner: Partitioner, nodes: &[NodeInfo]) -> Result<Self, ClusterError> {
        if nodes.is_empty() {
            return Err(ClusterError::NoNodes);
        }
        let owners = partitioner
            .partitions()
            .map(|p| nodes[p as usize % nodes.len()].clone())
            .collect();
        Self::from_owners(partitioner, owners)
    }

    pub fn partitioner(&self) -> Partitioner {
        self.partitioner
    }

    /// Incremented on every reassignment.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn partition_for(&self, id: &OrderId) -> PartitionId {
        self.partitioner.partition_for(id)
    }

    pub fn owner_of_partition(&self, partition: PartitionId) -> Option<&NodeInfo> {
        self.owners.get(partition as usize)
    }

    /// Partition and owning node for an order id.
    pub fn owner_of(&self, id: &OrderId) -> (PartitionId, &NodeInfo) {
        let partition = self.partition_for(id);
        // from_owners guarantees one owner per partition
        (partition, &self.owners[partition as usize])
    }

    pub fn partitions_owned_by(&self, node: &NodeInfo) -> Vec<PartitionId> {
        self.owners
            .iter()
            .enumerate()
            .filter(|(_, owner)| *owner == node)
            .map(|(p, _)| p as PartitionId)
            .collect()
    }

    /// A copy of this map with `partition` handed to `node`.
    pub fn reassign(&self, partition: PartitionId, node: NodeInfo) -> Result<Self, ClusterError> {
        let mut next = self.clone();
        let slot = next
            .owners
            .get_mut(partition as usize)
            .ok_or(ClusterError::UnknownPartition(partition))?;
        *slot = node;
        next.epoch += 1;
        Ok(next)
    }
}

/// Resolves which node owns an order id, and who "we" are.
pub trait OwnershipResolver: Send + Sync + 'static {
    fn local_node(&self) -> &NodeInfo;

    fn owner_of(&self, id: &OrderId) -> (PartitionId, NodeInfo);

    fn is_local(&self, id: &OrderId) -> bool {
        self.owner_of(id).1 == *self.local_node()
    }
}

/// Publishes partition maps to every node that subscribed.
#[derive(Clone)]
pub struct Coordinator {
    sender: Arc<watch::Sender<Arc<PartitionMap>>>,
}

impl Coordinator {
    pub fn new(initial: PartitionMap) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn current(&self) -> Arc<PartitionMap> {
        self.sender.borrow().clone()
    }

    /// Swaps in a new assignment. Readers see either the old or the new map.
    pub fn rebalance(&self, map: PartitionMap) {
        info!(epoch = map.epoch(), "Rebalance published");
        self.sender.send_replace(Arc::new(map));
    }

    /// Moves one partition to `node`.
    pub fn move_partition(&self, partition: PartitionId, node: NodeInfo) -> Result<(), ClusterError> {
        let next = self.current().reassign(partition, node)?;
        self.rebalance(next);
        Ok(())
    }

    pub fn view(&self, local: NodeInfo) -> ClusterView {
        ClusterView {
            local,
            receiver: self.sender.subscribe(),
        }
    }
}

/// A node's handle on the current assignment.
#[derive(Clone)]
pub struct ClusterView {
    local: NodeInfo,
    receiver: watch::Receiver<Arc<PartitionMap>>,
}

impl ClusterView {
    pub fn snapshot(&self) -> Arc<PartitionMap> {
        self.receiver.borrow().clone()
    }

    pub fn local_partitions(&self) -> Vec<PartitionId> {
        self.snapshot().partitions_owned_by(&self.local)
    }

    /// Waits for the next published map. Returns `None` once the coordinator is gone.
    pub async fn changed(&mut self) -> Option<Arc<PartitionMap>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }
}

impl OwnershipResolver for ClusterView {
    fn local_node(&self) -> &NodeInfo {
        &self.local
    }

    fn owner_of(&self, id: &OrderId) -> (PartitionId, NodeInfo) {
        let map = self.snapshot();
        let (partition, owner) = map.owner_of(id);
        (partition, owner.clone())
    }
}
