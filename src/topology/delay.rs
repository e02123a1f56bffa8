//! Injectable processing delay for the router.
//!
//! The router pauses before branching to stand in for real work. The pause is an
//! async sleep on the partition's own worker task, so it holds up that partition
//! only.

use crate::log::PartitionId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

#[async_trait]
pub trait Delay: Send + Sync + 'static {
    async fn pause(&self, partition: PartitionId);
}

/// Disables the pause entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn pause(&self, _partition: PartitionId) {}
}

/// The same pause for every record.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

#[async_trait]
impl Delay for FixedDelay {
    async fn pause(&self, _partition: PartitionId) {
        tokio::time::sleep(self.0).await;
    }
}

/// A pause chosen per partition, falling back to a default.
#[derive(Debug, Clone, Default)]
pub struct PartitionDelay {
    default: Duration,
    overrides: HashMap<PartitionId, Duration>,
}

impl PartitionDelay {
    pub fn new(default: Duration) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    pub fn with(mut self, partition: PartitionId, delay: Duration) -> Self {
        self.overrides.insert(partition, delay);
        self
    }

    pub fn delay_for(&self, partition: PartitionId) -> Duration {
        self.overrides.get(&partition).copied().unwrap_or(self.default)
    }
}

#[async_trait]
impl Delay for PartitionDelay {
    async fn pause(&self, partition: PartitionId) {
        let delay = self.delay_for(partition);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
