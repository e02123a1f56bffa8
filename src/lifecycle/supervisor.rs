//! Starts and stops per-partition work as ownership changes.

use super::NodeError;
use crate::log::{OrderLog, PartitionId};
use crate::store::StatusStore;
use crate::topology::{Pipeline, PartitionWorker, PipelineError};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Partitions whose processing stopped on a fatal worker error.
pub(crate) type HaltedPartitions = Arc<Mutex<BTreeSet<PartitionId>>>;

/// Reported by a worker task that exited with an error.
#[derive(Debug)]
pub(crate) struct WorkerFailure {
    pub partition: PartitionId,
    pub stage: &'static str,
    pub reason: String,
}

/// Everything running for one owned partition.
struct PartitionTasks {
    cancel: CancellationToken,
    workers: Vec<JoinHandle<Result<(), PipelineError>>>,
}

pub(crate) struct PartitionSupervisor {
    log: Arc<dyn OrderLog>,
    store: Arc<StatusStore>,
    pipeline: Pipeline,
    /// Topic the status shards are restored from.
    orders_topic: String,
    router_group: String,
    running: HashMap<PartitionId, PartitionTasks>,
    failures: mpsc::UnboundedSender<WorkerFailure>,
    halted: HaltedPartitions,
}

impl PartitionSupervisor {
    pub(crate) fn new(
        log: Arc<dyn OrderLog>,
        store: Arc<StatusStore>,
        pipeline: Pipeline,
        orders_topic: String,
        router_group: String,
        failures: mpsc::UnboundedSender<WorkerFailure>,
        halted: HaltedPartitions,
    ) -> Self {
        Self {
            log,
            store,
            pipeline,
            orders_topic,
            router_group,
            running: HashMap::new(),
            failures,
            halted,
        }
    }

    /// Brings the running set in line with `owned`.
    ///
    /// Lost partitions are drained first: their workers finish the record in
    /// hand, then the shard closes. Gained partitions are restored and started.
    pub(crate) async fn apply(&mut self, owned: &[PartitionId]) -> Result<(), NodeError> {
        let owned: BTreeSet<PartitionId> = owned.iter().copied().collect();
        let lost: Vec<PartitionId> = self
            .running
            .keys()
            .filter(|p| !owned.contains(*p))
            .copied()
            .collect();

        for partition in lost {
            self.stop(partition).await;
        }
        let mut result = Ok(());
        for partition in owned {
            if self.running.contains_key(&partition) {
                continue;
            }
            if let Err(e) = self.start(partition).await {
                error!(partition, error = %e, "Failed to assign partition");
                result = Err(e);
            }
        }
        result
    }

    async fn start(&mut self, partition: PartitionId) -> Result<(), NodeError> {
        self.store.open(partition);
        let restored = match self.restore(partition).await {
            Ok(restored) => restored,
            Err(e) => {
                self.store.close(partition);
                return Err(e);
            }
        };

        let cancel = CancellationToken::new();
        let workers = self
            .pipeline
            .stages()
            .iter()
            .map(|stage| {
                let worker = PartitionWorker::new(
                    self.log.clone(),
                    stage.clone(),
                    partition,
                    cancel.child_token(),
                );
                let name = stage.name();
                let failures = self.failures.clone();
                tokio::spawn(async move {
                    let result = worker.run().await;
                    if let Err(e) = &result {
                        // No receiver left means the node is shutting down
                        let _ = failures.send(WorkerFailure {
                            partition,
                            stage: name,
                            reason: e.to_string(),
                        });
                    }
                    result
                })
            })
            .collect();

        self.running
            .insert(partition, PartitionTasks { cancel, workers });
        info!(partition, restored, "Partition assigned");
        Ok(())
    }

    /// Replays `orders` up to the router's committed offset into the new shard.
    async fn restore(&self, partition: PartitionId) -> Result<usize, NodeError> {
        let upto = self
            .log
            .committed(&self.router_group, &self.orders_topic, partition)
            .await?;
        Ok(self
            .store
            .restore(self.log.as_ref(), &self.orders_topic, partition, upto)
            .await?)
    }

    async fn stop(&mut self, partition: PartitionId) {
        let Some(tasks) = self.running.remove(&partition) else {
            return;
        };
        tasks.cancel.cancel();
        for handle in tasks.workers {
            match handle.await {
                // Fatal worker errors are logged by the worker
                Ok(_) => {}
                Err(e) => error!(partition, "Worker task failed: {:?}", e),
            }
        }
        self.store.close(partition);
        self.halted.lock().remove(&partition);
        info!(partition, "Partition released");
    }

    /// Marks the failed worker's partition halted.
    ///
    /// The partition keeps its shard and its other workers, but the failed stage
    /// makes no further progress on it until the partition is reassigned.
    pub(crate) fn halt(&mut self, failure: WorkerFailure) {
        if !self.running.contains_key(&failure.partition) {
            return;
        }
        if self.halted.lock().insert(failure.partition) {
            error!(
                partition = failure.partition,
                stage = failure.stage,
                reason = %failure.reason,
                "Partition halted after a worker failure"
            );
        }
    }

    /// Drains every partition.
    pub(crate) async fn stop_all(&mut self) {
        let partitions: Vec<PartitionId> = self.running.keys().copied().collect();
        for partition in partitions {
            self.stop(partition).await;
        }
    }

    /// [`apply`](Self::apply) for a published rebalance, where there is no caller
    /// to hand the error to.
    pub(crate) async fn rebalance(&mut self, owned: &[PartitionId]) {
        if let Err(e) = self.apply(owned).await {
            warn!(error = %e, "Rebalance left some partitions unassigned");
        }
    }
}
