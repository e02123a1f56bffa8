use super::supervisor::{HaltedPartitions, PartitionSupervisor, WorkerFailure};
use super::NodeError;
use crate::cluster::{ClusterView, Coordinator, NodeInfo, OwnershipResolver};
use crate::config::NodeConfig;
use crate::log::{OrderLog, PartitionId};
use crate::model::{Order, OrderId, OrderStatus};
use crate::query::server::serve as serve_queries;
use crate::query::{ApiState, QueryError, QueryRouter};
use crate::store::StatusStore;
use crate::submitter::{OrderSubmitter, SubmitError};
use crate::topology::{Delay, FixedDelay, PipelineConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// One member of the processing cluster.
///
/// `OrderNode` is responsible for:
/// - **Partition work**: one worker per stage for every partition it owns, plus
///   that partition's status shard
/// - **Rebalance**: reacting to new partition maps by draining lost partitions and
///   restoring gained ones
/// - **Endpoint**: serving `POST /order` and `GET /order/status/{id}`, and answering
///   [`status_of`](Self::status_of) for any order id in the cluster
///
/// # Example
///
/// ```ignore
/// let listener = TcpListener::bind("127.0.0.1:0").await?;
/// let local = NodeInfo::from(listener.local_addr()?);
/// let coordinator = Coordinator::new(PartitionMap::round_robin(log.partitioner(), &[local])?);
///
/// let node = OrderNode::start(config, listener, log, &coordinator).await?;
/// let order = node.place("widget").await?;
/// let status = node.status_of(order.id).await?;
///
/// node.shutdown().await?;
/// ```
pub struct OrderNode {
    local: NodeInfo,
    store: Arc<StatusStore>,
    query: Arc<QueryRouter>,
    submitter: OrderSubmitter,
    halted: HaltedPartitions,
    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl OrderNode {
    /// Starts a node with the router pause taken from `config`.
    pub async fn start(
        config: NodeConfig,
        listener: TcpListener,
        log: Arc<dyn OrderLog>,
        coordinator: &Coordinator,
    ) -> Result<Self, NodeError> {
        let delay = Arc::new(FixedDelay(config.processing_delay()));
        Self::start_with_delay(config, listener, log, coordinator, delay).await
    }

    /// Starts a node on an already bound `listener`.
    ///
    /// The advertised address is the configured host with the listener's port.
    /// It must match an owner in the coordinator's map for this node to be
    /// assigned any partitions.
    ///
    /// When this returns, the node's initial partitions are restored and their
    /// workers are running.
    pub async fn start_with_delay(
        config: NodeConfig,
        listener: TcpListener,
        log: Arc<dyn OrderLog>,
        coordinator: &Coordinator,
        delay: Arc<dyn Delay>,
    ) -> Result<Self, NodeError> {
        let local = NodeInfo::new(config.host.clone(), listener.local_addr()?.port());
        let view = coordinator.view(local.clone());

        // 1. Node-local state, the pipeline bound to it, and the query router
        let store = Arc::new(StatusStore::new(log.partitioner(), config.shard_buffer));
        let pipeline_config = PipelineConfig::new(config.topics());
        let pipeline = pipeline_config.build(store.clone(), delay);
        let submitter = OrderSubmitter::new(log.clone(), pipeline_config.topics.orders.clone());
        let query = Arc::new(QueryRouter::new(
            Arc::new(view.clone()),
            store.clone(),
            config.query_timeout(),
        )?);

        // 2. Initial assignment
        let (failures_tx, failures) = mpsc::unbounded_channel();
        let halted = HaltedPartitions::default();
        let mut supervisor = PartitionSupervisor::new(
            log,
            store.clone(),
            pipeline,
            pipeline_config.topics.orders.clone(),
            pipeline_config.router_group().to_string(),
            failures_tx,
            halted.clone(),
        );
        if let Err(e) = supervisor.apply(&view.local_partitions()).await {
            supervisor.stop_all().await;
            return Err(e);
        }

        // 3. Query path and rebalance handling, on their own tasks
        let shutdown = CancellationToken::new();
        let state = ApiState {
            query: query.clone(),
            submitter: submitter.clone(),
        };
        let server = tokio::spawn(serve(listener, state, shutdown.clone()));
        let rebalancer = tokio::spawn(supervise(supervisor, view, failures, shutdown.clone()));

        info!(node = %local, partitions = ?store.open_partitions(), "Node started");
        Ok(Self {
            local,
            store,
            query,
            submitter,
            halted,
            shutdown,
            handles: vec![server, rebalancer],
        })
    }

    pub fn node(&self) -> &NodeInfo {
        &self.local
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    pub fn query(&self) -> &Arc<QueryRouter> {
        &self.query
    }

    pub fn submitter(&self) -> &OrderSubmitter {
        &self.submitter
    }

    /// Partitions whose shard is currently open here.
    pub fn owned_partitions(&self) -> Vec<PartitionId> {
        self.store.open_partitions()
    }

    /// Owned partitions where a worker stopped on a fatal error.
    ///
    /// Records on these partitions are not processed until the partition moves
    /// to another node or back here.
    pub fn halted_partitions(&self) -> Vec<PartitionId> {
        self.halted.lock().iter().copied().collect()
    }

    pub async fn place(&self, item_name: &str) -> Result<Order, SubmitError> {
        self.submitter.place(item_name).await
    }

    pub async fn status_of(&self, id: OrderId) -> Result<OrderStatus, QueryError> {
        self.query.status_of(id).await
    }

    /// Gracefully shuts the node down.
    ///
    /// Workers stop at their next record boundary, so a record being processed is
    /// still committed. The query endpoint stops accepting connections.
    pub async fn shutdown(self) -> Result<(), NodeError> {
        info!(node = %self.local, "Shutting down node...");

        // =====================================================================
        // Step 1: Signal every task
        // =====================================================================

        self.shutdown.cancel();

        // =====================================================================
        // Step 2: Wait for workers to drain and the server to stop
        // =====================================================================

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Node task failed: {:?}", e);
                return Err(NodeError::Task(format!("{:?}", e)));
            }
        }

        info!(node = %self.local, "Node shutdown complete.");
        Ok(())
    }
}

async fn serve(listener: TcpListener, state: ApiState, shutdown: CancellationToken) {
    if let Err(e) = serve_queries(listener, state, shutdown).await {
        error!(error = %e, "Node endpoint failed");
    }
}

/// Follows published partition maps and worker failures until shutdown, then
/// drains everything.
async fn supervise(
    mut supervisor: PartitionSupervisor,
    mut view: ClusterView,
    mut failures: mpsc::UnboundedReceiver<WorkerFailure>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Some(failure) = failures.recv() => supervisor.halt(failure),
            map = view.changed() => match map {
                Some(map) => {
                    let owned = map.partitions_owned_by(view.local_node());
                    info!(epoch = map.epoch(), partitions = ?owned, "Applying rebalance");
                    supervisor.rebalance(&owned).await;
                }
                None => {
                    // Coordinator gone: keep the current assignment
                    shutdown.cancelled().await;
                    break;
                }
            },
        }
    }
    supervisor.stop_all().await;
}
