use order_pipeline::cluster::{Coordinator, NodeInfo, PartitionMap};
use order_pipeline::config::NodeConfig;
use order_pipeline::lifecycle::OrderNode;
use order_pipeline::log::{MemoryLog, OrderLog, PartitionId};
use order_pipeline::model::{Order, OrderId, OrderRequest, OrderStatus};
use order_pipeline::query::{QueryError, StatusResponse, FORWARDED_HEADER};
use order_pipeline::topology::{Delay, NoDelay, PartitionDelay};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Several nodes in one process sharing a log.
struct Cluster {
    log: Arc<MemoryLog>,
    coordinator: Coordinator,
    nodes: Vec<OrderNode>,
}

impl Cluster {
    async fn start(nodes: usize, partitions: u32, delay: Arc<dyn Delay>) -> Self {
        let log = Arc::new(MemoryLog::new(partitions));

        let mut listeners = Vec::new();
        let mut infos = Vec::new();
        for _ in 0..nodes {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            infos.push(NodeInfo::from(listener.local_addr().unwrap()));
            listeners.push(listener);
        }
        let map = PartitionMap::round_robin(log.partitioner(), &infos).unwrap();
        let coordinator = Coordinator::new(map);

        let mut started = Vec::new();
        for listener in listeners {
            let node = OrderNode::start_with_delay(
                test_config(),
                listener,
                log.clone(),
                &coordinator,
                delay.clone(),
            )
            .await
            .unwrap();
            started.push(node);
        }

        Self {
            log,
            coordinator,
            nodes: started,
        }
    }

    fn partition_of(&self, id: &OrderId) -> PartitionId {
        self.log.partitioner().partition_for(id)
    }

    fn owner_index(&self, id: &OrderId) -> usize {
        let map = self.coordinator.current();
        let (_, owner) = map.owner_of(id);
        self.nodes
            .iter()
            .position(|node| node.node() == owner)
            .unwrap()
    }

    /// Places orders until one lands on `partition`.
    async fn place_on(&self, partition: PartitionId) -> Order {
        loop {
            let order = self.nodes[0].place("widget").await.unwrap();
            if self.partition_of(&order.id) == partition {
                return order;
            }
        }
    }

    async fn shutdown(self) {
        for node in self.nodes {
            node.shutdown().await.unwrap();
        }
    }
}

fn test_config() -> NodeConfig {
    let mut config = NodeConfig::with_overrides("127.0.0.1", 0);
    config.query_timeout_ms = 2_000;
    config.shard_buffer = 64;
    config.topic_prefix = "orders".into();
    config
}

/// Polls `node` until `id` reports `expected`, or panics after `within`.
async fn wait_for_status(node: &OrderNode, id: OrderId, expected: OrderStatus, within: Duration) {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        let last = node.status_of(id).await;
        if matches!(last, Ok(status) if status == expected) {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("order {} never reached {} on {}: last {:?}", id, expected, node.node(), last);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn widget_order_ships() {
    let cluster = Cluster::start(2, 4, Arc::new(NoDelay)).await;

    let order = cluster.nodes[0].place("widget").await.unwrap();
    assert_eq!(order.item_name, "widget");
    assert_eq!(order.status, OrderStatus::Pending);

    for node in &cluster.nodes {
        wait_for_status(node, order.id, OrderStatus::Shipped, Duration::from_secs(5)).await;
    }

    cluster.shutdown().await;
}

#[tokio::test]
async fn status_history_never_regresses() {
    let cluster = Cluster::start(2, 4, Arc::new(NoDelay)).await;

    let order = cluster.nodes[1].place("widget").await.unwrap();
    wait_for_status(&cluster.nodes[0], order.id, OrderStatus::Shipped, Duration::from_secs(5)).await;

    let history = cluster.log.status_history("orders", &order.id);
    assert_eq!(
        history,
        vec![
            OrderStatus::Pending,
            OrderStatus::InventoryChecking,
            OrderStatus::Shipped
        ]
    );
    assert!(history.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(
        cluster.log.status_history("orders-made", &order.id),
        vec![OrderStatus::OrderMade]
    );

    cluster.shutdown().await;
}

#[tokio::test]
async fn unknown_order_is_not_found_everywhere() {
    let cluster = Cluster::start(2, 4, Arc::new(NoDelay)).await;

    // Enough ids to hit partitions owned by both nodes
    for _ in 0..16 {
        let id = OrderId::generate();
        for node in &cluster.nodes {
            let result = node.status_of(id).await;
            assert!(
                matches!(result, Err(QueryError::OrderNotFound(missing)) if missing == id),
                "{} answered {:?}",
                node.node(),
                result
            );
        }
    }

    cluster.shutdown().await;
}

#[tokio::test]
async fn concurrent_orders_on_different_partitions_both_ship() {
    let cluster = Cluster::start(2, 4, Arc::new(NoDelay)).await;

    let (first, second) = loop {
        let (a, b) = tokio::join!(
            cluster.nodes[0].place("widget"),
            cluster.nodes[1].place("gadget")
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        if cluster.partition_of(&a.id) != cluster.partition_of(&b.id) {
            break (a, b);
        }
    };
    assert_ne!(first.id, second.id);

    tokio::join!(
        wait_for_status(&cluster.nodes[1], first.id, OrderStatus::Shipped, Duration::from_secs(5)),
        wait_for_status(&cluster.nodes[0], second.id, OrderStatus::Shipped, Duration::from_secs(5)),
    );

    cluster.shutdown().await;
}

#[tokio::test]
async fn every_node_answers_with_the_owners_status() {
    let cluster = Cluster::start(3, 6, Arc::new(NoDelay)).await;

    let order = cluster.nodes[2].place("widget").await.unwrap();
    let owner = &cluster.nodes[cluster.owner_index(&order.id)];
    wait_for_status(owner, order.id, OrderStatus::Shipped, Duration::from_secs(5)).await;

    let stored = owner.store().get(order.id).await.unwrap();
    assert_eq!(stored, Some(OrderStatus::Shipped));
    for node in &cluster.nodes {
        assert_eq!(node.status_of(order.id).await.ok(), stored);
    }

    cluster.shutdown().await;
}

#[tokio::test]
async fn repeated_queries_agree() {
    let cluster = Cluster::start(2, 4, Arc::new(NoDelay)).await;

    let order = cluster.nodes[0].place("widget").await.unwrap();
    wait_for_status(&cluster.nodes[0], order.id, OrderStatus::Shipped, Duration::from_secs(5)).await;

    for node in &cluster.nodes {
        let first = node.status_of(order.id).await.unwrap();
        let second = node.status_of(order.id).await.unwrap();
        assert_eq!(first, second);
    }

    cluster.shutdown().await;
}

#[tokio::test]
async fn slow_partition_does_not_hold_up_others() {
    let delay = PartitionDelay::new(Duration::ZERO).with(0, Duration::from_secs(2));
    let cluster = Cluster::start(1, 2, Arc::new(delay)).await;

    let slow = cluster.place_on(0).await;
    let fast = cluster.place_on(1).await;

    wait_for_status(&cluster.nodes[0], fast.id, OrderStatus::Shipped, Duration::from_secs(1)).await;
    // The slow router is still paused on its first record
    assert_eq!(
        cluster.nodes[0].status_of(slow.id).await.unwrap(),
        OrderStatus::Pending
    );

    cluster.shutdown().await;
}

#[tokio::test]
async fn failed_partition_does_not_hold_up_others() {
    let cluster = Cluster::start(1, 2, Arc::new(NoDelay)).await;

    let poisoned = loop {
        let id = OrderId::generate();
        if cluster.partition_of(&id) == 0 {
            break id;
        }
    };
    cluster.log.append_raw("orders", poisoned, b"garbage".to_vec());

    let order = cluster.place_on(1).await;
    wait_for_status(&cluster.nodes[0], order.id, OrderStatus::Shipped, Duration::from_secs(3)).await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while cluster.nodes[0].halted_partitions() != vec![0] {
        assert!(tokio::time::Instant::now() < deadline, "partition 0 never marked halted");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    // The bad record stays uncommitted for the next owner
    assert_eq!(cluster.log.committed("order-router", "orders", 0).await.unwrap(), 0);

    cluster.shutdown().await;
}

#[tokio::test]
async fn queries_are_served_while_the_router_pauses() {
    let delay = PartitionDelay::new(Duration::from_secs(2));
    let cluster = Cluster::start(1, 1, Arc::new(delay)).await;

    let order = cluster.nodes[0].place("widget").await.unwrap();
    wait_for_status(&cluster.nodes[0], order.id, OrderStatus::Pending, Duration::from_millis(500)).await;

    cluster.shutdown().await;
}

#[tokio::test]
async fn moved_partition_is_restored_on_the_new_owner() {
    let cluster = Cluster::start(2, 2, Arc::new(NoDelay)).await;

    let order = cluster.nodes[0].place("widget").await.unwrap();
    let partition = cluster.partition_of(&order.id);
    let from = cluster.owner_index(&order.id);
    let to = 1 - from;
    wait_for_status(&cluster.nodes[from], order.id, OrderStatus::Shipped, Duration::from_secs(5)).await;

    cluster
        .coordinator
        .move_partition(partition, cluster.nodes[to].node().clone())
        .unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cluster.nodes[to].owned_partitions().contains(&partition)
        || cluster.nodes[from].owned_partitions().contains(&partition)
    {
        assert!(tokio::time::Instant::now() < deadline, "rebalance never applied");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // The new owner's shard was rebuilt from the log
    for node in &cluster.nodes {
        wait_for_status(node, order.id, OrderStatus::Shipped, Duration::from_secs(5)).await;
    }

    // And it keeps processing the partition
    let next = cluster.place_on(partition).await;
    wait_for_status(&cluster.nodes[from], next.id, OrderStatus::Shipped, Duration::from_secs(5)).await;

    cluster.shutdown().await;
}

#[tokio::test]
async fn query_endpoint_contract() {
    let cluster = Cluster::start(2, 2, Arc::new(NoDelay)).await;
    let client = reqwest::Client::new();

    let order = cluster.nodes[0].place("widget").await.unwrap();
    let owner = cluster.owner_index(&order.id);
    let other = 1 - owner;
    wait_for_status(&cluster.nodes[owner], order.id, OrderStatus::Shipped, Duration::from_secs(5)).await;

    let url = |node: usize, id: OrderId| {
        format!("{}/order/status/{}", cluster.nodes[node].node().base_url(), id)
    };

    // Plain request to the non-owner is routed
    let response = client.get(url(other, order.id)).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: StatusResponse = response.json().await.unwrap();
    assert_eq!(
        body,
        StatusResponse {
            order_id: order.id,
            status: OrderStatus::Shipped
        }
    );

    // A forwarded request is never forwarded again
    let response = client
        .get(url(other, order.id))
        .header(FORWARDED_HEADER, "1")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::MISDIRECTED_REQUEST);

    let response = client
        .get(url(owner, OrderId::generate()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    let response = client
        .get(format!("{}/order/status/not-a-uuid", cluster.nodes[owner].node().base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    cluster.shutdown().await;
}

#[tokio::test]
async fn orders_can_be_placed_over_http() {
    let cluster = Cluster::start(2, 2, Arc::new(NoDelay)).await;
    let client = reqwest::Client::new();
    let url = format!("{}/order", cluster.nodes[1].node().base_url());

    let response = client
        .post(&url)
        .json(&OrderRequest {
            item_name: "widget".into(),
        })
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let order: Order = response.json().await.unwrap();
    assert_eq!(order.item_name, "widget");
    assert_eq!(order.status, OrderStatus::Pending);

    for node in &cluster.nodes {
        wait_for_status(node, order.id, OrderStatus::Shipped, Duration::from_secs(5)).await;
    }

    let response = client
        .post(&url)
        .json(&serde_json::json!({ "item": "widget" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);

    cluster.shutdown().await;
}
