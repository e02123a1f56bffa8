//! # Order Pipeline Demo
//!
//! Starts a two-node cluster in one process over a shared [`MemoryLog`], places a
//! `widget` order, and follows its status through the node that does **not** own
//! the order's partition, so every answer is forwarded over HTTP.
//!
//! ```bash
//! ORDER_PROCESSING_DELAY_MS=500 RUST_LOG=info cargo run
//! ```

use order_pipeline::cluster::{Coordinator, NodeInfo, PartitionMap};
use order_pipeline::config::NodeConfig;
use order_pipeline::lifecycle::{setup_tracing, OrderNode};
use order_pipeline::log::{MemoryLog, OrderLog};
use order_pipeline::model::OrderStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn, Instrument};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = NodeConfig::from_env();
    info!(?config, "Starting two-node order pipeline");

    let log = Arc::new(MemoryLog::new(config.partitions));

    // Both listeners are bound first so the partition map can name real ports
    let first = bind(&config.host, config.port).await?;
    let second = bind(&config.host, config.port.saturating_add(1)).await?;
    let nodes = [node_info(&config, &first)?, node_info(&config, &second)?];
    let map = PartitionMap::round_robin(log.partitioner(), &nodes).map_err(|e| e.to_string())?;
    let coordinator = Coordinator::new(map);

    let node_a = OrderNode::start(config.clone(), first, log.clone(), &coordinator)
        .await
        .map_err(|e| e.to_string())?;
    let node_b = OrderNode::start(config.clone(), second, log.clone(), &coordinator)
        .await
        .map_err(|e| e.to_string())?;

    let order = node_a.place("widget").await.map_err(|e| e.to_string())?;
    info!(order_id = %order.id, status = %order.status, "Order placed");

    let (partition, owner) = {
        let map = coordinator.current();
        let (partition, owner) = map.owner_of(&order.id);
        (partition, owner.clone())
    };
    let asked = if owner == *node_a.node() { &node_b } else { &node_a };
    info!(partition, owner = %owner, asked = %asked.node(), "Polling through the non-owner");

    // Three passes through the router, each paying the processing pause
    let deadline = tokio::time::Instant::now() + config.processing_delay() * 3 + Duration::from_secs(10);
    let span = tracing::info_span!("status_polling", order_id = %order.id);
    let outcome = async {
        let mut last = None;
        loop {
            match asked.status_of(order.id).await {
                Ok(status) => {
                    if last != Some(status) {
                        info!(%status, "Status changed");
                        last = Some(status);
                    }
                    if status == OrderStatus::Shipped {
                        return Ok(status);
                    }
                }
                Err(e) => warn!(error = %e, "Status query failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(format!("order {} did not ship in time", order.id));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
    .instrument(span)
    .await;

    node_a.shutdown().await.map_err(|e| e.to_string())?;
    node_b.shutdown().await.map_err(|e| e.to_string())?;

    let status = outcome?;
    info!(order_id = %order.id, %status, "Application completed successfully");
    Ok(())
}

async fn bind(host: &str, port: u16) -> Result<TcpListener, String> {
    TcpListener::bind((host, port))
        .await
        .map_err(|e| format!("failed to bind {}:{}: {}", host, port, e))
}

fn node_info(config: &NodeConfig, listener: &TcpListener) -> Result<NodeInfo, String> {
    let port = listener.local_addr().map_err(|e| e.to_string())?.port();
    Ok(NodeInfo::new(config.host.clone(), port))
}
