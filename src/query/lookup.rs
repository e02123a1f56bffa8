//! The two ways of answering a status query: read the local shard, or ask the owner.

use super::server::{StatusResponse, FORWARDED_HEADER};
use super::QueryError;
use crate::cluster::NodeInfo;
use crate::log::PartitionId;
use crate::model::{OrderId, OrderStatus};
use crate::store::StatusStore;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait StatusLookup: Send + Sync {
    async fn lookup(&self, id: OrderId) -> Result<OrderStatus, QueryError>;
}

/// Reads this node's own shard.
#[derive(Clone)]
pub struct LocalLookup {
    store: Arc<StatusStore>,
}

impl LocalLookup {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StatusLookup for LocalLookup {
    async fn lookup(&self, id: OrderId) -> Result<OrderStatus, QueryError> {
        let status = self.store.get(id).await?;
        debug!(order_id = %id, ?status, "Local lookup");
        status.ok_or(QueryError::OrderNotFound(id))
    }
}

/// Forwards the query to the owning node's endpoint.
///
/// Built per call; `reqwest::Client` clones share one connection pool.
pub struct RemoteLookup {
    client: reqwest::Client,
    node: NodeInfo,
    partition: PartitionId,
}

impl RemoteLookup {
    pub fn new(client: reqwest::Client, node: NodeInfo, partition: PartitionId) -> Self {
        Self {
            client,
            node,
            partition,
        }
    }

    fn transport(&self, source: reqwest::Error) -> QueryError {
        QueryError::Transport {
            node: self.node.to_string(),
            source,
        }
    }
}

#[async_trait]
impl StatusLookup for RemoteLookup {
    async fn lookup(&self, id: OrderId) -> Result<OrderStatus, QueryError> {
        let url = format!("{}/order/status/{}", self.node.base_url(), id);
        debug!(order_id = %id, node = %self.node, "Forwarding lookup");

        let response = self
            .client
            .get(&url)
            .header(FORWARDED_HEADER, "1")
            .send()
            .await
            .map_err(|e| self.transport(e))?;

        match response.status() {
            StatusCode::OK => {
                let body: StatusResponse = response.json().await.map_err(|e| self.transport(e))?;
                Ok(body.status)
            }
            StatusCode::NOT_FOUND => Err(QueryError::OrderNotFound(id)),
            StatusCode::MISDIRECTED_REQUEST => Err(QueryError::NotOwner {
                node: self.node.to_string(),
                partition: self.partition,
            }),
            StatusCode::SERVICE_UNAVAILABLE => Err(QueryError::ShardUnavailable(self.partition)),
            other => Err(QueryError::UnexpectedResponse {
                node: self.node.to_string(),
                status: other.as_u16(),
            }),
        }
    }
}
