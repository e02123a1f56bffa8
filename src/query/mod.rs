//! # Query Router
//!
//! Answers "what is the status of order X?" on any node.
//!
//! Resolution is an explicit two-step protocol:
//! 1. Resolve the owner of the id's partition from the current
//!    [`ClusterView`](crate::cluster::ClusterView) snapshot. Nothing is cached
//!    across calls, so every query sees the latest published assignment.
//! 2. Pick a [`StatusLookup`] strategy: [`LocalLookup`] when the owner is this
//!    node, otherwise [`RemoteLookup`] against the owner's endpoint.
//!
//! Every query is bounded by the configured timeout and can also be abandoned
//! through a [`CancellationToken`]. Dropping the in-flight request future closes
//! its connection.

pub mod error;
pub mod lookup;
pub mod server;

pub use error::*;
pub use lookup::{LocalLookup, RemoteLookup, StatusLookup};
pub use server::{ApiState, StatusResponse, FORWARDED_HEADER};

use crate::cluster::OwnershipResolver;
use crate::model::{OrderId, OrderStatus};
use crate::store::StatusStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub struct QueryRouter {
    resolver: Arc<dyn OwnershipResolver>,
    local: LocalLookup,
    client: reqwest::Client,
    timeout: Duration,
}

impl QueryRouter {
    pub fn new(
        resolver: Arc<dyn OwnershipResolver>,
        store: Arc<StatusStore>,
        timeout: Duration,
    ) -> Result<Self, QueryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(QueryError::Client)?;
        Ok(Self {
            resolver,
            local: LocalLookup::new(store),
            client,
            timeout,
        })
    }

    #[instrument(skip_all, fields(order_id = %id))]
    pub async fn status_of(&self, id: OrderId) -> Result<OrderStatus, QueryError> {
        self.bounded(self.route(id)).await
    }

    /// Like [`status_of`](Self::status_of), but gives up with
    /// [`QueryError::Cancelled`] as soon as `cancel` fires.
    pub async fn status_of_with_cancel(
        &self,
        id: OrderId,
        cancel: &CancellationToken,
    ) -> Result<OrderStatus, QueryError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(QueryError::Cancelled),
            result = self.status_of(id) => result,
        }
    }

    /// Answers from the local shard only. Fails with [`QueryError::NotOwner`] when
    /// this node does not own the id's partition.
    pub async fn local_status(&self, id: OrderId) -> Result<OrderStatus, QueryError> {
        let (partition, owner) = self.resolver.owner_of(&id);
        let local = self.resolver.local_node();
        if owner != *local {
            return Err(QueryError::NotOwner {
                node: local.to_string(),
                partition,
            });
        }
        self.bounded(self.local.lookup(id)).await
    }

    async fn route(&self, id: OrderId) -> Result<OrderStatus, QueryError> {
        let (partition, owner) = self.resolver.owner_of(&id);
        if owner == *self.resolver.local_node() {
            self.local.lookup(id).await
        } else {
            RemoteLookup::new(self.client.clone(), owner, partition)
                .lookup(id)
                .await
        }
    }

    async fn bounded<F>(&self, lookup: F) -> Result<OrderStatus, QueryError>
    where
        F: Future<Output = Result<OrderStatus, QueryError>>,
    {
        tokio::time::timeout(self.timeout, lookup)
            .await
            .unwrap_or_else(|_| Err(QueryError::Timeout(self.timeout)))
    }
}
