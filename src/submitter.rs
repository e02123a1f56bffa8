//! Write side: places new orders on the log.

use crate::log::{LogError, OrderLog};
use crate::model::{Order, OrderRequest};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Failed to append order: {0}")]
    Append(#[from] LogError),
}

#[derive(Clone)]
pub struct OrderSubmitter {
    log: Arc<dyn OrderLog>,
    topic: String,
}

impl OrderSubmitter {
    pub fn new(log: Arc<dyn OrderLog>, topic: impl Into<String>) -> Self {
        Self {
            log,
            topic: topic.into(),
        }
    }

    /// Creates a `PENDING` order with a fresh id and appends it to the orders topic.
    ///
    /// Returns as soon as the append is acknowledged; downstream processing is
    /// not awaited.
    #[instrument(skip(self))]
    pub async fn place(&self, item_name: &str) -> Result<Order, SubmitError> {
        let order = Order::new(item_name);
        let (partition, offset) = self.log.append(&self.topic, &order).await?;
        info!(order_id = %order.id, partition, offset, "Order placed");
        Ok(order)
    }

    /// [`place`](Self::place) for a `POST /order` body.
    pub async fn submit(&self, request: OrderRequest) -> Result<Order, SubmitError> {
        self.place(&request.item_name).await
    }
}
