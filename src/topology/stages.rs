//! Stage handlers: the per-record logic bound to each input topic.

use super::PipelineError;
use crate::log::{Offset, PartitionId};
use crate::model::{Order, OrderStatus};
use async_trait::async_trait;
use tracing::{debug, info};

/// Where the record being processed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordContext {
    pub partition: PartitionId,
    pub offset: Offset,
}

/// A record a stage wants appended to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emit {
    pub topic: String,
    pub order: Order,
}

impl Emit {
    pub fn new(topic: impl Into<String>, order: Order) -> Self {
        Self {
            topic: topic.into(),
            order,
        }
    }
}

/// Per-record logic of one pipeline stage.
///
/// A [`PartitionWorker`](super::PartitionWorker) calls `process` for every record
/// of its input partition, one at a time and in log order, then appends the
/// returned records before committing the input offset.
#[async_trait]
pub trait StageHandler: Send + Sync + 'static {
    /// Stable name, used in logs.
    fn name(&self) -> &'static str;

    async fn process(&self, ctx: RecordContext, order: Order) -> Result<Vec<Emit>, PipelineError>;
}

/// Moves an order forward to a fixed status and forwards it.
///
/// The move is a compare-and-set ([`Order::advance_to`]): a record that is
/// already at or past `target` is forwarded unchanged.
#[derive(Debug, Clone)]
pub struct StatusStage {
    name: &'static str,
    target: OrderStatus,
    output: String,
}

impl StatusStage {
    pub fn inventory_check(output: impl Into<String>) -> Self {
        Self {
            name: "inventory-check",
            target: OrderStatus::InventoryChecking,
            output: output.into(),
        }
    }

    pub fn shipping(output: impl Into<String>) -> Self {
        Self {
            name: "shipping",
            target: OrderStatus::Shipped,
            output: output.into(),
        }
    }
}

#[async_trait]
impl StageHandler for StatusStage {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn process(&self, ctx: RecordContext, mut order: Order) -> Result<Vec<Emit>, PipelineError> {
        let from = order.status;
        if order.advance_to(self.target) {
            debug!(stage = self.name, order_id = %order.id, partition = ctx.partition, %from, to = %self.target, "Advanced");
        } else {
            debug!(stage = self.name, order_id = %order.id, partition = ctx.partition, status = %from, "Already past stage, forwarding unchanged");
        }
        Ok(vec![Emit::new(self.output.clone(), order)])
    }
}

/// Terminal stage: observes shipped orders and emits nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShippedSink;

#[async_trait]
impl StageHandler for ShippedSink {
    fn name(&self) -> &'static str {
        "shipped-sink"
    }

    async fn process(&self, ctx: RecordContext, order: Order) -> Result<Vec<Emit>, PipelineError> {
        info!(order_id = %order.id, item = %order.item_name, partition = ctx.partition, offset = ctx.offset, "Order shipped");
        Ok(Vec::new())
    }
}
