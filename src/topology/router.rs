//! The topology router: materialize, join, pause, branch.

use super::stages::{Emit, RecordContext, StageHandler};
use super::{Delay, PipelineError};
use crate::model::{Order, OrderStatus};
use crate::store::StatusStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// The three downstream streams a record can be routed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// Feeds the inventory-check stage.
    OrderMade,
    /// Feeds the shipping stage.
    InventoryChecked,
    /// Feeds the terminal sink.
    Shipped,
}

impl Branch {
    /// Evaluation order of the branch predicates.
    pub const PRIORITY: [Branch; 3] = [Branch::OrderMade, Branch::InventoryChecked, Branch::Shipped];

    /// The first branch whose predicate matches.
    ///
    /// The match is exhaustive over [`OrderStatus`], so every status routes
    /// somewhere and no record is dropped here.
    pub fn select(status: OrderStatus) -> Branch {
        match status {
            OrderStatus::Pending | OrderStatus::OrderMade => Branch::OrderMade,
            OrderStatus::InventoryChecking => Branch::InventoryChecked,
            OrderStatus::Shipped => Branch::Shipped,
        }
    }

    pub fn matches(self, status: OrderStatus) -> bool {
        Branch::select(status) == self
    }
}

/// Output topics, one per branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchTopics {
    pub order_made: String,
    pub inventory_checked: String,
    pub shipped: String,
}

impl BranchTopics {
    pub fn topic(&self, branch: Branch) -> &str {
        match branch {
            Branch::OrderMade => &self.order_made,
            Branch::InventoryChecked => &self.inventory_checked,
            Branch::Shipped => &self.shipped,
        }
    }
}

/// Consumes the raw `orders` stream.
///
/// For each record it
/// 1. commits the carried status into the partition's status shard (the
///    latest-status view) and joins against it; the join passes the incoming
///    order through untouched,
/// 2. pauses through the injected [`Delay`],
/// 3. routes the order into exactly one [`Branch`]. A `PENDING` order entering
///    the order-made branch is promoted to `ORDER_MADE`.
pub struct TopologyRouter {
    store: Arc<StatusStore>,
    delay: Arc<dyn Delay>,
    topics: BranchTopics,
}

impl TopologyRouter {
    pub fn new(store: Arc<StatusStore>, delay: Arc<dyn Delay>, topics: BranchTopics) -> Self {
        Self {
            store,
            delay,
            topics,
        }
    }
}

#[async_trait]
impl StageHandler for TopologyRouter {
    fn name(&self) -> &'static str {
        "router"
    }

    async fn process(&self, ctx: RecordContext, mut order: Order) -> Result<Vec<Emit>, PipelineError> {
        debug!(order_id = %order.id, status = %order.status, partition = ctx.partition, offset = ctx.offset, "Routing order");

        self.store
            .record(ctx.partition, order.id, order.status, ctx.offset)
            .await?;

        self.delay.pause(ctx.partition).await;

        let branch = Branch::select(order.status);
        if branch == Branch::OrderMade {
            order.advance_to(OrderStatus::OrderMade);
        }
        debug!(order_id = %order.id, ?branch, "Branched");
        Ok(vec![Emit::new(self.topics.topic(branch), order)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::Partitioner;
    use crate::topology::NoDelay;

    fn topics() -> BranchTopics {
        BranchTopics {
            order_made: "made".into(),
            inventory_checked: "checked".into(),
            shipped: "shipped".into(),
        }
    }

    #[test]
    fn exactly_one_branch_matches_each_status() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::OrderMade,
            OrderStatus::InventoryChecking,
            OrderStatus::Shipped,
        ] {
            let matching: Vec<_> = Branch::PRIORITY
                .iter()
                .filter(|branch| branch.matches(status))
                .collect();
            assert_eq!(matching.len(), 1, "status {status}");
        }
    }

    #[tokio::test]
    async fn pending_order_is_promoted_and_routed_to_inventory() {
        let store = Arc::new(StatusStore::new(Partitioner::new(1), 8));
        store.open(0);
        let router = TopologyRouter::new(store.clone(), Arc::new(NoDelay), topics());

        let order = Order::new("widget");
        let ctx = RecordContext {
            partition: 0,
            offset: 0,
        };
        let emits = router.process(ctx, order.clone()).await.unwrap();

        assert_eq!(emits.len(), 1);
        assert_eq!(emits[0].topic, "made");
        assert_eq!(emits[0].order.status, OrderStatus::OrderMade);
        // The view holds what was carried on the log
        assert_eq!(store.get(order.id).await.unwrap(), Some(OrderStatus::Pending));
    }

    #[tokio::test]
    async fn shipped_order_reentering_goes_to_sink() {
        let store = Arc::new(StatusStore::new(Partitioner::new(1), 8));
        store.open(0);
        let router = TopologyRouter::new(store, Arc::new(NoDelay), topics());

        let mut order = Order::new("widget");
        order.advance_to(OrderStatus::Shipped);
        let ctx = RecordContext {
            partition: 0,
            offset: 7,
        };
        let emits = router.process(ctx, order).await.unwrap();
        assert_eq!(emits[0].topic, "shipped");
        assert_eq!(emits[0].order.status, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn missing_shard_fails_the_record() {
        let store = Arc::new(StatusStore::new(Partitioner::new(1), 8));
        let router = TopologyRouter::new(store, Arc::new(NoDelay), topics());
        let ctx = RecordContext {
            partition: 0,
            offset: 0,
        };
        let result = router.process(ctx, Order::new("widget")).await;
        assert!(matches!(result, Err(PipelineError::Store(_))));
    }
}
