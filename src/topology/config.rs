//! Static pipeline wiring: which handler consumes which topic under which group.

use super::router::{BranchTopics, TopologyRouter};
use super::stages::{ShippedSink, StageHandler, StatusStage};
use super::Delay;
use crate::store::StatusStore;
use std::sync::Arc;

/// Names of the four pipeline topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineTopics {
    /// Raw order stream. Submitted orders and stage outputs land here.
    pub orders: String,
    pub order_made: String,
    pub inventory_checked: String,
    pub shipped: String,
}

impl PipelineTopics {
    /// `prefix`, `prefix-made`, `prefix-inventory-checked`, `prefix-shipped`.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            orders: prefix.to_string(),
            order_made: format!("{}-made", prefix),
            inventory_checked: format!("{}-inventory-checked", prefix),
            shipped: format!("{}-shipped", prefix),
        }
    }

    pub fn branches(&self) -> BranchTopics {
        BranchTopics {
            order_made: self.order_made.clone(),
            inventory_checked: self.inventory_checked.clone(),
            shipped: self.shipped.clone(),
        }
    }
}

impl Default for PipelineTopics {
    fn default() -> Self {
        Self::with_prefix("orders")
    }
}

/// One consumer bound to an input topic.
#[derive(Clone)]
pub struct Stage {
    /// Consumer group the committed offsets are stored under.
    pub group: String,
    pub input: String,
    pub handler: Arc<dyn StageHandler>,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        self.handler.name()
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.handler.name())
            .field("group", &self.group)
            .field("input", &self.input)
            .finish()
    }
}

/// The composed set of stages a node runs for every partition it owns.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

pub const ROUTER_GROUP: &str = "order-router";
pub const INVENTORY_GROUP: &str = "order-inventory";
pub const SHIPPING_GROUP: &str = "order-shipping";
pub const SHIPPED_GROUP: &str = "order-shipped";

/// Topic names plus the static stage table.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub topics: PipelineTopics,
}

impl PipelineConfig {
    pub fn new(topics: PipelineTopics) -> Self {
        Self { topics }
    }

    /// Group whose committed `orders` offset bounds a shard restore.
    pub fn router_group(&self) -> &'static str {
        ROUTER_GROUP
    }

    /// Wires the four stages:
    ///
    /// | stage | group | input | output |
    /// |---|---|---|---|
    /// | router | `order-router` | orders | one branch topic |
    /// | inventory-check | `order-inventory` | made | orders |
    /// | shipping | `order-shipping` | inventory-checked | orders |
    /// | shipped-sink | `order-shipped` | shipped | none |
    pub fn build(&self, store: Arc<StatusStore>, delay: Arc<dyn Delay>) -> Pipeline {
        let topics = &self.topics;
        let stages = vec![
            Stage {
                group: ROUTER_GROUP.to_string(),
                input: topics.orders.clone(),
                handler: Arc::new(TopologyRouter::new(store, delay, topics.branches())),
            },
            Stage {
                group: INVENTORY_GROUP.to_string(),
                input: topics.order_made.clone(),
                handler: Arc::new(StatusStage::inventory_check(topics.orders.clone())),
            },
            Stage {
                group: SHIPPING_GROUP.to_string(),
                input: topics.inventory_checked.clone(),
                handler: Arc::new(StatusStage::shipping(topics.orders.clone())),
            },
            Stage {
                group: SHIPPED_GROUP.to_string(),
                input: topics.shipped.clone(),
                handler: Arc::new(ShippedSink),
            },
        ];
        Pipeline { stages }
    }
}
