//! # Order Processing Topology
//!
//! The staged pipeline that derives and advances order status.
//!
//! ```text
//! orders ──► router ──┬─► orders-made ──────────────► inventory-check ──► orders
//!                     ├─► orders-inventory-checked ─► shipping ─────────► orders
//!                     └─► orders-shipped ───────────► shipped-sink
//! ```
//!
//! The wiring is static: [`PipelineConfig::build`] returns the list of
//! [`Stage`]s, each a [`StageHandler`] bound to an input topic and consumer
//! group. A node runs one [`PartitionWorker`] per stage for every partition it
//! owns, so records for one order are handled in log order while different
//! partitions progress independently.
//!
//! Status only moves forward. Each stage applies [`Order::advance_to`], a
//! compare-and-set on the status order, so a replayed record never rolls an
//! order back.
//!
//! [`Order::advance_to`]: crate::model::Order::advance_to

pub mod config;
pub mod delay;
pub mod error;
pub mod router;
pub mod stages;
pub mod worker;

pub use config::{Pipeline, PipelineConfig, PipelineTopics, Stage};
pub use delay::{Delay, FixedDelay, NoDelay, PartitionDelay};
pub use error::*;
pub use router::{Branch, BranchTopics, TopologyRouter};
pub use stages::{Emit, RecordContext, ShippedSink, StageHandler, StatusStage};
pub use worker::PartitionWorker;
