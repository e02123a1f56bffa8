//! # Order Pipeline
//!
//! > **Partitioned order-status tracking with cluster-wide point queries.**
//!
//! Orders move through a staged pipeline (placement → inventory check →
//! shipping). Every stage reads from and writes to an ordered, partitioned log.
//! The latest status of every order is kept in a partitioned status store, and any
//! node can answer "what is the status of order X?", even when the partition that
//! holds X lives on another node.
//!
//! ## 🏗️ Design
//!
//! ### Partitions are the unit of everything
//! An order id maps to the same partition number on every topic. The node that
//! owns partition `p` runs one sequential worker per stage for `p` and holds the
//! status shard for `p`. Records for one order are therefore processed in log order,
//! while partitions progress independently.
//!
//! ### Status only moves forward
//! `PENDING < ORDER_MADE < INVENTORY_CHECKING < SHIPPED`. Each stage applies a
//! compare-and-set ([`Order::advance_to`](model::Order::advance_to)), so replaying a
//! record never moves an order backwards.
//!
//! ### Shards are actors
//! Each status shard is a [`ShardActor`](framework::ShardActor) that owns its map and
//! is reached only through messages. The partition's router worker is the single
//! writer; queries read through the same mailbox.
//!
//! ### Queries resolve, then delegate
//! [`QueryRouter`](query::QueryRouter) looks up the owner of the id's partition in
//! the current [`ClusterView`](cluster::ClusterView) snapshot, then reads locally or
//! forwards to the owner's HTTP endpoint.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Data ([`model`], [`log`])
//! - **Key items**: [`Order`](model::Order), [`OrderStatus`](model::OrderStatus),
//!   [`OrderLog`](log::OrderLog), [`MemoryLog`](log::MemoryLog).
//!
//! ### 2. The Pipeline ([`topology`], [`submitter`])
//! - **Role**: Static stage wiring, branching, and per-partition workers.
//! - **Key items**: [`TopologyRouter`](topology::TopologyRouter),
//!   [`PartitionWorker`](topology::PartitionWorker),
//!   [`OrderSubmitter`](submitter::OrderSubmitter).
//!
//! ### 3. The State ([`framework`], [`store`])
//! - **Role**: Generic single-writer actor and the status store built on it.
//! - **Key items**: [`StatusStore`](store::StatusStore), [`MockShard`](framework::mock::MockShard).
//!
//! ### 4. The Cluster ([`cluster`], [`query`])
//! - **Role**: Partition ownership and cross-node status lookups.
//! - **Key items**: [`Coordinator`](cluster::Coordinator), [`QueryRouter`](query::QueryRouter).
//!
//! ### 5. The Orchestrator ([`lifecycle`], [`config`])
//! - **Role**: Starts a node, follows rebalances, shuts down cleanly.
//! - **Key items**: [`OrderNode`](lifecycle::OrderNode), [`NodeConfig`](config::NodeConfig).
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Two in-process nodes, one order, short pause
//! ORDER_PROCESSING_DELAY_MS=200 RUST_LOG=info cargo run
//!
//! cargo test
//! ```

pub mod cluster;
pub mod config;
pub mod framework;
pub mod lifecycle;
pub mod log;
pub mod model;
pub mod query;
pub mod store;
pub mod submitter;
pub mod topology;
