//! Node orchestration and lifecycle management.
//!
//! # Main Components
//!
//! - [`OrderNode`] - Wires the status store, partition workers and query endpoint
//!   of one cluster member, follows rebalances, and shuts everything down
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod error;
pub mod node;
mod supervisor;
pub mod tracing;

pub use self::error::*;
pub use self::node::OrderNode;
pub use self::tracing::setup_tracing;
