//! Generic single-writer shard framework.
//!
//! This module provides the building blocks for keyed state that is owned by one
//! task and reached only by message passing.
//!
//! # Main Components
//!
//! - [`ShardEntry`] - Trait that stored values implement (how a write merges)
//! - [`ShardActor`] - Generic actor that owns a shard's map
//! - [`ShardClient`] - Type-safe, cloneable handle for reads and writes
//! - [`FrameworkError`] - Common error types
//!
//! # Testing
//!
//! See [`mock`] module for utilities to test shard readers without spawning actors.

pub mod core;
pub mod mock;

// Re-export core types for convenience
pub use self::core::*;
