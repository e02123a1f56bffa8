//! Pure data structures shared by every stage of the pipeline.

pub mod order;

pub use order::*;
