//! hll_oxide: HyperLogLog cardinality estimation
//!
//! This library implements the HyperLogLog sketch with the improved
//! estimator of Ertl (arXiv:1702.01284), a packed 6-bit dense register
//! array, and a linked-list sparse representation that promotes itself to
//! dense storage once it fills up.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cardinality;
pub mod common;

// Re-export core types for convenience
pub use cardinality::HyperLogLog;
pub use common::{hash, Mergeable, Result, Sketch, SketchError};
