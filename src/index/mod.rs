//! Index module for glimpse.
//!
//! Provides the `VectorIndex` trait, distance helpers, and the exact flat
//! index used for every collection.

pub mod distance;
pub mod flat;
pub mod traits;

pub use flat::FlatIndex;
pub use traits::VectorIndex;
