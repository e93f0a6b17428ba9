//! An immutable k-d tree over an arbitrary [`PointSource`][crate::points::PointSource].

#![warn(missing_docs)]

mod builder;
mod index;
mod query;

pub use builder::{KDTreeBuilder, DEFAULT_NODE_SIZE};
pub use index::{KDTree, Neighbor};
