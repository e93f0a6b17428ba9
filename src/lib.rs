#![doc = include_str!("../README.md")]

mod dtype;
mod error;
pub mod kdtree;
mod points;
mod search;

pub use dtype::{DType, Element};
pub use error::NnIndexError;
pub use points::{PointSet, PointSource};
pub use search::{KnnResult, NeighborSearch, RadiusResult};
