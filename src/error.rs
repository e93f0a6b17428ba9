use std::fmt::Debug;
use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug)]
pub enum NnIndexError {
    /// An input table cannot be ingested as a point set. Recoverable: the
    /// caller may fix the table and retry, and any previously built index
    /// stays usable.
    #[error("invalid point data: {0}")]
    InvalidPointData(String),
}

pub type Result<T> = std::result::Result<T, NnIndexError>;
