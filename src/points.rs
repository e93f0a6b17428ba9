//! Owned point storage and the coordinate view the tree is built over.

use ndarray::{ArrayViewD, Ix2};
use num_traits::ToPrimitive;

use crate::dtype::{DType, Element};
use crate::error::{NnIndexError, Result};

/// Read-only, per-axis coordinate access for the k-d tree.
///
/// The tree never touches point storage directly: it sees `num_points` rows
/// of `num_dims` coordinates through this trait, both while sorting and
/// while answering queries. Any owner of f64 coordinates can back an index
/// by implementing it.
pub trait PointSource {
    /// The number of points behind this source.
    fn num_points(&self) -> usize;

    /// The dimensionality shared by every point. At least 1.
    fn num_dims(&self) -> usize;

    /// One coordinate of one point, with `item < num_points` and
    /// `axis < num_dims`.
    fn coord(&self, item: usize, axis: usize) -> f64;
}

impl<S: PointSource> PointSource for &S {
    fn num_points(&self) -> usize {
        (*self).num_points()
    }

    fn num_dims(&self) -> usize {
        (*self).num_dims()
    }

    #[inline]
    fn coord(&self, item: usize, axis: usize) -> f64 {
        (*self).coord(item, axis)
    }
}

/// An owned, contiguous copy of an N x D point set.
///
/// Storage is row-major: point `i` occupies
/// `data[i * num_dims..(i + 1) * num_dims]`. Construction deep-copies the
/// caller's table, so the source array may be freed or mutated as soon as
/// the constructor returns; indexes built over the set never observe the
/// change.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    data: Vec<f64>,
    num_points: usize,
    num_dims: usize,
}

impl PointSet {
    /// Validate a table of coordinates and copy it into owned storage.
    ///
    /// The table must be two-dimensional with shape `[N, D]`, its element
    /// type must be 64-bit float, and `D` must be at least 1. `N == 0` is
    /// allowed and produces an empty set. Values are read in logical
    /// row-major order, so views of any stride or layout are accepted.
    ///
    /// Failure allocates nothing and mutates nothing; the caller may fix
    /// the table and retry.
    pub fn from_table<A: Element>(table: ArrayViewD<'_, A>) -> Result<Self> {
        let ndim = table.ndim();
        let table = table.into_dimensionality::<Ix2>().map_err(|_| {
            NnIndexError::InvalidPointData(format!(
                "table must be two-dimensional, got {ndim} dimension(s)"
            ))
        })?;
        if A::DTYPE != DType::Float64 {
            return Err(NnIndexError::InvalidPointData(format!(
                "table must have float64 elements, got {:?}",
                A::DTYPE
            )));
        }
        let (num_points, num_dims) = table.dim();
        if num_dims == 0 {
            return Err(NnIndexError::InvalidPointData(
                "points must have at least one dimension".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(num_points * num_dims);
        // The dtype check above means the cast is an identity conversion.
        data.extend(table.iter().map(|value| value.to_f64().unwrap()));

        Ok(Self {
            data,
            num_points,
            num_dims,
        })
    }

    /// The coordinates of point `i` as a slice of length `num_dims`.
    pub fn point(&self, i: usize) -> &[f64] {
        &self.data[i * self.num_dims..(i + 1) * self.num_dims]
    }
}

impl PointSource for PointSet {
    fn num_points(&self) -> usize {
        self.num_points
    }

    fn num_dims(&self) -> usize {
        self.num_dims
    }

    #[inline]
    fn coord(&self, item: usize, axis: usize) -> f64 {
        self.data[item * self.num_dims + axis]
    }
}
