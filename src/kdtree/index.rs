use crate::points::PointSource;

/// An immutable k-d tree over the points of a [`PointSource`].
///
/// Usually this will be created via [`KDTreeBuilder`][crate::kdtree::KDTreeBuilder].
/// The tree owns its source, so the index stays valid independently of
/// whatever the source was ingested from.
#[derive(Debug, Clone, PartialEq)]
pub struct KDTree<S: PointSource> {
    pub(crate) source: S,
    /// kd-sorted permutation of `0..num_points`
    pub(crate) ids: Vec<u32>,
    pub(crate) node_size: usize,
}

impl<S: PointSource> KDTree<S> {
    /// The source this tree indexes.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The number of indexed points.
    pub fn num_points(&self) -> usize {
        self.ids.len()
    }

    /// The dimensionality of the indexed points.
    pub fn num_dims(&self) -> usize {
        self.source.num_dims()
    }

    /// The leaf bucket size this tree was built with.
    pub fn node_size(&self) -> usize {
        self.node_size
    }
}

/// A single search hit: the position of a point in its source and the squared
/// Euclidean distance between that point and the query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the matched point in the source's point order.
    pub index: u32,
    /// Squared Euclidean distance to the query point.
    pub dist_sq: f64,
}

impl Eq for Neighbor {}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // We don't allow NaN. This should only panic on NaN
        self.dist_sq.partial_cmp(&other.dist_sq).unwrap()
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
