//! Batched nearest-neighbor search over one owned point set.
//!
//! [`NeighborSearch`] is the crate's front door: it ingests a table of
//! reference points, builds a [`KDTree`] over an owned copy of them, and
//! answers k-nearest-neighbor and radius queries for whole batches of query
//! points at a time.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewD};

use crate::dtype::Element;
use crate::kdtree::{KDTree, KDTreeBuilder, Neighbor};
use crate::points::PointSet;

/// The result of a batched k-nearest-neighbor search.
///
/// Both tables have shape `[M, K_eff]` where `M` is the number of queries and
/// `K_eff` is the smallest per-row neighbor count observed in the batch. Rows
/// that found more neighbors are truncated to that common width, dropping
/// their farthest matches. Each row is ordered by ascending squared distance.
///
/// When no row found any neighbor (for example against an index built from
/// zero points) both tables are the `[0, 0]` empty sentinel and
/// [`is_empty`][Self::is_empty] returns `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct KnnResult {
    /// Positions of the matched points in the ingested point set.
    pub indices: Array2<i64>,
    /// Squared Euclidean distances, never square-rooted.
    pub distances: Array2<f64>,
}

impl KnnResult {
    fn empty() -> Self {
        Self {
            indices: Array2::zeros((0, 0)),
            distances: Array2::zeros((0, 0)),
        }
    }

    /// Whether this is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// The result of a batched radius search, flattened across queries.
///
/// `indices` and `distances` concatenate every match of every query row;
/// `counts[i]` says how many of them belong to row `i`, so the counts sum to
/// the flattened length. Matches within a row appear in tree traversal order,
/// not sorted by distance.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusResult {
    /// Positions of the matched points in the ingested point set.
    pub indices: Array1<i64>,
    /// Squared Euclidean distances, never square-rooted.
    pub distances: Array1<f64>,
    /// Per-query match counts, one entry per query row.
    pub counts: Array1<i64>,
}

/// A nearest-neighbor search engine over a static point set.
///
/// [`set_data`][Self::set_data] deep-copies an `[N, D]` table of f64
/// coordinates and eagerly builds a k-d tree over the copy; the caller's
/// array can be dropped or mutated afterwards. Each successful `set_data`
/// call replaces the previous point set and tree wholesale.
///
/// Queries borrow the engine immutably and a built index is never mutated,
/// so one engine can serve queries from many threads at once; only rebuilds
/// need the exclusive borrow.
///
/// Ingestion failures are recoverable: they leave any previously built index
/// untouched. Query-side misuse (no index built, `k == 0`, dimensionality
/// mismatch, radii arity mismatch) is a contract violation and panics after
/// logging at error level.
#[derive(Debug, Clone, Default)]
pub struct NeighborSearch {
    index: Option<KDTree<PointSet>>,
}

impl NeighborSearch {
    /// Create an engine with no point set. Queries are not permitted until a
    /// [`set_data`][Self::set_data] call succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine directly from a point table, or `None` when the
    /// table fails validation.
    pub fn from_points<A: Element>(points: ArrayViewD<'_, A>) -> Option<Self> {
        let mut engine = Self::new();
        engine.set_data(points).then_some(engine)
    }

    /// Replace the indexed point set.
    ///
    /// `points` must be a two-dimensional `[N, D]` table of 64-bit floats
    /// with `D >= 1`; `N == 0` is allowed. On success the values are copied
    /// into owned storage, a fresh k-d tree is built over them, and `true`
    /// is returned. On failure a warning is logged, `false` is returned, and
    /// nothing changes: a previously built index remains queryable.
    pub fn set_data<A: Element>(&mut self, points: ArrayViewD<'_, A>) -> bool {
        match PointSet::from_table(points) {
            Ok(points) => {
                self.index = Some(KDTreeBuilder::new(points).finish());
                true
            }
            Err(err) => {
                log::warn!("point set rejected: {err}");
                false
            }
        }
    }

    /// Whether a point set has been ingested and indexed.
    pub fn is_built(&self) -> bool {
        self.index.is_some()
    }

    /// The number of indexed points, or `None` before the first build.
    pub fn num_points(&self) -> Option<usize> {
        self.index.as_ref().map(KDTree::num_points)
    }

    /// The dimensionality of the indexed points, or `None` before the first
    /// build.
    pub fn num_dims(&self) -> Option<usize> {
        self.index.as_ref().map(KDTree::num_dims)
    }

    /// Find the `k` nearest indexed points for each query row.
    ///
    /// `queries` has shape `[M, D]` with `D` equal to the indexed
    /// dimensionality and `k >= 1`. Each row is searched independently;
    /// the per-row results are then trimmed to the smallest count found
    /// anywhere in the batch and packed into the dense [`KnnResult`] tables.
    /// All distances are squared Euclidean.
    ///
    /// # Panics
    ///
    /// If no index has been built, `k == 0`, or the query dimensionality
    /// does not match the index.
    pub fn knn_search(&self, queries: ArrayView2<'_, f64>, k: usize) -> KnnResult {
        let tree = self.built_tree("knn_search");
        if k == 0 {
            violation("knn_search requires k >= 1".to_string());
        }
        check_query_dims(&queries, tree.num_dims());

        let mut rows: Vec<Vec<Neighbor>> = Vec::with_capacity(queries.nrows());
        let mut query = vec![0.0; tree.num_dims()];
        for row in queries.rows() {
            copy_row(&mut query, &row);
            rows.push(tree.nearest(&query, k));
        }

        pack_dense(&rows)
    }

    /// Find every indexed point within `radii[i]` of query row `i`.
    ///
    /// `queries` has shape `[M, D]`; `radii` supplies one radius per query
    /// row and must have length `M`. Each radius is squared once and the
    /// tree compares squared distances against it, so the boundary is
    /// inclusive and the reported distances are squared Euclidean. A row
    /// with no match contributes a zero count and nothing to the flattened
    /// tables.
    ///
    /// # Panics
    ///
    /// If no index has been built, the query dimensionality does not match
    /// the index, or `radii.len() != M`.
    pub fn radius_search(
        &self,
        queries: ArrayView2<'_, f64>,
        radii: ArrayView1<'_, f64>,
    ) -> RadiusResult {
        let tree = self.built_tree("radius_search");
        check_query_dims(&queries, tree.num_dims());
        if radii.len() != queries.nrows() {
            violation(format!(
                "radius_search needs one radius per query row, got {} for {} row(s)",
                radii.len(),
                queries.nrows()
            ));
        }

        let mut indices: Vec<i64> = vec![];
        let mut distances: Vec<f64> = vec![];
        let mut counts: Vec<i64> = Vec::with_capacity(queries.nrows());
        let mut query = vec![0.0; tree.num_dims()];
        for (row, &radius) in queries.rows().into_iter().zip(radii.iter()) {
            copy_row(&mut query, &row);
            let matches = tree.within(&query, radius * radius);
            counts.push(matches.len() as i64);
            for neighbor in matches {
                indices.push(i64::from(neighbor.index));
                distances.push(neighbor.dist_sq);
            }
        }

        RadiusResult {
            indices: Array1::from_vec(indices),
            distances: Array1::from_vec(distances),
            counts: Array1::from_vec(counts),
        }
    }

    /// [`radius_search`][Self::radius_search] with one radius shared by
    /// every query row.
    pub fn fixed_radius_search(&self, queries: ArrayView2<'_, f64>, radius: f64) -> RadiusResult {
        let radii = Array1::from_elem(queries.nrows(), radius);
        self.radius_search(queries, radii.view())
    }

    fn built_tree(&self, operation: &str) -> &KDTree<PointSet> {
        match &self.index {
            Some(tree) => tree,
            None => violation(format!("{operation} called before any point set was ingested")),
        }
    }
}

/// Contract violations abort the call instead of returning a sentinel.
fn violation(message: String) -> ! {
    log::error!("{message}");
    panic!("{message}");
}

fn check_query_dims(queries: &ArrayView2<'_, f64>, num_dims: usize) {
    if queries.ncols() != num_dims {
        violation(format!(
            "query batch is {}-dimensional but the index holds {num_dims}-dimensional points",
            queries.ncols()
        ));
    }
}

/// Query rows may be views of any stride; the tree wants a plain slice.
fn copy_row(query: &mut [f64], row: &ArrayView1<'_, f64>) {
    for (dst, src) in query.iter_mut().zip(row.iter()) {
        *dst = *src;
    }
}

/// Pack per-row neighbor lists into the dense `[M, K_eff]` result tables.
///
/// `K_eff` is the smallest row length in the batch; longer rows lose their
/// farthest matches. A batch whose smallest row is empty (or an empty batch)
/// packs to the empty sentinel.
fn pack_dense(rows: &[Vec<Neighbor>]) -> KnnResult {
    let width = rows.iter().map(Vec::len).min().unwrap_or(0);
    if width == 0 {
        return KnnResult::empty();
    }

    let mut indices = Array2::zeros((rows.len(), width));
    let mut distances = Array2::zeros((rows.len(), width));
    for (i, row) in rows.iter().enumerate() {
        for (j, neighbor) in row[..width].iter().enumerate() {
            indices[[i, j]] = i64::from(neighbor.index);
            distances[[i, j]] = neighbor.dist_sq;
        }
    }

    KnnResult { indices, distances }
}

#[cfg(test)]
mod test {
    use ndarray::{array, Array1, Array2};

    use super::*;

    /// The 9 integer points of a 3x3 grid; point 4 is the center (1, 1).
    fn grid_engine() -> NeighborSearch {
        let points = array![
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [2.0, 1.0],
            [0.0, 2.0],
            [1.0, 2.0],
            [2.0, 2.0],
        ];
        NeighborSearch::from_points(points.view().into_dyn()).unwrap()
    }

    #[test]
    fn knn_grid_point_finds_itself() {
        let engine = grid_engine();
        let result = engine.knn_search(array![[1.0, 1.0]].view(), 1);

        assert_eq!(result.indices, array![[4]]);
        assert_eq!(result.distances, array![[0.0]]);
    }

    #[test]
    fn knn_distances_ascend() {
        let engine = grid_engine();
        let result = engine.knn_search(array![[1.0, 1.0]].view(), 4);

        assert_eq!(result.indices.dim(), (1, 4));
        // the center itself, then three of the four edge-adjacent points
        assert_eq!(result.distances, array![[0.0, 1.0, 1.0, 1.0]]);
    }

    #[test]
    fn knn_reports_squared_distances() {
        let points = array![[0.0, 0.0], [3.0, 0.0]];
        let engine = NeighborSearch::from_points(points.view().into_dyn()).unwrap();

        let result = engine.knn_search(array![[0.0, 0.0]].view(), 2);
        assert_eq!(result.distances, array![[0.0, 9.0]]);
    }

    #[test]
    fn knn_batch_caps_at_num_points() {
        let engine = grid_engine();
        let result = engine.knn_search(array![[1.0, 1.0], [0.0, 0.0]].view(), 20);

        // both rows found all 9 points, so nothing is trimmed
        assert_eq!(result.indices.dim(), (2, 9));
        assert_eq!(result.distances.dim(), (2, 9));
        assert_eq!(result.distances[[0, 0]], 0.0);
        assert_eq!(result.distances[[1, 0]], 0.0);
    }

    #[test]
    fn pack_dense_trims_to_narrowest_row() {
        let n = |index, dist_sq| Neighbor { index, dist_sq };
        let rows = vec![
            vec![n(0, 0.0), n(1, 1.0), n(2, 4.0)],
            vec![n(3, 2.0), n(4, 3.0)],
        ];

        let result = pack_dense(&rows);
        assert_eq!(result.indices, array![[0, 1], [3, 4]]);
        assert_eq!(result.distances, array![[0.0, 1.0], [2.0, 3.0]]);
    }

    #[test]
    fn pack_dense_empty_row_yields_sentinel() {
        let rows = vec![
            vec![Neighbor {
                index: 0,
                dist_sq: 1.0,
            }],
            vec![],
        ];

        let result = pack_dense(&rows);
        assert!(result.is_empty());
        assert_eq!(result.indices.dim(), (0, 0));
    }

    #[test]
    fn knn_empty_batch() {
        let engine = grid_engine();
        let queries = Array2::<f64>::zeros((0, 2));

        assert!(engine.knn_search(queries.view(), 3).is_empty());
    }

    #[test]
    fn knn_empty_index_returns_sentinel() {
        let points = Array2::<f64>::zeros((0, 2));
        let engine = NeighborSearch::from_points(points.view().into_dyn()).unwrap();

        let result = engine.knn_search(array![[1.0, 2.0]].view(), 3);
        assert!(result.is_empty());
    }

    #[test]
    fn radius_boundary_is_inclusive() {
        let engine = grid_engine();
        let result = engine.fixed_radius_search(array![[1.0, 1.0]].view(), 1.0);

        // the center and the four edge-adjacent points at distance exactly 1;
        // the diagonal points at squared distance 2 stay out
        assert_eq!(result.counts, array![5]);
        let mut indices: Vec<i64> = result.indices.to_vec();
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 3, 4, 5, 7]);
        for &dist_sq in &result.distances {
            assert!(dist_sq <= 1.0);
        }
    }

    #[test]
    fn radius_reports_squared_distances() {
        let points = array![[0.0, 0.0], [3.0, 0.0]];
        let engine = NeighborSearch::from_points(points.view().into_dyn()).unwrap();

        let result = engine.fixed_radius_search(array![[0.0, 0.0]].view(), 3.0);
        let mut distances = result.distances.to_vec();
        distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(distances, vec![0.0, 9.0]);
    }

    #[test]
    fn radius_counts_partition_the_flattened_tables() {
        let engine = grid_engine();
        let queries = array![[1.0, 1.0], [10.0, 10.0], [0.0, 0.0]];
        let radii = array![1.5, 1.0, 1.0];

        let result = engine.radius_search(queries.view(), radii.view());
        assert_eq!(result.counts.len(), 3);
        assert_eq!(result.counts[1], 0, "far-away row matches nothing");
        let total: i64 = result.counts.iter().sum();
        assert_eq!(result.indices.len(), total as usize);
        assert_eq!(result.distances.len(), total as usize);
    }

    #[test]
    fn radius_negative_radius_acts_as_absolute() {
        let engine = grid_engine();
        let queries = array![[1.0, 1.0]];

        // squared once at the boundary, so the sign is lost
        let positive = engine.fixed_radius_search(queries.view(), 1.0);
        let negative = engine.fixed_radius_search(queries.view(), -1.0);
        assert_eq!(positive.counts, negative.counts);
    }

    #[test]
    fn radius_empty_index() {
        let points = Array2::<f64>::zeros((0, 2));
        let engine = NeighborSearch::from_points(points.view().into_dyn()).unwrap();

        let result = engine.fixed_radius_search(array![[1.0, 2.0]].view(), 10.0);
        assert_eq!(result.counts, array![0]);
        assert!(result.indices.is_empty());
        assert!(result.distances.is_empty());
    }

    #[test]
    fn set_data_failure_keeps_previous_index() {
        let mut engine = grid_engine();

        let rank1 = Array1::<f64>::zeros(6);
        assert!(!engine.set_data(rank1.view().into_dyn()));

        let ints = array![[1i32, 2], [3, 4]];
        assert!(!engine.set_data(ints.view().into_dyn()));

        let zero_dims = Array2::<f64>::zeros((4, 0));
        assert!(!engine.set_data(zero_dims.view().into_dyn()));

        // the grid index is still the one answering
        assert_eq!(engine.num_points(), Some(9));
        let result = engine.knn_search(array![[1.0, 1.0]].view(), 1);
        assert_eq!(result.indices, array![[4]]);
    }

    #[test]
    fn from_points_rejects_bad_table() {
        let floats = array![[1.0f32, 2.0], [3.0, 4.0]];
        assert!(NeighborSearch::from_points(floats.view().into_dyn()).is_none());
    }

    #[test]
    fn unbuilt_engine_reports_no_shape() {
        let engine = NeighborSearch::new();
        assert!(!engine.is_built());
        assert_eq!(engine.num_points(), None);
        assert_eq!(engine.num_dims(), None);
    }
}
