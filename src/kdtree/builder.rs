use std::cmp;

use crate::kdtree::KDTree;
use crate::points::PointSource;

/// The default leaf bucket size.
pub const DEFAULT_NODE_SIZE: usize = 64;

/// A builder to create a [`KDTree`] over a [`PointSource`].
///
/// The build is a one-shot k-d sort of an id permutation; the source's
/// coordinates are read through the adaptor and never copied or reordered.
pub struct KDTreeBuilder<S: PointSource> {
    source: S,
    node_size: usize,
}

impl<S: PointSource> KDTreeBuilder<S> {
    /// Create a new builder over the provided source with the default node
    /// size.
    pub fn new(source: S) -> Self {
        Self::new_with_node_size(source, DEFAULT_NODE_SIZE)
    }

    /// Create a new builder over the provided source and node size.
    pub fn new_with_node_size(source: S, node_size: usize) -> Self {
        assert!((2..=65535).contains(&node_size));
        assert!(source.num_points() <= u32::MAX as usize);
        assert!(source.num_dims() >= 1);

        Self { source, node_size }
    }

    /// Consume this builder, performing the k-d sort and generating a
    /// [`KDTree`] ready for queries.
    pub fn finish(self) -> KDTree<S> {
        let num_items = self.source.num_points();
        let mut ids: Vec<u32> = (0..num_items as u32).collect();

        // kd-sort the permutation for efficient search
        if num_items > 1 {
            sort(&mut ids, &self.source, self.node_size, 0, num_items - 1, 0);
        }

        KDTree {
            source: self.source,
            ids,
            node_size: self.node_size,
        }
    }
}

fn sort<S: PointSource>(
    ids: &mut [u32],
    source: &S,
    node_size: usize,
    left: usize,
    right: usize,
    axis: usize,
) {
    if right - left <= node_size {
        return;
    }

    // middle index
    let m = (left + right) >> 1;

    // partition ids around the middle index so that the halves lie on either
    // side of the splitting plane
    select(ids, source, m, left, right, axis);

    // recursively kd-sort first half and second half, axes taking turns
    let next_axis = (axis + 1) % source.num_dims();
    sort(ids, source, node_size, left, m - 1, next_axis);
    sort(ids, source, node_size, m + 1, right, next_axis);
}

/// Custom Floyd-Rivest selection algorithm: partition ids so that
/// [left..k-1] items are smaller than the k-th item along the given axis.
#[inline]
fn select<S: PointSource>(
    ids: &mut [u32],
    source: &S,
    k: usize,
    mut left: usize,
    mut right: usize,
    axis: usize,
) {
    while right > left {
        if right - left > 600 {
            let n = (right - left + 1) as f64;
            let m = (k - left + 1) as f64;
            let z = f64::ln(n);
            let s = 0.5 * f64::exp((2.0 * z) / 3.0);
            let sd = 0.5
                * f64::sqrt((z * s * (n - s)) / n)
                * (if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 });
            let new_left = cmp::max(left, f64::floor(k as f64 - (m * s) / n + sd) as usize);
            let new_right = cmp::min(
                right,
                f64::floor(k as f64 + ((n - m) * s) / n + sd) as usize,
            );
            select(ids, source, k, new_left, new_right, axis);
        }

        let t = source.coord(ids[k] as usize, axis);
        let mut i = left;
        let mut j = right;

        ids.swap(left, k);
        if source.coord(ids[right] as usize, axis) > t {
            ids.swap(left, right);
        }

        while i < j {
            ids.swap(i, j);
            i += 1;
            j -= 1;
            while source.coord(ids[i] as usize, axis) < t {
                i += 1;
            }
            while source.coord(ids[j] as usize, axis) > t {
                j -= 1;
            }
        }

        if source.coord(ids[left] as usize, axis) == t {
            ids.swap(left, j);
        } else {
            j += 1;
            ids.swap(j, right);
        }

        if j <= k {
            left = j + 1;
        }
        if k <= j {
            right = j - 1;
        }
    }
}
