use std::collections::BinaryHeap;

use tinyvec::TinyVec;

use crate::kdtree::{KDTree, Neighbor};
use crate::points::PointSource;

impl<S: PointSource> KDTree<S> {
    /// Search the index for the `k` points nearest to a query point.
    ///
    /// Returns up to `k` neighbors sorted by ascending squared Euclidean
    /// distance; fewer when the tree holds fewer than `k` points. `query`
    /// must have exactly [`num_dims`][Self::num_dims] coordinates.
    pub fn nearest(&self, query: &[f64], k: usize) -> Vec<Neighbor> {
        debug_assert_eq!(query.len(), self.num_dims());

        if self.ids.is_empty() || k == 0 {
            return vec![];
        }

        // max-heap of the best k candidates so far; the worst sits on top
        let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k);
        self.nearest_in(query, k, 0, self.ids.len() - 1, 0, &mut heap);
        heap.into_sorted_vec()
    }

    fn nearest_in(
        &self,
        query: &[f64],
        k: usize,
        left: usize,
        right: usize,
        axis: usize,
        heap: &mut BinaryHeap<Neighbor>,
    ) {
        // if we reached "tree node", search linearly
        if right - left <= self.node_size {
            for i in left..right + 1 {
                let index = self.ids[i];
                let dist_sq = sq_dist(&self.source, index as usize, query);
                push_candidate(heap, k, Neighbor { index, dist_sq });
            }
            return;
        }

        // otherwise find the middle index and consider its item
        let m = (left + right) >> 1;
        let index = self.ids[m];
        let dist_sq = sq_dist(&self.source, index as usize, query);
        push_candidate(heap, k, Neighbor { index, dist_sq });

        // signed offset of the query from the splitting plane
        let delta = query[axis] - self.source.coord(index as usize, axis);
        let next_axis = (axis + 1) % self.num_dims();

        // descend into the half containing the query first
        let (near, far) = if delta <= 0.0 {
            ((left, m - 1), (m + 1, right))
        } else {
            ((m + 1, right), (left, m - 1))
        };
        self.nearest_in(query, k, near.0, near.1, next_axis, heap);

        // the far half can only improve on the current candidates if the
        // splitting plane is no farther than the worst of them
        let prune = heap.len() == k
            && heap
                .peek()
                .is_some_and(|worst| delta * delta > worst.dist_sq);
        if !prune {
            self.nearest_in(query, k, far.0, far.1, next_axis, heap);
        }
    }

    /// Search the index for points within a squared radius of a query point.
    ///
    /// The boundary is inclusive: a point exactly `r_sq` away is a match.
    /// Results are in tree traversal order, not sorted by distance. `query`
    /// must have exactly [`num_dims`][Self::num_dims] coordinates.
    pub fn within(&self, query: &[f64], r_sq: f64) -> Vec<Neighbor> {
        debug_assert_eq!(query.len(), self.num_dims());

        if self.ids.is_empty() {
            return vec![];
        }

        // Use TinyVec to avoid heap allocations
        let mut stack: TinyVec<[usize; 33]> = TinyVec::new();
        stack.push(0);
        stack.push(self.ids.len() - 1);
        stack.push(0);

        let mut result: Vec<Neighbor> = vec![];

        // recursively search for items within radius in the kd-sorted ids
        while !stack.is_empty() {
            let axis = stack.pop().unwrap_or(0);
            let right = stack.pop().unwrap_or(0);
            let left = stack.pop().unwrap_or(0);

            // if we reached "tree node", search linearly
            if right - left <= self.node_size {
                for i in left..right + 1 {
                    let index = self.ids[i];
                    let dist_sq = sq_dist(&self.source, index as usize, query);
                    if dist_sq <= r_sq {
                        result.push(Neighbor { index, dist_sq });
                    }
                }
                continue;
            }

            // otherwise find the middle index
            let m = (left + right) >> 1;

            // include the middle item if it's in range
            let index = self.ids[m];
            let dist_sq = sq_dist(&self.source, index as usize, query);
            if dist_sq <= r_sq {
                result.push(Neighbor { index, dist_sq });
            }

            let delta = query[axis] - self.source.coord(index as usize, axis);
            let next_axis = (axis + 1) % self.num_dims();

            // queue search in halves that intersect the query ball
            if delta <= 0.0 || delta * delta <= r_sq {
                // Note: these are pushed in backwards order to what gets popped
                stack.push(left);
                stack.push(m - 1);
                stack.push(next_axis);
            }

            if delta >= 0.0 || delta * delta <= r_sq {
                // Note: these are pushed in backwards order to what gets popped
                stack.push(m + 1);
                stack.push(right);
                stack.push(next_axis);
            }
        }

        result
    }
}

#[inline]
fn push_candidate(heap: &mut BinaryHeap<Neighbor>, k: usize, candidate: Neighbor) {
    if heap.len() < k {
        heap.push(candidate);
    } else if heap
        .peek()
        .is_some_and(|worst| candidate.dist_sq < worst.dist_sq)
    {
        heap.pop();
        heap.push(candidate);
    }
}

#[inline]
pub(crate) fn sq_dist<S: PointSource>(source: &S, item: usize, query: &[f64]) -> f64 {
    let mut acc = 0.0;
    for (axis, q) in query.iter().enumerate() {
        let d = source.coord(item, axis) - q;
        acc += d * d;
    }
    acc
}
