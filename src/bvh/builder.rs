use super::bbox::{BBox, BOX_PADDING};
use super::{BVHNode, Bvh};
use crate::error::{QueryError, QueryResult};
use crate::objects::PrimitiveStore;
use na::Point3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMethod {
    /// Median centroid along the longest axis.
    Median,
    /// Bucketed surface area heuristic along the longest axis.
    Sah,
}

/// What to do with primitives that have a NaN or infinite vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonFinitePolicy {
    /// Keep them out of the tree; every query on the hierarchy reports NaN.
    #[default]
    Propagate,
    /// Fail the build.
    Reject,
}

#[derive(Clone, Copy, Debug)]
pub struct BVHBuilder {
    split_method: SplitMethod,
    max_leaf_size: usize,
    sah_buckets: usize,
    non_finite: NonFinitePolicy,
}

impl Default for BVHBuilder {
    fn default() -> Self {
        Self {
            split_method: SplitMethod::Sah,
            max_leaf_size: 4,
            sah_buckets: 12,
            non_finite: NonFinitePolicy::Propagate,
        }
    }
}

impl BVHBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Self {
        self.max_leaf_size = max_leaf_size;
        self
    }

    pub fn with_sah_buckets(mut self, sah_buckets: usize) -> Self {
        self.sah_buckets = sah_buckets;
        self
    }

    pub fn with_non_finite(mut self, non_finite: NonFinitePolicy) -> Self {
        self.non_finite = non_finite;
        self
    }

    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }

    pub fn max_leaf_size(&self) -> usize {
        self.max_leaf_size
    }

    pub fn validate(&self) -> QueryResult<()> {
        if self.max_leaf_size == 0 {
            return Err(QueryError::InvalidConfig {
                message: "max_leaf_size must be at least 1".to_string(),
            });
        }
        if self.split_method == SplitMethod::Sah && self.sah_buckets < 2 {
            return Err(QueryError::InvalidConfig {
                message: format!("sah_buckets must be at least 2, got {}", self.sah_buckets),
            });
        }
        Ok(())
    }

    pub fn build(&self, primitives: PrimitiveStore) -> QueryResult<Bvh> {
        self.validate()?;
        if primitives.is_empty() {
            return Err(QueryError::EmptyMesh { item: 0 });
        }

        let mut indices: Vec<u32> = Vec::with_capacity(primitives.len());
        let mut non_finite: Vec<u32> = Vec::new();
        for (i, tri) in primitives.iter().enumerate() {
            if tri.is_finite() {
                indices.push(i as u32);
            } else {
                match self.non_finite {
                    NonFinitePolicy::Reject => {
                        return Err(QueryError::NonFiniteVertex { primitive: i })
                    }
                    NonFinitePolicy::Propagate => non_finite.push(i as u32),
                }
            }
        }

        if !non_finite.is_empty() {
            log::warn!(
                "{} of {} primitives have non-finite vertices (first: {}); queries will report NaN",
                non_finite.len(),
                primitives.len(),
                non_finite[0]
            );
        }

        let boxes: Vec<BBox> = primitives
            .iter()
            .map(|tri| tri.bbox().padded(BOX_PADDING))
            .collect();
        let centroids: Vec<Point3<f32>> = primitives.iter().map(|tri| tri.centroid()).collect();

        let nodes = if indices.is_empty() {
            Vec::new()
        } else {
            self.build_nodes(&boxes, &centroids, &mut indices)
        };

        let bvh = Bvh {
            nodes,
            permutation: indices,
            primitives,
            non_finite,
        };

        if log::log_enabled!(log::Level::Debug) {
            let stats = bvh.stats();
            log::debug!(
                "Built BVH over {} primitives: {} nodes, {} leaves, depth {}",
                bvh.primitive_count(),
                stats.node_count,
                stats.leaf_count,
                stats.max_depth
            );
        }

        Ok(bvh)
    }

    /// Builds one hierarchy per store in parallel. On failure the error of the
    /// lowest failing item is returned.
    pub fn build_batch(&self, stores: Vec<PrimitiveStore>) -> QueryResult<Vec<Bvh>> {
        let results: Vec<QueryResult<Bvh>> = stores
            .into_par_iter()
            .enumerate()
            .map(|(item, store)| self.build(store).map_err(|e| e.at_item(item)))
            .collect();

        results.into_iter().collect()
    }

    fn build_nodes(
        &self,
        boxes: &[BBox],
        centroids: &[Point3<f32>],
        indices: &mut [u32],
    ) -> Vec<BVHNode> {
        let placeholder = BVHNode::Leaf {
            bbox: BBox::empty(),
            start: 0,
            count: 0,
        };

        let mut nodes: Vec<BVHNode> = Vec::with_capacity(2 * indices.len() - 1);
        nodes.push(placeholder);

        let mut stack: Vec<(usize, usize, usize)> = vec![(0, 0, indices.len())];
        while let Some((node, start, end)) = stack.pop() {
            let range = &mut indices[start..end];
            let bbox = range
                .iter()
                .fold(BBox::empty(), |acc, &i| acc.merge(&boxes[i as usize]));

            if range.len() <= self.max_leaf_size {
                nodes[node] = BVHNode::Leaf {
                    bbox,
                    start: start as u32,
                    count: range.len() as u32,
                };
                continue;
            }

            let mid = start + self.partition(range, boxes, centroids, &bbox);

            let left = nodes.len();
            nodes.push(placeholder);
            nodes.push(placeholder);
            nodes[node] = BVHNode::Internal {
                bbox,
                left: left as u32,
                right: (left + 1) as u32,
            };

            stack.push((left + 1, mid, end));
            stack.push((left, start, mid));
        }

        nodes
    }

    /// Reorders `range` and returns the size of the left half, always in
    /// `1..range.len()`.
    fn partition(
        &self,
        range: &mut [u32],
        boxes: &[BBox],
        centroids: &[Point3<f32>],
        bbox: &BBox,
    ) -> usize {
        let axis = bbox.get_longest_axis();
        match self.split_method {
            SplitMethod::Median => median_split(range, centroids, axis),
            SplitMethod::Sah => self
                .sah_split(range, boxes, centroids, axis)
                .unwrap_or_else(|| median_split(range, centroids, axis)),
        }
    }

    fn sah_split(
        &self,
        range: &mut [u32],
        boxes: &[BBox],
        centroids: &[Point3<f32>],
        axis: usize,
    ) -> Option<usize> {
        let (cmin, cmax) = range.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(lo, hi), &i| {
                let c = centroids[i as usize][axis];
                (lo.min(c), hi.max(c))
            },
        );
        // All centroids coincide along the axis
        if !(cmax > cmin) {
            return None;
        }

        let buckets = self.sah_buckets;
        let scale = buckets as f32 / (cmax - cmin);
        let bucket_of = |i: u32| -> usize {
            let c = centroids[i as usize][axis];
            (((c - cmin) * scale) as usize).min(buckets - 1)
        };

        let mut counts = vec![0_usize; buckets];
        let mut bounds = vec![BBox::empty(); buckets];
        for &i in range.iter() {
            let b = bucket_of(i);
            counts[b] += 1;
            bounds[b] = bounds[b].merge(&boxes[i as usize]);
        }

        // Sweep from the right to get suffix areas and counts
        let mut right_area = vec![0.0_f32; buckets];
        let mut right_count = vec![0_usize; buckets];
        let mut acc = BBox::empty();
        let mut count = 0;
        for b in (1..buckets).rev() {
            acc = acc.merge(&bounds[b]);
            count += counts[b];
            right_area[b] = acc.get_surface_area();
            right_count[b] = count;
        }

        let mut best: Option<(usize, f32)> = None;
        let mut left = BBox::empty();
        let mut left_count = 0;
        for b in 0..buckets - 1 {
            left = left.merge(&bounds[b]);
            left_count += counts[b];
            if left_count == 0 || right_count[b + 1] == 0 {
                continue;
            }
            let cost = left.get_surface_area() * left_count as f32
                + right_area[b + 1] * right_count[b + 1] as f32;
            match best {
                Some((_, best_cost)) if best_cost <= cost => {}
                _ => best = Some((b, cost)),
            }
        }

        let (split_bucket, _) = best?;

        // In-place partition: left holds buckets <= split_bucket
        let mut mid = 0;
        for j in 0..range.len() {
            if bucket_of(range[j]) <= split_bucket {
                range.swap(mid, j);
                mid += 1;
            }
        }

        if mid == 0 || mid == range.len() {
            None
        } else {
            Some(mid)
        }
    }
}

/// Even index-count split around the median centroid. Ties are ordered by
/// original index so the result does not depend on the input permutation.
fn median_split(range: &mut [u32], centroids: &[Point3<f32>], axis: usize) -> usize {
    let mid = range.len() / 2;
    range.select_nth_unstable_by(mid, |&a, &b| {
        centroids[a as usize][axis]
            .total_cmp(&centroids[b as usize][axis])
            .then(a.cmp(&b))
    });
    mid
}
