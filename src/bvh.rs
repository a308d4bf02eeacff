pub mod bbox;
pub mod builder;

pub use bbox::BBox;
pub use builder::{BVHBuilder, NonFinitePolicy, SplitMethod};

use crate::error::QueryResult;
use crate::objects::PrimitiveStore;

/// Flat tree node. Children and leaf ranges are indices, never pointers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BVHNode {
    Internal { bbox: BBox, left: u32, right: u32 },
    /// `start..start + count` indexes the hierarchy's permutation array.
    Leaf { bbox: BBox, start: u32, count: u32 },
}

impl BVHNode {
    pub fn bbox(&self) -> &BBox {
        match self {
            Self::Internal { bbox, .. } | Self::Leaf { bbox, .. } => bbox,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// Static bounding volume hierarchy over one primitive store.
///
/// Nodes live in a single vector with the root at index 0. Building only
/// permutes primitive indices; `permutation` maps every leaf slot back to the
/// primitive's position in the original store, which is the index reported by
/// queries.
#[derive(Clone, Debug)]
pub struct Bvh {
    pub(crate) nodes: Vec<BVHNode>,
    pub(crate) permutation: Vec<u32>,
    pub(crate) primitives: PrimitiveStore,
    pub(crate) non_finite: Vec<u32>,
}

impl Bvh {
    /// Builds with the default settings (SAH, leaves of up to 4 primitives).
    pub fn new(primitives: PrimitiveStore) -> QueryResult<Self> {
        BVHBuilder::default().build(primitives)
    }

    pub fn nodes(&self) -> &[BVHNode] {
        &self.nodes
    }

    pub fn root(&self) -> Option<&BVHNode> {
        self.nodes.first()
    }

    pub fn permutation(&self) -> &[u32] {
        &self.permutation
    }

    pub fn primitives(&self) -> &PrimitiveStore {
        &self.primitives
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Original indices of primitives with NaN or infinite vertices, ascending.
    pub fn non_finite(&self) -> &[u32] {
        &self.non_finite
    }

    /// Original primitive indices stored in a leaf range.
    pub fn leaf_primitives(&self, start: u32, count: u32) -> &[u32] {
        &self.permutation[start as usize..(start + count) as usize]
    }

    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats::default();
        if self.nodes.is_empty() {
            return stats;
        }

        let mut stack: Vec<(u32, usize)> = vec![(0, 0)];
        while let Some((node, depth)) = stack.pop() {
            stats.node_count += 1;
            stats.max_depth = stats.max_depth.max(depth);
            match self.nodes[node as usize] {
                BVHNode::Internal { left, right, .. } => {
                    stats.internal_count += 1;
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
                BVHNode::Leaf { count, .. } => {
                    stats.leaf_count += 1;
                    stats.primitives_in_leaves += count as usize;
                    stats.max_leaf_size = stats.max_leaf_size.max(count as usize);
                }
            }
        }
        stats
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub node_count: usize,
    pub internal_count: usize,
    pub leaf_count: usize,
    /// Root has depth 0.
    pub max_depth: usize,
    pub max_leaf_size: usize,
    pub primitives_in_leaves: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::triangle::Triangle;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn hierarchy_is_shareable_across_threads() {
        assert_send_sync::<Bvh>();
    }

    #[test]
    fn stats_of_balanced_tree() {
        let store: PrimitiveStore = (0..8)
            .map(|i| {
                let x = 2.0 * i as f32;
                Triangle::from_arrays([[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]])
            })
            .collect();
        let bvh = BVHBuilder::new()
            .with_split_method(SplitMethod::Median)
            .with_max_leaf_size(1)
            .build(store)
            .unwrap();

        let stats = bvh.stats();
        assert_eq!(stats.leaf_count, 8);
        assert_eq!(stats.internal_count, 7);
        assert_eq!(stats.node_count, bvh.nodes().len());
        assert_eq!(stats.max_depth, 3);
        assert_eq!(stats.primitives_in_leaves, 8);
        assert!(bvh.root().is_some());
    }

    #[test]
    fn default_build_keeps_original_store() {
        let tri = Triangle::from_arrays([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let bvh = Bvh::new(PrimitiveStore::from_triangles(vec![tri])).unwrap();
        assert_eq!(bvh.primitive_count(), 1);
        assert_eq!(bvh.primitives()[0], tri);
        assert_eq!(bvh.leaf_primitives(0, 1), &[0]);
    }
}
