use super::{PointQueryResult, Traversal, TraversalStats, STACK_CAPACITY};
use crate::bvh::{BVHNode, Bvh};
use crate::objects::triangle::ClosestPoint;
use na::Point3;

impl Bvh {
    /// Nearest primitive to `p`. Ties go to the lowest original index.
    pub fn nearest_point(&self, p: &Point3<f32>) -> PointQueryResult {
        self.nearest_point_with(p, Traversal::Pruned).0
    }

    pub fn nearest_point_with(
        &self,
        p: &Point3<f32>,
        mode: Traversal,
    ) -> (PointQueryResult, TraversalStats) {
        let mut stats = TraversalStats::default();
        if let Some(&bad) = self.non_finite.first() {
            return (PointQueryResult::non_finite(bad), stats);
        }

        let mut best: Option<(u32, ClosestPoint)> = None;
        let mut best_d2 = f32::INFINITY;

        let mut stack: Vec<u32> = Vec::with_capacity(STACK_CAPACITY);
        if !self.nodes.is_empty() {
            stack.push(0);
        }

        while let Some(node) = stack.pop() {
            stats.nodes_visited += 1;
            let node = &self.nodes[node as usize];

            // Equal bounds are still explored so ties resolve to the lowest index
            if mode == Traversal::Pruned && node.bbox().distance_squared(p) > best_d2 {
                continue;
            }

            match *node {
                BVHNode::Leaf { start, count, .. } => {
                    for &i in self.leaf_primitives(start, count) {
                        stats.primitives_tested += 1;
                        let cp = self.primitives[i as usize].closest_point(p);
                        let better = match best {
                            None => true,
                            Some((best_i, _)) => {
                                cp.distance_squared < best_d2
                                    || (cp.distance_squared == best_d2 && i < best_i)
                            }
                        };
                        if better {
                            best_d2 = cp.distance_squared;
                            best = Some((i, cp));
                        }
                    }
                }
                BVHNode::Internal { left, right, .. } => match mode {
                    Traversal::Exhaustive => {
                        stack.push(right);
                        stack.push(left);
                    }
                    Traversal::Pruned => {
                        let dl = self.nodes[left as usize].bbox().distance_squared(p);
                        let dr = self.nodes[right as usize].bbox().distance_squared(p);
                        // Nearer child goes on top
                        let (near, d_near, far, d_far) = if dr < dl {
                            (right, dr, left, dl)
                        } else {
                            (left, dl, right, dr)
                        };
                        if d_far <= best_d2 {
                            stack.push(far);
                        }
                        if d_near <= best_d2 {
                            stack.push(near);
                        }
                    }
                },
            }
        }

        let result = match best {
            Some((primitive, cp)) => PointQueryResult {
                distance: cp.distance_squared.sqrt(),
                primitive,
                closest_point: cp.point,
                barycentric: cp.barycentric,
            },
            None => PointQueryResult::non_finite(0),
        };
        (result, stats)
    }
}
