use super::{RayHit, Traversal, TraversalStats, STACK_CAPACITY};
use crate::bvh::{BVHNode, Bvh};
use crate::objects::triangle::TriangleHit;
use crate::types::ray::Ray;

impl Bvh {
    /// Nearest crossing with `t >= 0`, or `None` when the ray misses.
    pub fn cast_ray(&self, ray: &Ray) -> Option<RayHit> {
        self.cast_ray_with(ray, Traversal::Pruned).0
    }

    pub fn cast_ray_with(&self, ray: &Ray, mode: Traversal) -> (Option<RayHit>, TraversalStats) {
        let mut stats = TraversalStats::default();
        if let Some(&bad) = self.non_finite.first() {
            return (Some(RayHit::non_finite(bad)), stats);
        }

        let mut best: Option<(u32, TriangleHit)> = None;
        let mut best_t = f32::INFINITY;

        let mut stack: Vec<u32> = Vec::with_capacity(STACK_CAPACITY);
        if !self.nodes.is_empty() {
            stack.push(0);
        }

        while let Some(node) = stack.pop() {
            stats.nodes_visited += 1;
            let node = &self.nodes[node as usize];

            if mode == Traversal::Pruned && node.bbox().hit(ray, 0.0, best_t).is_none() {
                continue;
            }

            match *node {
                BVHNode::Leaf { start, count, .. } => {
                    for &i in self.leaf_primitives(start, count) {
                        stats.primitives_tested += 1;
                        let Some(hit) = self.primitives[i as usize].hit(ray, 0.0, best_t) else {
                            continue;
                        };
                        let better = match best {
                            None => true,
                            Some((best_i, _)) => hit.t < best_t || (hit.t == best_t && i < best_i),
                        };
                        if better {
                            best_t = hit.t;
                            best = Some((i, hit));
                        }
                    }
                }
                BVHNode::Internal { left, right, .. } => match mode {
                    Traversal::Exhaustive => {
                        stack.push(right);
                        stack.push(left);
                    }
                    Traversal::Pruned => {
                        let tl = self.nodes[left as usize].bbox().hit(ray, 0.0, best_t);
                        let tr = self.nodes[right as usize].bbox().hit(ray, 0.0, best_t);
                        match (tl, tr) {
                            (Some((tl, _)), Some((tr, _))) => {
                                // Nearer entry goes on top
                                if tr < tl {
                                    stack.push(left);
                                    stack.push(right);
                                } else {
                                    stack.push(right);
                                    stack.push(left);
                                }
                            }
                            (Some(_), None) => stack.push(left),
                            (None, Some(_)) => stack.push(right),
                            (None, None) => {}
                        }
                    }
                },
            }
        }

        let result = best.map(|(primitive, hit)| RayHit {
            t: hit.t,
            primitive,
            barycentric: hit.barycentric,
            point: self.primitives[primitive as usize].bary_interpolate(&hit.barycentric),
        });
        (result, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::BVHBuilder;
    use crate::objects::triangle::Triangle;
    use crate::objects::PrimitiveStore;
    use na::{Point3, Vector3};

    fn unit_triangle() -> Triangle {
        Triangle::from_arrays([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])
    }

    /// Parallel unit triangles stacked along z at 0, 1, ..., n - 1.
    fn stack_of(n: usize) -> PrimitiveStore {
        (0..n)
            .map(|i| {
                let z = i as f32;
                Triangle::from_arrays([[0.0, 0.0, z], [1.0, 0.0, z], [0.0, 1.0, z]])
            })
            .collect()
    }

    #[test]
    fn unit_triangle_hit() {
        let bvh = Bvh::new(PrimitiveStore::from_triangles(vec![unit_triangle()])).unwrap();
        let ray = Ray::from_arrays([0.2, 0.2, 5.0], [0.0, 0.0, -1.0]).unwrap();
        let hit = bvh.cast_ray(&ray).unwrap();

        assert!((hit.t - 5.0).abs() < 1e-5);
        assert_eq!(hit.primitive, 0);
        assert!((hit.point - Point3::new(0.2, 0.2, 0.0)).norm() < 1e-5);
        assert!((hit.barycentric - Vector3::new(0.6, 0.2, 0.2)).norm() < 1e-5);
    }

    #[test]
    fn miss_is_none() {
        let bvh = Bvh::new(stack_of(4)).unwrap();
        let away = Ray::from_arrays([0.2, 0.2, 10.0], [0.0, 0.0, 1.0]).unwrap();
        assert!(bvh.cast_ray(&away).is_none());

        let beside = Ray::from_arrays([5.0, 5.0, 10.0], [0.0, 0.0, -1.0]).unwrap();
        assert!(bvh.cast_ray(&beside).is_none());
    }

    #[test]
    fn nearest_of_many_crossings() {
        let bvh = BVHBuilder::new().with_max_leaf_size(1).build(stack_of(10)).unwrap();

        let down = Ray::from_arrays([0.1, 0.1, 20.0], [0.0, 0.0, -1.0]).unwrap();
        let hit = bvh.cast_ray(&down).unwrap();
        assert_eq!(hit.primitive, 9);
        assert!((hit.t - 11.0).abs() < 1e-5);

        let up = Ray::from_arrays([0.1, 0.1, 4.5], [0.0, 0.0, 1.0]).unwrap();
        let hit = bvh.cast_ray(&up).unwrap();
        assert_eq!(hit.primitive, 5);
        assert!((hit.t - 0.5).abs() < 1e-5);
    }

    #[test]
    fn origin_on_surface_hits_at_zero() {
        let bvh = Bvh::new(stack_of(3)).unwrap();
        let ray = Ray::from_arrays([0.25, 0.25, 1.0], [0.0, 0.0, 1.0]).unwrap();
        let hit = bvh.cast_ray(&ray).unwrap();
        assert_eq!(hit.primitive, 1);
        assert_eq!(hit.t, 0.0);
    }

    #[test]
    fn pruned_matches_exhaustive() {
        let bvh = BVHBuilder::new().with_max_leaf_size(2).build(stack_of(32)).unwrap();
        let ray = Ray::from_arrays([0.3, 0.3, 12.5], [0.0, 0.0, -1.0]).unwrap();

        let (pruned, pruned_stats) = bvh.cast_ray_with(&ray, Traversal::Pruned);
        let (full, full_stats) = bvh.cast_ray_with(&ray, Traversal::Exhaustive);
        assert_eq!(pruned, full);
        assert_eq!(full_stats.primitives_tested, 32);
        assert!(pruned_stats.primitives_tested < full_stats.primitives_tested);
    }

    #[test]
    fn duplicate_triangles_resolve_to_lowest_index() {
        let store = PrimitiveStore::from_triangles(vec![unit_triangle(); 6]);
        let bvh = BVHBuilder::new().with_max_leaf_size(1).build(store).unwrap();
        let ray = Ray::from_arrays([0.2, 0.2, 5.0], [0.0, 0.0, -1.0]).unwrap();
        assert_eq!(bvh.cast_ray(&ray).unwrap().primitive, 0);
    }

    #[test]
    fn non_finite_geometry_reports_nan_hit() {
        let mut store = stack_of(2);
        store.add(Triangle::from_arrays([[0.0, 0.0, 0.0], [f32::INFINITY, 0.0, 0.0], [0.0, 1.0, 0.0]]));
        let bvh = Bvh::new(store).unwrap();
        let ray = Ray::from_arrays([0.2, 0.2, 5.0], [0.0, 0.0, -1.0]).unwrap();
        let hit = bvh.cast_ray(&ray).unwrap();
        assert!(hit.t.is_nan());
        assert_eq!(hit.primitive, 2);
    }
}
