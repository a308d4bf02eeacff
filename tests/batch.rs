//! End-to-end batch behavior through the public API.

use bvh_distance_queries::{
    BVHBuilder, BatchQuery, Bvh, NonFinitePolicy, PointToMeshResidual, PrimitiveStore, QueryError,
    Ray, SplitMethod, Traversal, Triangle,
};
use nalgebra::{Point3, Vector3};

fn unit_triangle() -> PrimitiveStore {
    PrimitiveStore::from_triangle_array(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]])
}

/// `n` unit right triangles in the z = 0 plane, offset along x.
fn strip(n: usize) -> PrimitiveStore {
    (0..n)
        .map(|i| {
            let x = 2.0 * i as f32;
            Triangle::from_arrays([[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]])
        })
        .collect()
}

#[test]
fn point_above_unit_triangle() {
    let bvhs = vec![Bvh::new(unit_triangle()).unwrap()];
    let points = [vec![Point3::new(0.0, 0.0, 1.0)]];
    let results = BatchQuery::new(&bvhs).nearest_points(&points).unwrap();

    let r = results[0][0];
    assert_eq!(r.distance, 1.0);
    assert_eq!(r.primitive, 0);
    assert_eq!(r.closest_point, Point3::origin());
}

#[test]
fn ray_down_onto_unit_triangle() {
    let bvhs = vec![Bvh::new(unit_triangle()).unwrap()];
    let origins: [Vec<[f32; 3]>; 1] = [vec![[0.2, 0.2, 5.0]]];
    let directions: [Vec<[f32; 3]>; 1] = [vec![[0.0, 0.0, -1.0]]];
    let out = BatchQuery::new(&bvhs)
        .cast_rays_arrays(&origins, &directions)
        .unwrap();

    assert!(out[0].hits[0]);
    assert!((out[0].distances[0] - 5.0).abs() < 1e-5);
    let [x, y, z] = out[0].points[0];
    assert!((x - 0.2).abs() < 1e-5 && (y - 0.2).abs() < 1e-5 && z.abs() < 1e-5);
    assert_eq!(out[0].primitives[0], 0);
}

#[test]
fn items_keep_their_own_shapes_and_order() {
    let bvhs = BVHBuilder::new()
        .build_batch(vec![strip(3), strip(7)])
        .unwrap();
    let points: [Vec<[f32; 3]>; 2] = [
        vec![
            [0.2, 0.2, 1.0],
            [2.2, 0.2, 2.0],
            [4.2, 0.2, 3.0],
            [12.2, 0.2, 0.0],
            [0.2, 0.2, -0.5],
        ],
        vec![[12.2, 0.2, 0.5], [0.2, 0.2, 4.0]],
    ];
    let out = BatchQuery::new(&bvhs).nearest_points_arrays(&points).unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].len(), 5);
    assert_eq!(out[1].len(), 2);

    assert_eq!(out[0].primitives, vec![0, 1, 2, 2, 0]);
    assert_eq!(out[0].distances[..3], [1.0, 2.0, 3.0]);
    assert_eq!(out[0].distances[4], 0.5);
    // Item 0 has no triangle near x = 12; item 1 does.
    assert!(out[0].distances[3] > 7.0);
    assert_eq!(out[1].primitives, vec![6, 0]);
    assert_eq!(out[1].distances, vec![0.5, 4.0]);
}

#[test]
fn degenerate_collinear_triangle() {
    let store =
        PrimitiveStore::from_triangle_array(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]]);
    let bvhs = vec![Bvh::new(store).unwrap()];
    let points = [vec![Point3::new(1.0, 1.0, 0.0), Point3::new(3.0, 0.0, 0.0)]];
    let results = BatchQuery::new(&bvhs).nearest_points(&points).unwrap();

    assert!((results[0][0].distance - 1.0).abs() < 1e-6);
    assert!((results[0][1].distance - 1.0).abs() < 1e-6);
    assert!((results[0][1].closest_point - Point3::new(2.0, 0.0, 0.0)).norm() < 1e-6);
}

#[test]
fn empty_query_sets_are_fine() {
    let bvhs = vec![Bvh::new(unit_triangle()).unwrap(), Bvh::new(strip(2)).unwrap()];
    let points: [Vec<Point3<f32>>; 2] = [Vec::new(), vec![Point3::new(0.0, 0.0, 1.0)]];
    let results = BatchQuery::new(&bvhs).nearest_points(&points).unwrap();

    assert!(results[0].is_empty());
    assert_eq!(results[1].len(), 1);
}

#[test]
fn batch_size_must_match() {
    let bvhs = vec![Bvh::new(unit_triangle()).unwrap()];
    let points: [Vec<Point3<f32>>; 2] = [Vec::new(), Vec::new()];
    let err = BatchQuery::new(&bvhs).nearest_points(&points).unwrap_err();
    assert!(matches!(
        err,
        QueryError::BatchSizeMismatch {
            hierarchies: 1,
            queries: 2
        }
    ));
}

#[test]
fn zero_direction_is_reported_with_position() {
    let bvhs = vec![Bvh::new(unit_triangle()).unwrap(), Bvh::new(strip(2)).unwrap()];
    let origins: [Vec<[f32; 3]>; 2] = [vec![[0.0, 0.0, 1.0]], vec![[0.0, 0.0, 1.0], [0.0; 3]]];
    let directions: [Vec<[f32; 3]>; 2] = [vec![[0.0, 0.0, -1.0]], vec![[0.0, 0.0, -1.0], [0.0; 3]]];
    let err = BatchQuery::new(&bvhs)
        .cast_rays_arrays(&origins, &directions)
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::InvalidRayDirection { item: 1, index: 1 }
    ));
}

#[test]
fn unnormalized_directions_are_renormalized() {
    let bvhs = vec![Bvh::new(unit_triangle()).unwrap()];
    let rays = [vec![Ray {
        origin: Point3::new(0.25, 0.25, 3.0),
        direction: Vector3::new(0.0, 0.0, -10.0),
    }]];
    let hits = BatchQuery::new(&bvhs).cast_rays(&rays).unwrap();
    let hit = hits[0][0].unwrap();
    assert!((hit.t - 3.0).abs() < 1e-5);
}

#[test]
fn misses_use_sentinels() {
    let bvhs = vec![Bvh::new(unit_triangle()).unwrap()];
    let origins: [Vec<[f32; 3]>; 1] = [vec![[5.0, 5.0, 1.0]]];
    let directions: [Vec<[f32; 3]>; 1] = [vec![[0.0, 0.0, -1.0]]];
    let out = BatchQuery::new(&bvhs)
        .cast_rays_arrays(&origins, &directions)
        .unwrap();

    assert!(!out[0].hits[0]);
    assert_eq!(out[0].hit_count(), 0);
    assert_eq!(out[0].distances[0], f32::INFINITY);
    assert_eq!(out[0].primitives[0], -1);
    assert!(out[0].points[0].iter().all(|v| v.is_nan()));
}

#[test]
fn non_finite_item_does_not_leak_into_others() {
    let mut poisoned = strip(3);
    poisoned.add(Triangle::from_arrays([[f32::NAN, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]));
    let bvhs = BVHBuilder::new()
        .with_non_finite(NonFinitePolicy::Propagate)
        .build_batch(vec![poisoned, strip(3)])
        .unwrap();
    let points = [vec![Point3::new(0.2, 0.2, 1.0)], vec![Point3::new(0.2, 0.2, 1.0)]];
    let results = BatchQuery::new(&bvhs).nearest_points(&points).unwrap();

    assert!(results[0][0].distance.is_nan());
    assert_eq!(results[0][0].primitive, 3);
    assert_eq!(results[1][0].distance, 1.0);

    let mut poisoned = strip(1);
    poisoned.add(Triangle::from_arrays([[0.0, f32::INFINITY, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]));
    let err = BVHBuilder::new()
        .with_non_finite(NonFinitePolicy::Reject)
        .build_batch(vec![strip(1), poisoned])
        .unwrap_err();
    assert!(matches!(err, QueryError::NonFiniteVertex { primitive: 1 }));
}

#[test]
fn traversal_modes_and_split_methods_agree_in_batch() {
    let stores = vec![strip(9), strip(4)];
    let points = [
        vec![Point3::new(3.1, 0.4, 0.7), Point3::new(17.5, -1.0, 0.0)],
        vec![Point3::new(-1.0, -1.0, -1.0)],
    ];

    let mut outputs = Vec::new();
    for split in [SplitMethod::Median, SplitMethod::Sah] {
        let bvhs = BVHBuilder::new()
            .with_split_method(split)
            .with_max_leaf_size(1)
            .build_batch(stores.clone())
            .unwrap();
        for mode in [Traversal::Pruned, Traversal::Exhaustive] {
            outputs.push(
                BatchQuery::new(&bvhs)
                    .with_traversal(mode)
                    .nearest_points(&points)
                    .unwrap(),
            );
        }
    }
    for other in &outputs[1..] {
        assert_eq!(other, &outputs[0]);
    }
}

#[test]
fn residuals_over_a_batch() {
    let bvhs = BVHBuilder::new().build_batch(vec![strip(2)]).unwrap();
    let points = [vec![Point3::new(0.25, 0.25, 2.0)]];
    let out = PointToMeshResidual::new(&bvhs).compute(&points).unwrap();

    assert_eq!(out[0].residuals, vec![[0.0, 0.0, 2.0]]);
    assert_eq!(out[0].squared_distances, vec![4.0]);
    assert_eq!(out[0].primitives, vec![0]);
}
