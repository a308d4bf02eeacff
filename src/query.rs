//! Nearest-point and ray queries against a single hierarchy.
//!
//! Both traversals keep an explicit stack of node indices, so deep trees never
//! grow the call stack. A query only reads the hierarchy; any number of them
//! may run against the same `Bvh` from different threads.

pub mod point;
pub mod ray;

use na::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// How subtrees are skipped during traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Traversal {
    /// Skip subtrees whose box cannot beat the current best.
    #[default]
    Pruned,
    /// Visit every leaf. Same results, linear cost; used as a reference.
    Exhaustive,
}

/// Work done by one query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub nodes_visited: usize,
    pub primitives_tested: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointQueryResult {
    /// Euclidean distance to the nearest primitive. NaN when the hierarchy
    /// holds non-finite geometry.
    pub distance: f32,
    /// Index into the original primitive store.
    pub primitive: u32,
    pub closest_point: Point3<f32>,
    pub barycentric: Vector3<f32>,
}

impl PointQueryResult {
    pub(crate) fn non_finite(primitive: u32) -> Self {
        Self {
            distance: f32::NAN,
            primitive,
            closest_point: Point3::new(f32::NAN, f32::NAN, f32::NAN),
            barycentric: Vector3::repeat(f32::NAN),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Distance along the normalized ray, `t >= 0`.
    pub t: f32,
    /// Index into the original primitive store.
    pub primitive: u32,
    pub barycentric: Vector3<f32>,
    pub point: Point3<f32>,
}

impl RayHit {
    pub(crate) fn non_finite(primitive: u32) -> Self {
        Self {
            t: f32::NAN,
            primitive,
            barycentric: Vector3::repeat(f32::NAN),
            point: Point3::new(f32::NAN, f32::NAN, f32::NAN),
        }
    }
}

/// Initial traversal stack capacity; grows if a tree is deeper.
pub(crate) const STACK_CAPACITY: usize = 64;
