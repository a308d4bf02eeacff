//! Batched queries: one hierarchy and one query set per batch item.
//!
//! Items are independent. Work fans out with rayon across items and across the
//! queries of each item; results come back in input order.

use crate::bvh::{BVHBuilder, Bvh};
use crate::error::{QueryError, QueryResult};
use crate::objects::PrimitiveStore;
use crate::query::{PointQueryResult, RayHit, Traversal};
use crate::types::ray::Ray;
use na::{Point3, Vector3};
use rayon::prelude::*;

/// Nearest-point results of one batch item as flat arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointQueryOutput {
    pub distances: Vec<f32>,
    pub primitives: Vec<i64>,
    pub closest_points: Vec<[f32; 3]>,
    pub barycentrics: Vec<[f32; 3]>,
}

impl PointQueryOutput {
    pub fn from_results(results: &[PointQueryResult]) -> Self {
        Self {
            distances: results.iter().map(|r| r.distance).collect(),
            primitives: results.iter().map(|r| r.primitive as i64).collect(),
            closest_points: results.iter().map(|r| point_array(&r.closest_point)).collect(),
            barycentrics: results.iter().map(|r| vector_array(&r.barycentric)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

/// Ray results of one batch item as flat arrays. Misses have distance `+inf`,
/// primitive `-1` and NaN points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RayQueryOutput {
    pub hits: Vec<bool>,
    pub distances: Vec<f32>,
    pub primitives: Vec<i64>,
    pub points: Vec<[f32; 3]>,
    pub barycentrics: Vec<[f32; 3]>,
}

impl RayQueryOutput {
    pub fn from_results(results: &[Option<RayHit>]) -> Self {
        let mut out = Self::default();
        for result in results {
            match result {
                Some(hit) => {
                    out.hits.push(true);
                    out.distances.push(hit.t);
                    out.primitives.push(hit.primitive as i64);
                    out.points.push(point_array(&hit.point));
                    out.barycentrics.push(vector_array(&hit.barycentric));
                }
                None => {
                    out.hits.push(false);
                    out.distances.push(f32::INFINITY);
                    out.primitives.push(-1);
                    out.points.push([f32::NAN; 3]);
                    out.barycentrics.push([f32::NAN; 3]);
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn hit_count(&self) -> usize {
        self.hits.iter().filter(|&&h| h).count()
    }
}

fn point_array(p: &Point3<f32>) -> [f32; 3] {
    [p.x, p.y, p.z]
}

fn vector_array(v: &Vector3<f32>) -> [f32; 3] {
    [v.x, v.y, v.z]
}

/// Builds one hierarchy per batch item. Shorthand for `BVHBuilder::build_batch`.
pub fn build_batch(builder: &BVHBuilder, stores: Vec<PrimitiveStore>) -> QueryResult<Vec<Bvh>> {
    builder.build_batch(stores)
}

pub struct BatchQuery<'a> {
    hierarchies: &'a [Bvh],
    traversal: Traversal,
}

impl<'a> BatchQuery<'a> {
    pub fn new(hierarchies: &'a [Bvh]) -> Self {
        Self {
            hierarchies,
            traversal: Traversal::Pruned,
        }
    }

    pub fn with_traversal(mut self, traversal: Traversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn hierarchies(&self) -> &'a [Bvh] {
        self.hierarchies
    }

    fn check_batch(&self, queries: usize) -> QueryResult<()> {
        if queries != self.hierarchies.len() {
            return Err(QueryError::BatchSizeMismatch {
                hierarchies: self.hierarchies.len(),
                queries,
            });
        }
        Ok(())
    }

    /// Nearest primitive for every point of every batch item.
    pub fn nearest_points<P>(&self, points: &[P]) -> QueryResult<Vec<Vec<PointQueryResult>>>
    where
        P: AsRef<[Point3<f32>]> + Sync,
    {
        self.check_batch(points.len())?;
        let mode = self.traversal;

        let results: Vec<Vec<PointQueryResult>> = self
            .hierarchies
            .par_iter()
            .zip(points.par_iter())
            .map(|(bvh, pts)| {
                pts.as_ref()
                    .par_iter()
                    .map(|p| bvh.nearest_point_with(p, mode).0)
                    .collect()
            })
            .collect();

        log::debug!(
            "Nearest-point batch: {} items, {} points",
            results.len(),
            results.iter().map(Vec::len).sum::<usize>()
        );
        Ok(results)
    }

    /// Same as `nearest_points` for raw `[x, y, z]` arrays, returning flat outputs.
    pub fn nearest_points_arrays<P>(&self, points: &[P]) -> QueryResult<Vec<PointQueryOutput>>
    where
        P: AsRef<[[f32; 3]]> + Sync,
    {
        let points: Vec<Vec<Point3<f32>>> = points
            .iter()
            .map(|pts| pts.as_ref().iter().map(|&p| Point3::from(p)).collect())
            .collect();
        let results = self.nearest_points(&points)?;
        Ok(results
            .iter()
            .map(|item| PointQueryOutput::from_results(item))
            .collect())
    }

    /// Nearest hit for every ray of every batch item. Directions are
    /// re-normalized; zero or non-finite ones fail the whole call.
    pub fn cast_rays<R>(&self, rays: &[R]) -> QueryResult<Vec<Vec<Option<RayHit>>>>
    where
        R: AsRef<[Ray]> + Sync,
    {
        self.check_batch(rays.len())?;
        let rays: Vec<Vec<Ray>> = rays
            .iter()
            .enumerate()
            .map(|(item, item_rays)| {
                item_rays
                    .as_ref()
                    .iter()
                    .enumerate()
                    .map(|(index, r)| {
                        Ray::new(r.origin, r.direction)
                            .ok_or(QueryError::InvalidRayDirection { item, index })
                    })
                    .collect::<QueryResult<Vec<_>>>()
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(self.cast_validated(&rays))
    }

    /// Ray queries from raw origin and direction arrays.
    pub fn cast_rays_arrays<P>(&self, origins: &[P], directions: &[P]) -> QueryResult<Vec<RayQueryOutput>>
    where
        P: AsRef<[[f32; 3]]> + Sync,
    {
        self.check_batch(origins.len())?;
        self.check_batch(directions.len())?;

        let rays: Vec<Vec<Ray>> = origins
            .iter()
            .zip(directions)
            .enumerate()
            .map(|(item, (o, d))| {
                let (o, d) = (o.as_ref(), d.as_ref());
                if o.len() != d.len() {
                    return Err(QueryError::RayShapeMismatch {
                        item,
                        origins: o.len(),
                        directions: d.len(),
                    });
                }
                o.iter()
                    .zip(d)
                    .enumerate()
                    .map(|(index, (&o, &d))| {
                        Ray::from_arrays(o, d).ok_or(QueryError::InvalidRayDirection { item, index })
                    })
                    .collect::<QueryResult<Vec<Ray>>>()
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(self
            .cast_validated(&rays)
            .iter()
            .map(|item| RayQueryOutput::from_results(item))
            .collect())
    }

    fn cast_validated(&self, rays: &[Vec<Ray>]) -> Vec<Vec<Option<RayHit>>> {
        let mode = self.traversal;
        let results: Vec<Vec<Option<RayHit>>> = self
            .hierarchies
            .par_iter()
            .zip(rays.par_iter())
            .map(|(bvh, item_rays)| {
                item_rays
                    .par_iter()
                    .map(|ray| bvh.cast_ray_with(ray, mode).0)
                    .collect()
            })
            .collect();

        log::debug!(
            "Ray batch: {} items, {} rays, {} hits",
            results.len(),
            results.iter().map(Vec::len).sum::<usize>(),
            results.iter().flatten().filter(|h| h.is_some()).count()
        );
        results
    }
}
