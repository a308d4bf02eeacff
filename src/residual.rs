//! Point-to-mesh residuals built on batched nearest-point queries.
//!
//! For every query point `p` the residual is `p - closest(p)`, the vector a
//! fitting loss pulls the point along. Gradients are the caller's business.

use crate::batch::BatchQuery;
use crate::bvh::Bvh;
use crate::error::QueryResult;
use crate::query::Traversal;
use na::Point3;

/// Residuals of one batch item, index-aligned with its query points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResidualOutput {
    pub residuals: Vec<[f32; 3]>,
    pub squared_distances: Vec<f32>,
    pub primitives: Vec<i64>,
    pub closest_points: Vec<[f32; 3]>,
}

impl ResidualOutput {
    pub fn len(&self) -> usize {
        self.squared_distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squared_distances.is_empty()
    }

    /// Mean squared distance of the item; zero when it has no points.
    pub fn mean_squared_distance(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        self.squared_distances.iter().sum::<f32>() / self.len() as f32
    }
}

pub struct PointToMeshResidual<'a> {
    query: BatchQuery<'a>,
}

impl<'a> PointToMeshResidual<'a> {
    pub fn new(hierarchies: &'a [Bvh]) -> Self {
        Self {
            query: BatchQuery::new(hierarchies),
        }
    }

    pub fn with_traversal(self, traversal: Traversal) -> Self {
        Self {
            query: self.query.with_traversal(traversal),
        }
    }

    pub fn compute<P>(&self, points: &[P]) -> QueryResult<Vec<ResidualOutput>>
    where
        P: AsRef<[Point3<f32>]> + Sync,
    {
        let nearest = self.query.nearest_points(points)?;

        let outputs = points
            .iter()
            .zip(&nearest)
            .map(|(pts, results)| {
                let mut out = ResidualOutput::default();
                for (p, r) in pts.as_ref().iter().zip(results) {
                    let residual = p - r.closest_point;
                    out.residuals.push([residual.x, residual.y, residual.z]);
                    out.squared_distances.push(r.distance * r.distance);
                    out.primitives.push(r.primitive as i64);
                    out.closest_points
                        .push([r.closest_point.x, r.closest_point.y, r.closest_point.z]);
                }
                out
            })
            .collect();

        Ok(outputs)
    }
}

/// Mean squared distance over every point of every item.
pub fn total_mean_squared_distance(outputs: &[ResidualOutput]) -> f32 {
    let count: usize = outputs.iter().map(ResidualOutput::len).sum();
    if count == 0 {
        return 0.0;
    }
    let total: f32 = outputs
        .iter()
        .flat_map(|o| o.squared_distances.iter())
        .sum();
    total / count as f32
}
