use crate::bvh::BBox;
use crate::types::ray::Ray;
use na::{Point3, Vector3};

/// Closest point on a triangle to a query point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestPoint {
    pub point: Point3<f32>,
    /// Weights of the three vertices, summing to one.
    pub barycentric: Vector3<f32>,
    pub distance_squared: f32,
}

/// Ray parameter and barycentric weights of a ray-triangle crossing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub barycentric: Vector3<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    vertices: [Point3<f32>; 3],
}

impl Triangle {
    pub fn new(vertices: [Point3<f32>; 3]) -> Self {
        Self { vertices }
    }

    pub fn from_arrays(vertices: [[f32; 3]; 3]) -> Self {
        Self::new(vertices.map(Point3::from))
    }

    pub fn position(&self, vertex: usize) -> Point3<f32> {
        self.vertices[vertex]
    }

    pub fn vertices(&self) -> &[Point3<f32>; 3] {
        &self.vertices
    }

    pub fn is_finite(&self) -> bool {
        self.vertices
            .iter()
            .all(|v| v.coords.iter().all(|c| c.is_finite()))
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_points(&self.vertices)
    }

    pub fn centroid(&self) -> Point3<f32> {
        Point3::from((self.vertices[0].coords + self.vertices[1].coords + self.vertices[2].coords) / 3.0)
    }

    pub fn area(&self) -> f32 {
        let [v0, v1, v2] = &self.vertices;
        0.5 * (v1 - v0).cross(&(v2 - v0)).norm()
    }

    pub fn bary_interpolate(&self, bary_coords: &Vector3<f32>) -> Point3<f32> {
        Point3::from(
            self.vertices[0].coords * bary_coords[0]
                + self.vertices[1].coords * bary_coords[1]
                + self.vertices[2].coords * bary_coords[2],
        )
    }

    /// Exact closest point by Voronoi region classification. Zero-area
    /// triangles are treated as their three edges.
    pub fn closest_point(&self, p: &Point3<f32>) -> ClosestPoint {
        let [a, b, c] = self.vertices;
        let ab = b - a;
        let ac = c - a;

        let n2 = ab.cross(&ac).norm_squared();
        let scale = ab.norm_squared() * ac.norm_squared();
        if n2 <= scale * f32::EPSILON * f32::EPSILON {
            return self.closest_point_on_edges(p);
        }

        let ap = p - a;
        let d1 = ab.dot(&ap);
        let d2 = ac.dot(&ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return self.finish(p, a, Vector3::new(1.0, 0.0, 0.0));
        }

        let bp = p - b;
        let d3 = ab.dot(&bp);
        let d4 = ac.dot(&bp);
        if d3 >= 0.0 && d4 <= d3 {
            return self.finish(p, b, Vector3::new(0.0, 1.0, 0.0));
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return self.finish(p, a + v * ab, Vector3::new(1.0 - v, v, 0.0));
        }

        let cp = p - c;
        let d5 = ab.dot(&cp);
        let d6 = ac.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return self.finish(p, c, Vector3::new(0.0, 0.0, 1.0));
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return self.finish(p, a + w * ac, Vector3::new(1.0 - w, 0.0, w));
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return self.finish(p, b + w * (c - b), Vector3::new(0.0, 1.0 - w, w));
        }

        let sum = va + vb + vc;
        if !(sum > 0.0) || !sum.is_finite() {
            return self.closest_point_on_edges(p);
        }
        let denom = 1.0 / sum;
        let v = vb * denom;
        let w = vc * denom;
        self.finish(p, a + ab * v + ac * w, Vector3::new(1.0 - v - w, v, w))
    }

    fn finish(&self, p: &Point3<f32>, point: Point3<f32>, barycentric: Vector3<f32>) -> ClosestPoint {
        ClosestPoint {
            point,
            barycentric,
            distance_squared: (p - point).norm_squared(),
        }
    }

    fn closest_point_on_edges(&self, p: &Point3<f32>) -> ClosestPoint {
        let mut best: Option<ClosestPoint> = None;
        for (i, j) in [(0, 1), (1, 2), (2, 0)] {
            let (a, b) = (self.vertices[i], self.vertices[j]);
            let ab = b - a;
            let len2 = ab.norm_squared();
            let t = if len2 > 0.0 {
                ((p - a).dot(&ab) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let mut barycentric = Vector3::zeros();
            barycentric[i] += 1.0 - t;
            barycentric[j] += t;
            let candidate = self.finish(p, a + t * ab, barycentric);

            if best.map_or(true, |b| candidate.distance_squared < b.distance_squared) {
                best = Some(candidate);
            }
        }
        // Three edges are always evaluated
        best.unwrap_or_else(|| self.finish(p, self.vertices[0], Vector3::new(1.0, 0.0, 0.0)))
    }

    /// Moller-Trumbore. Accepts crossings with `t_min <= t <= t_max`.
    pub fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<TriangleHit> {
        let v0 = &self.vertices[0];
        let v1 = &self.vertices[1];
        let v2 = &self.vertices[2];

        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let d = &ray.direction;

        let e1_x_d = e1.cross(d);

        let triple = e1_x_d.dot(&e2);
        if triple == 0.0 {
            return None;
        }

        let inv_triple = 1.0 / triple;
        if !inv_triple.is_finite() {
            return None;
        }
        let s = ray.origin - v0;
        let e2_x_s = e2.cross(&s);
        let u = e2_x_s.dot(d) * inv_triple;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let v = e1_x_d.dot(&s) * inv_triple;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2_x_s.dot(&e1) * inv_triple;
        if t_min <= t && t <= t_max {
            Some(TriangleHit {
                t,
                barycentric: Vector3::new(1.0 - u - v, u, v),
            })
        } else {
            None
        }
    }
}
