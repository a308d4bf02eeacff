use crate::types::ray::Ray;
use na::{Point3, Vector3};

/// Relative padding applied to primitive boxes at build time. Rounding in the
/// exact triangle routines stays well below this.
pub const BOX_PADDING: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BBox {
    // a, b are opposite corners
    pub fn new(a: Point3<f32>, b: Point3<f32>) -> Self {
        let min = Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
        let max = Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z));

        Self { min, max }
    }

    /// Inverted box, the identity for `merge`.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Point3<f32>]) -> Self {
        points.iter().fold(Self::empty(), |mut bbox, p| {
            bbox.grow(p);
            bbox
        })
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn merge(&self, other: &Self) -> Self {
        let min = Point3::new(
            self.min.x.min(other.min.x),
            self.min.y.min(other.min.y),
            self.min.z.min(other.min.z),
        );
        let max = Point3::new(
            self.max.x.max(other.max.x),
            self.max.y.max(other.max.y),
            self.max.z.max(other.max.z),
        );
        Self { min, max }
    }

    pub fn grow(&mut self, p: &Point3<f32>) {
        self.min = Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn contains(&self, other: &Self) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.min[axis] && other.max[axis] <= self.max[axis])
    }

    pub fn contains_point(&self, p: &Point3<f32>) -> bool {
        (0..3).all(|axis| self.min[axis] <= p[axis] && p[axis] <= self.max[axis])
    }

    pub fn get_extent(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    pub fn get_longest_axis(&self) -> usize {
        let extent = self.get_extent();
        if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        }
    }

    pub fn get_centroid(&self) -> Point3<f32> {
        na::center(&self.min, &self.max)
    }

    pub fn get_surface_area(&self) -> f32 {
        let extent = self.get_extent();
        2.0 * extent.x * extent.y + 2.0 * extent.x * extent.z + 2.0 * extent.y * extent.z
    }

    pub fn get_volume(&self) -> f32 {
        let extent = self.get_extent();
        extent.x * extent.y * extent.z
    }

    /// Grows the box by `relative` times its largest coordinate magnitude.
    pub fn padded(&self, relative: f32) -> Self {
        if self.is_empty() {
            return *self;
        }
        let scale = self.min.coords.amax().max(self.max.coords.amax());
        let pad = Vector3::repeat(scale * relative + f32::MIN_POSITIVE);
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Squared distance from `p` to the closest point of the box; zero inside.
    pub fn distance_squared(&self, p: &Point3<f32>) -> f32 {
        let mut d2 = 0.0;
        for axis in 0..3 {
            let v = p[axis];
            let d = if v < self.min[axis] {
                self.min[axis] - v
            } else if v > self.max[axis] {
                v - self.max[axis]
            } else {
                0.0
            };
            d2 += d * d;
        }
        d2
    }

    /// Slab test. Returns the entry/exit interval clipped to `[t_min, t_max]`.
    pub fn hit(&self, ray: &Ray, t_min: f32, t_max: f32) -> Option<(f32, f32)> {
        let orig = ray.origin;
        let dir = ray.direction;

        let mut t_min: f32 = t_min;
        let mut t_max: f32 = t_max;

        // Find intersection of interval for each axis
        for axis in 0..3 {
            let (min, max) = (self.min[axis], self.max[axis]);

            if dir[axis] == 0.0 {
                // Parallel to the slab: inside or never
                if orig[axis] < min || orig[axis] > max {
                    return None;
                }
                continue;
            }

            let adinv: f32 = 1.0_f32 / dir[axis];
            let t0 = (min - orig[axis]) * adinv;
            let t1 = (max - orig[axis]) * adinv;
            let (near, far) = if t0 < t1 { (t0, t1) } else { (t1, t0) };

            if near > t_min {
                t_min = near;
            }
            if far < t_max {
                t_max = far;
            }

            if t_max < t_min {
                return None;
            }
        }
        Some((t_min, t_max))
    }
}

impl Default for BBox {
    fn default() -> Self {
        Self::empty()
    }
}
