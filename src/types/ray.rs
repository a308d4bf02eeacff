use na::{Point3, Vector3};

/// A half-line with a unit-length direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Normalizes `direction`. Returns `None` when it is zero-length or not finite.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Option<Self> {
        let norm = direction.norm();
        if !norm.is_finite() || norm == 0.0 {
            return None;
        }

        Some(Self {
            origin,
            direction: direction / norm,
        })
    }

    pub fn from_arrays(origin: [f32; 3], direction: [f32; 3]) -> Option<Self> {
        Self::new(Point3::from(origin), Vector3::from(direction))
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + t * self.direction
    }
}
