pub mod tri_mesh;
pub mod triangle;

use crate::error::{QueryError, QueryResult};
use triangle::Triangle;

/// Immutable triangle soup for one batch item. Indices into the store are the
/// "original" primitive indices reported by every query.
#[derive(Clone, Debug, Default)]
pub struct PrimitiveStore {
    triangles: Vec<Triangle>,
}

impl PrimitiveStore {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Triangle soup laid out as `[triangle][vertex][axis]`.
    pub fn from_triangle_array(triangles: &[[[f32; 3]; 3]]) -> Self {
        Self {
            triangles: triangles.iter().copied().map(Triangle::from_arrays).collect(),
        }
    }

    /// Indexed mesh: shared vertex positions plus one vertex triple per face.
    pub fn from_indexed(vertices: &[[f32; 3]], faces: &[[u32; 3]]) -> QueryResult<Self> {
        let triangles = faces
            .iter()
            .enumerate()
            .map(|(face, indices)| -> QueryResult<Triangle> {
                let mut corners = [[0.0_f32; 3]; 3];
                for (corner, &index) in corners.iter_mut().zip(indices) {
                    *corner = *vertices.get(index as usize).ok_or(QueryError::InvalidFaceIndex {
                        face,
                        index: index as usize,
                        vertex_count: vertices.len(),
                    })?;
                }
                Ok(Triangle::from_arrays(corners))
            })
            .collect::<QueryResult<Vec<_>>>()?;

        Ok(Self { triangles })
    }

    pub fn add(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Triangle> {
        self.triangles.get(index)
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Triangle> {
        self.triangles.iter()
    }
}

impl std::ops::Index<usize> for PrimitiveStore {
    type Output = Triangle;

    fn index(&self, index: usize) -> &Self::Output {
        &self.triangles[index]
    }
}

impl FromIterator<Triangle> for PrimitiveStore {
    fn from_iter<I: IntoIterator<Item = Triangle>>(iter: I) -> Self {
        Self::from_triangles(iter.into_iter().collect())
    }
}
