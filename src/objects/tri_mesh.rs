// Use obj for now since its simple

use crate::error::{QueryError, QueryResult};
use crate::objects::triangle::Triangle;
use crate::objects::PrimitiveStore;
use na::Point3;
use std::path::Path;

/// Indexed triangle mesh: shared positions plus three indices per face.
pub struct TriMesh {
    positions: (Vec<Point3<f32>>, Vec<u32>),
}

impl TriMesh {
    pub fn new(positions: Vec<Point3<f32>>, indices: Vec<u32>) -> Self {
        Self {
            positions: (positions, indices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.0.len()
    }

    pub fn face_count(&self) -> usize {
        self.positions.1.len() / 3
    }

    pub fn load_as_vec(path: impl AsRef<Path>) -> QueryResult<Vec<Self>> {
        let path = path.as_ref();
        log::debug!("Loading mesh: {}...", path.display());

        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        // Materials are irrelevant for distance queries
        let (models, _materials) =
            tobj::load_obj(path, &options).map_err(|source| QueryError::MeshLoad {
                path: path.to_path_buf(),
                source,
            })?;

        log::debug!("Found {} models", models.len());

        let meshes = models
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let mesh_obj = &m.mesh;
                log::debug!(
                    "Model {} has {} vertices and {} triangles",
                    i,
                    mesh_obj.positions.len() / 3,
                    mesh_obj.indices.len() / 3
                );

                TriMesh::new(
                    mesh_obj
                        .positions
                        .chunks(3)
                        .map(|v| Point3::new(v[0], v[1], v[2]))
                        .collect(),
                    mesh_obj.indices.clone(),
                )
            })
            .collect();

        Ok(meshes)
    }

    /// Loads every model of an OBJ file into one primitive store.
    pub fn load_store(path: impl AsRef<Path>) -> QueryResult<PrimitiveStore> {
        let meshes = Self::load_as_vec(path)?;
        let mut store = PrimitiveStore::new();
        for mesh in meshes {
            for tri in mesh.to_triangles()? {
                store.add(tri);
            }
        }
        Ok(store)
    }

    pub fn to_triangles(&self) -> QueryResult<Vec<Triangle>> {
        let (positions, indices) = &self.positions;

        indices
            .chunks_exact(3)
            .enumerate()
            .map(|(face, corners)| -> QueryResult<Triangle> {
                let mut vertices = [Point3::origin(); 3];
                for (vertex, &index) in vertices.iter_mut().zip(corners) {
                    *vertex = *positions.get(index as usize).ok_or(QueryError::InvalidFaceIndex {
                        face,
                        index: index as usize,
                        vertex_count: positions.len(),
                    })?;
                }
                Ok(Triangle::new(vertices))
            })
            .collect()
    }

    pub fn to_primitive_store(&self) -> QueryResult<PrimitiveStore> {
        Ok(PrimitiveStore::from_triangles(self.to_triangles()?))
    }
}
