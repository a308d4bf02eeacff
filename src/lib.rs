//! Nearest-point and ray queries over triangle meshes, accelerated by a static
//! bounding volume hierarchy.
//!
//! A [`Bvh`] is built once per mesh (per batch item) and then queried many
//! times, typically through [`BatchQuery`] which runs every batch item and
//! every query point in parallel. [`PointToMeshResidual`] turns nearest-point
//! results into per-point residual vectors for fitting losses.
//!
//! ```
//! use bvh_distance_queries::{BatchQuery, Bvh, PrimitiveStore};
//!
//! let store = PrimitiveStore::from_triangle_array(&[[
//!     [0.0, 0.0, 0.0],
//!     [1.0, 0.0, 0.0],
//!     [0.0, 1.0, 0.0],
//! ]]);
//! let bvhs = vec![Bvh::new(store).unwrap()];
//! let points: Vec<Vec<[f32; 3]>> = vec![vec![[0.0, 0.0, 1.0]]];
//!
//! let out = BatchQuery::new(&bvhs).nearest_points_arrays(&points).unwrap();
//! assert_eq!(out[0].distances, vec![1.0]);
//! assert_eq!(out[0].primitives, vec![0]);
//! ```

extern crate nalgebra as na;

pub mod batch;
pub mod bvh;
pub mod config;
pub mod error;
pub mod objects;
pub mod query;
pub mod residual;
pub mod types;

pub use batch::{BatchQuery, PointQueryOutput, RayQueryOutput};
pub use bvh::{BBox, BVHBuilder, BVHNode, Bvh, BvhStats, NonFinitePolicy, SplitMethod};
pub use config::Config;
pub use error::{QueryError, QueryResult};
pub use objects::tri_mesh::TriMesh;
pub use objects::triangle::Triangle;
pub use objects::PrimitiveStore;
pub use query::{PointQueryResult, RayHit, Traversal, TraversalStats};
pub use residual::{PointToMeshResidual, ResidualOutput};
pub use types::ray::Ray;
