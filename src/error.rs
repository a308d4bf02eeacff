//! Error types for hierarchy construction and batched queries.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Error, Debug)]
pub enum QueryError {
    /// A hierarchy cannot be built over zero primitives.
    #[error("batch item {item} has no primitives")]
    EmptyMesh { item: usize },

    /// Query arrays and hierarchy arrays disagree on the batch dimension.
    #[error("batch size mismatch: {hierarchies} hierarchies but {queries} query sets")]
    BatchSizeMismatch { hierarchies: usize, queries: usize },

    /// Ray direction is zero-length or not finite and cannot be normalized.
    #[error("ray {index} of batch item {item} has a zero-length or non-finite direction")]
    InvalidRayDirection { item: usize, index: usize },

    #[error("batch item {item} has {origins} ray origins but {directions} directions")]
    RayShapeMismatch {
        item: usize,
        origins: usize,
        directions: usize,
    },

    /// Only produced under `NonFinitePolicy::Reject`.
    #[error("primitive {primitive} has a NaN or infinite vertex coordinate")]
    NonFiniteVertex { primitive: usize },

    #[error("face {face} references vertex {index} but only {vertex_count} vertices exist")]
    InvalidFaceIndex {
        face: usize,
        index: usize,
        vertex_count: usize,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("failed to load mesh {path:?}: {source}")]
    MeshLoad {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl QueryError {
    /// Attach a batch item index to errors raised while handling a single item.
    pub(crate) fn at_item(self, item: usize) -> Self {
        match self {
            QueryError::EmptyMesh { .. } => QueryError::EmptyMesh { item },
            QueryError::InvalidRayDirection { index, .. } => {
                QueryError::InvalidRayDirection { item, index }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_item_rewrites_item_index() {
        let err = QueryError::EmptyMesh { item: 0 }.at_item(3);
        assert!(matches!(err, QueryError::EmptyMesh { item: 3 }));

        let err = QueryError::InvalidRayDirection { item: 0, index: 7 }.at_item(2);
        assert!(matches!(
            err,
            QueryError::InvalidRayDirection { item: 2, index: 7 }
        ));
    }

    #[test]
    fn messages_name_the_offending_item() {
        let err = QueryError::BatchSizeMismatch {
            hierarchies: 2,
            queries: 3,
        };
        assert_eq!(
            err.to_string(),
            "batch size mismatch: 2 hierarchies but 3 query sets"
        );
    }
}
