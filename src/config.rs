//! TOML run configuration.
//!
//! ```toml
//! [builder]
//! split_method = "sah"      # or "median"
//! max_leaf_size = 4
//! sah_buckets = 12
//! non_finite = "propagate"  # or "reject"
//!
//! [traversal]
//! mode = "pruned"           # or "exhaustive"
//!
//! [runtime]
//! num_threads = 0           # 0 = rayon default
//!
//! [[meshes]]
//! path = "bunny.obj"
//!
//! [queries]
//! points_per_mesh = 1024
//! rays_per_mesh = 256
//! seed = 0
//! padding = 0.1
//! ```
//!
//! Every section and field is optional.

use crate::bvh::{BVHBuilder, NonFinitePolicy, SplitMethod};
use crate::error::{QueryError, QueryResult};
use crate::query::Traversal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub builder: BuilderConfig,
    pub traversal: TraversalConfig,
    pub runtime: RuntimeConfig,
    pub meshes: Vec<MeshSource>,
    pub queries: QuerySampling,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig {
    pub split_method: SplitMethod,
    pub max_leaf_size: usize,
    pub sah_buckets: usize,
    pub non_finite: NonFinitePolicy,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            split_method: SplitMethod::Sah,
            max_leaf_size: 4,
            sah_buckets: 12,
            non_finite: NonFinitePolicy::Propagate,
        }
    }
}

impl BuilderConfig {
    pub fn to_builder(&self) -> BVHBuilder {
        BVHBuilder::new()
            .with_split_method(self.split_method)
            .with_max_leaf_size(self.max_leaf_size)
            .with_sah_buckets(self.sah_buckets)
            .with_non_finite(self.non_finite)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraversalConfig {
    pub mode: Traversal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub num_threads: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeshSource {
    pub path: PathBuf,
}

/// How the driver samples queries around each mesh.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuerySampling {
    pub points_per_mesh: usize,
    pub rays_per_mesh: usize,
    pub seed: u64,
    /// Query points are drawn from the mesh box grown by this fraction of its extent.
    pub padding: f32,
}

impl Default for QuerySampling {
    fn default() -> Self {
        Self {
            points_per_mesh: 1024,
            rays_per_mesh: 256,
            seed: 0,
            padding: 0.1,
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> QueryResult<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| QueryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> QueryResult<()> {
        self.builder.to_builder().validate()?;
        if !(self.queries.padding >= 0.0 && self.queries.padding.is_finite()) {
            return Err(QueryError::InvalidConfig {
                message: format!(
                    "queries.padding must be finite and non-negative, got {}",
                    self.queries.padding
                ),
            });
        }
        Ok(())
    }
}
