//! Locality index configuration types.
//!
//! Defines covering granularity per index kind and the generator knobs
//! (worker count, chunk sizes) shared by the library and the CLI.

use serde::{Deserialize, Serialize};

/// Detail level at which geometry is simplified before covering.
///
/// The locality index is built at one fixed resolution regardless of the
/// multi-scale geometry used for rendering.
pub const UPPER_SCALE: u32 = 17;

/// Distance-to-segment tolerance used when simplifying lines and outer rings.
pub fn simplify_epsilon(scale: u32) -> f64 {
    360.0 / f64::from(1u32 << (scale + 10).min(31))
}

/// Tolerance used to merge near-duplicate points when computing a convex hull.
pub const HULL_EPSILON: f64 = 1e-16;

/// Which kind of locality index is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Few, large, mostly-disjoint administrative polygons.
    Regions,
    /// Many small buildings, addresses, streets and POIs.
    GeoObjects,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Regions => "regions",
            IndexKind::GeoObjects => "geo_objects",
        }
    }
}

/// Configuration for quadtree covering generation.
///
/// Controls the granularity and cell count of coverings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveringConfig {
    /// Deepest cell level (0-30). Higher = finer cells.
    pub max_level: u8,

    /// Maximum number of cells in a covering. Refinement stops before the
    /// next level would exceed this.
    pub max_cells: usize,
}

impl CoveringConfig {
    /// Coarse covering for administrative regions.
    pub fn regions() -> Self {
        Self {
            max_level: 12,
            max_cells: 256,
        }
    }

    /// Fine covering for buildings, streets and POIs.
    pub fn geo_objects() -> Self {
        Self {
            max_level: 18,
            max_cells: 16,
        }
    }

    pub fn for_kind(kind: IndexKind) -> Self {
        match kind {
            IndexKind::Regions => Self::regions(),
            IndexKind::GeoObjects => Self::geo_objects(),
        }
    }
}

/// Generator configuration.
///
/// Every field has a default, so a partial TOML file is enough to override
/// individual knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of covering workers. `0` means available parallelism.
    pub threads: usize,

    /// Features per chunk for the regions index.
    pub regions_chunk_features: usize,

    /// Features per chunk for the geo-objects index.
    pub geo_objects_chunk_features: usize,

    /// Features per chunk for geo-objects merged with streets. Larger
    /// because most street-source features are rejected by the filter.
    pub geo_objects_with_streets_chunk_features: usize,

    /// Covering used by the regions builder.
    pub regions_covering: CoveringConfig,

    /// Covering used by the geo-objects builder.
    pub geo_objects_covering: CoveringConfig,

    /// Upper bound on triangles per area; `None` is unlimited.
    pub max_triangles: Option<usize>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            regions_chunk_features: 1,
            geo_objects_chunk_features: 10,
            geo_objects_with_streets_chunk_features: 100,
            regions_covering: CoveringConfig::regions(),
            geo_objects_covering: CoveringConfig::geo_objects(),
            max_triangles: None,
        }
    }
}

impl GeneratorConfig {
    /// Resolve `threads`, falling back to the machine's parallelism.
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}
