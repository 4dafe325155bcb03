//! Locality index generation.
//!
//! This crate builds the spatial lookup structures used by reverse geocoding:
//! given a stream of raw map features it produces an index mapping quadtree
//! cells to the objects (regions, buildings, streets, POIs) that overlap
//! them, plus the auxiliary `borders` and `version` container sections.
//!
//! # Architecture
//!
//! ```text
//!  feature stream ──► reader (calling thread)
//!                        │  chunks, bounded channel
//!          ┌─────────────┼─────────────┐
//!          ▼             ▼             ▼
//!      worker 0      worker 1  ...  worker N-1
//!      Filter ─► Normalizer ─► Builder::cover
//!          │             │             │
//!          └──────► merge (concat) ◄───┘
//!                        │
//!                        ▼
//!          Builder::build_covering_index ─► container file
//! ```
//!
//! # Modules
//!
//! - [`feature`]: Raw features and the stream file format
//! - [`filter`]: Feature selection per index kind
//! - [`normalizer`]: Simplification and strip triangulation
//! - [`covering`]: Quadtree coverings of locality objects
//! - [`index_builder`]: Builder trait, index variants and reader
//! - [`pipeline`]: Parallel covering pipeline
//! - [`borders`]: Border section extraction
//! - [`generator`]: Top-level operations
//! - [`container`]: Section container file format
//! - [`error`]: Error types

pub mod borders;
pub mod cell_id;
pub mod cell_index;
pub mod config;
pub mod container;
pub mod covering;
pub mod error;
pub mod feature;
pub mod filter;
pub mod generator;
pub mod geometry_codec;
mod hull;
pub mod index_builder;
pub mod locality_object;
pub mod normalizer;
pub mod pipeline;
pub mod strip;
pub(crate) mod varint;
pub mod whitelist;

// Re-export key types
pub use borders::{read_borders, BordersCollector, BORDERS_SECTION};
pub use cell_id::CellId;
pub use cell_index::CellEntry;
pub use config::{CoveringConfig, GeneratorConfig, IndexKind};
pub use container::Container;
pub use covering::{CoveringEntry, LocalitiesCovering};
pub use error::{LocalityError, Result};
pub use feature::{FeatureReader, FeatureTags, FeatureWriter, GeomKind, RawFeature};
pub use filter::{FeatureFilter, GeoObjectsFilter, RegionsFilter};
pub use generator::{
    generate_borders, generate_geo_objects_index, generate_regions_index,
    try_generate_borders, try_generate_geo_objects_index, try_generate_regions_index,
    try_write_data_version_section, write_data_version_section, LocalityGenerator,
    VERSION_SECTION,
};
pub use index_builder::{
    GeoObjectsLocalityIndexBuilder, IndexManifest, IndexSummary, LocalityIndexBuilder,
    LocalityIndexReader, RegionsLocalityIndexBuilder,
};
pub use locality_object::{LocalityGeometry, LocalityObject};
pub use normalizer::LocalityObjectBuilder;
pub use pipeline::{generate_locality_index, PipelineOptions, PipelineSummary, WorkerStats};
pub use whitelist::Whitelist;
