//! Locality index builders and the on-disk index reader.
//!
//! A builder plays two roles: during the parallel phase its [`cover`]
//! method turns one locality object into a covering entry, and after the
//! workers join [`build_covering_index`] persists the merged coverings as a
//! container with a JSON manifest and a leaflet-encoded cells section.
//!
//! [`cover`]: LocalityIndexBuilder::cover
//! [`build_covering_index`]: LocalityIndexBuilder::build_covering_index

use crate::cell_index::{decode_all, CellEntry, CellIndexBuilder, LeafletMeta};
use crate::config::{CoveringConfig, IndexKind};
use crate::container::Container;
use crate::covering::{append_covering, covering_cell_count, LocalitiesCovering};
use crate::error::{LocalityError, Result};
use crate::locality_object::LocalityObject;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub const MANIFEST_SECTION: &str = "locality.manifest";
pub const CELLS_SECTION: &str = "locality.cells";

/// Current index manifest version.
pub const INDEX_FORMAT_VERSION: u32 = 1;

const REGIONS_LEAFLET_BYTES: usize = 256 * 1024;
const GEO_OBJECTS_LEAFLET_BYTES: usize = 64 * 1024;

/// Manifest stored in the `locality.manifest` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub kind: IndexKind,
    pub format_version: u32,
    pub covering: CoveringConfig,
    /// Unique `(cell, object)` rows.
    pub entry_count: u64,
    /// Distinct objects with a non-empty covering.
    pub object_count: u64,
    pub leaflets: Vec<LeafletMeta>,
}

/// Outcome of a successful index build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub kind: IndexKind,
    pub objects: u64,
    pub entries: u64,
    pub leaflets: usize,
}

/// Per-kind covering and persistence strategy.
///
/// `cover` is called concurrently from every worker; `build_covering_index`
/// runs once, on the calling thread, after all workers have joined.
pub trait LocalityIndexBuilder: Sync {
    /// Append the covering of `object` to the worker-local accumulator.
    fn cover(&self, object: &LocalityObject, covering: &mut LocalitiesCovering);

    /// Persist the merged coverings at `out_path`.
    fn build_covering_index(
        &self,
        covering: LocalitiesCovering,
        out_path: &Path,
    ) -> Result<IndexSummary>;
}

fn write_index(
    kind: IndexKind,
    config: CoveringConfig,
    leaflet_bytes: usize,
    covering: LocalitiesCovering,
    out_path: &Path,
) -> Result<IndexSummary> {
    info!(
        kind = kind.as_str(),
        objects = covering.len(),
        cells = covering_cell_count(&covering),
        path = %out_path.display(),
        "Building locality index"
    );

    let mut objects = FxHashSet::default();
    let mut cells = CellIndexBuilder::new(leaflet_bytes);
    for entry in covering {
        let object_id = entry.object_id;
        objects.insert(object_id);
        cells.extend(entry.cells.into_iter().map(|cell| CellEntry::new(cell, object_id)));
    }
    let (body, leaflets, entry_count) = cells.build()?;

    let manifest = IndexManifest {
        kind,
        format_version: INDEX_FORMAT_VERSION,
        covering: config,
        entry_count,
        object_count: objects.len() as u64,
        leaflets,
    };

    let mut container = Container::create(out_path);
    container.set_section(MANIFEST_SECTION, serde_json::to_vec_pretty(&manifest)?);
    container.set_section(CELLS_SECTION, body);
    container.commit()?;

    let summary = IndexSummary {
        kind,
        objects: manifest.object_count,
        entries: manifest.entry_count,
        leaflets: manifest.leaflets.len(),
    };
    info!(
        kind = kind.as_str(),
        objects = summary.objects,
        entries = summary.entries,
        leaflets = summary.leaflets,
        "Locality index built"
    );
    Ok(summary)
}

/// Coarse index over administrative regions.
#[derive(Debug, Clone)]
pub struct RegionsLocalityIndexBuilder {
    covering: CoveringConfig,
}

impl Default for RegionsLocalityIndexBuilder {
    fn default() -> Self {
        Self::new(CoveringConfig::for_kind(IndexKind::Regions))
    }
}

impl RegionsLocalityIndexBuilder {
    pub fn new(covering: CoveringConfig) -> Self {
        Self { covering }
    }
}

impl LocalityIndexBuilder for RegionsLocalityIndexBuilder {
    fn cover(&self, object: &LocalityObject, covering: &mut LocalitiesCovering) {
        append_covering(object, &self.covering, covering);
    }

    fn build_covering_index(
        &self,
        covering: LocalitiesCovering,
        out_path: &Path,
    ) -> Result<IndexSummary> {
        write_index(
            IndexKind::Regions,
            self.covering,
            REGIONS_LEAFLET_BYTES,
            covering,
            out_path,
        )
    }
}

/// Fine index over buildings, addresses, streets and POIs.
#[derive(Debug, Clone)]
pub struct GeoObjectsLocalityIndexBuilder {
    covering: CoveringConfig,
}

impl Default for GeoObjectsLocalityIndexBuilder {
    fn default() -> Self {
        Self::new(CoveringConfig::for_kind(IndexKind::GeoObjects))
    }
}

impl GeoObjectsLocalityIndexBuilder {
    pub fn new(covering: CoveringConfig) -> Self {
        Self { covering }
    }
}

impl LocalityIndexBuilder for GeoObjectsLocalityIndexBuilder {
    fn cover(&self, object: &LocalityObject, covering: &mut LocalitiesCovering) {
        append_covering(object, &self.covering, covering);
    }

    fn build_covering_index(
        &self,
        covering: LocalitiesCovering,
        out_path: &Path,
    ) -> Result<IndexSummary> {
        write_index(
            IndexKind::GeoObjects,
            self.covering,
            GEO_OBJECTS_LEAFLET_BYTES,
            covering,
            out_path,
        )
    }
}

/// Loads a built index for inspection.
#[derive(Debug)]
pub struct LocalityIndexReader {
    manifest: IndexManifest,
    entries: Vec<CellEntry>,
}

impl LocalityIndexReader {
    pub fn open(path: &Path) -> Result<Self> {
        let container = Container::open_existing(path)?;
        let manifest: IndexManifest = serde_json::from_slice(container.section(MANIFEST_SECTION)?)?;
        if manifest.format_version != INDEX_FORMAT_VERSION {
            return Err(LocalityError::FormatError(format!(
                "unsupported index format version {} (expected {})",
                manifest.format_version, INDEX_FORMAT_VERSION
            )));
        }

        let entries = decode_all(container.section(CELLS_SECTION)?, &manifest.leaflets)?;
        if entries.len() as u64 != manifest.entry_count {
            return Err(LocalityError::FormatError(format!(
                "manifest lists {} entries, cells section holds {}",
                manifest.entry_count,
                entries.len()
            )));
        }
        Ok(Self { manifest, entries })
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// All rows in `(cell_id, object_id)` order.
    pub fn entries(&self) -> &[CellEntry] {
        &self.entries
    }

    /// Object id → sorted cell ids.
    pub fn associations(&self) -> BTreeMap<u64, Vec<u64>> {
        let mut map: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
        for entry in &self.entries {
            map.entry(entry.object_id).or_default().push(entry.cell_id);
        }
        for cells in map.values_mut() {
            cells.sort_unstable();
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covering::CoveringEntry;
    use geo_types::coord;

    #[test]
    fn test_geo_objects_cover_point() {
        let builder = GeoObjectsLocalityIndexBuilder::default();
        let mut covering = LocalitiesCovering::new();
        builder.cover(&LocalityObject::point(42, coord! { x: 10.0, y: 10.0 }), &mut covering);
        assert_eq!(covering.len(), 1);
        assert_eq!(covering[0].object_id, 42);
        assert_eq!(covering[0].cells.len(), 1);
    }

    #[test]
    fn test_build_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.idx");

        let covering = vec![
            CoveringEntry {
                object_id: 1,
                cells: vec![30, 10],
            },
            CoveringEntry {
                object_id: 2,
                cells: vec![10],
            },
            // Same object reported twice collapses to unique rows.
            CoveringEntry {
                object_id: 1,
                cells: vec![10],
            },
        ];
        let summary = RegionsLocalityIndexBuilder::default()
            .build_covering_index(covering, &path)
            .unwrap();
        assert_eq!(summary.kind, IndexKind::Regions);
        assert_eq!(summary.objects, 2);
        assert_eq!(summary.entries, 3);

        let reader = LocalityIndexReader::open(&path).unwrap();
        assert_eq!(reader.manifest().covering, CoveringConfig::regions());
        let assoc = reader.associations();
        assert_eq!(assoc[&1], vec![10, 30]);
        assert_eq!(assoc[&2], vec![10]);
        assert_eq!(reader.entries()[0], CellEntry::new(10, 1));
    }

    #[test]
    fn test_empty_index_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.idx");
        let summary = GeoObjectsLocalityIndexBuilder::default()
            .build_covering_index(Vec::new(), &path)
            .unwrap();
        assert_eq!(summary.entries, 0);

        let reader = LocalityIndexReader::open(&path).unwrap();
        assert_eq!(reader.manifest().kind, IndexKind::GeoObjects);
        assert!(reader.associations().is_empty());
    }

    #[test]
    fn test_unwritable_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.idx");
        assert!(RegionsLocalityIndexBuilder::default()
            .build_covering_index(Vec::new(), &path)
            .is_err());
    }
}
