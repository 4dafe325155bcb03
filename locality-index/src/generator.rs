//! Top-level generation operations.
//!
//! Each operation comes in two forms: `try_*` returns the summary or the
//! error, the plain form logs failures and returns `false`.

use crate::borders::write_borders;
use crate::config::GeneratorConfig;
use crate::container::Container;
use crate::error::Result;
use crate::filter::{GeoObjectsFilter, RegionsFilter};
use crate::index_builder::{GeoObjectsLocalityIndexBuilder, RegionsLocalityIndexBuilder};
use crate::pipeline::{generate_locality_index, PipelineOptions, PipelineSummary};
use crate::whitelist::Whitelist;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{error, info};

/// Section holding the data version text.
pub const VERSION_SECTION: &str = "version";

const COMBINED_PREFIX: &str = "geo_objects_and_streets";
const COMBINED_SUFFIX: &str = ".dat.tmp";

/// Concatenate the geo-object and street streams into a temporary file next
/// to the geo-object stream. The file is removed when the handle drops.
fn combine_streams(geo_objects: &Path, streets: &Path) -> Result<NamedTempFile> {
    let dir = match geo_objects.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut combined = tempfile::Builder::new()
        .prefix(COMBINED_PREFIX)
        .suffix(COMBINED_SUFFIX)
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(combined.as_file_mut());
        for source in [geo_objects, streets] {
            let mut reader = File::open(source).map_err(|e| {
                io::Error::new(e.kind(), format!("{}: {}", source.display(), e))
            })?;
            io::copy(&mut reader, &mut writer)?;
        }
        writer.flush()?;
    }
    info!(path = %combined.path().display(), "Combined geo-objects and streets");
    Ok(combined)
}

/// Runs generation operations with one configuration.
#[derive(Debug, Clone, Default)]
pub struct LocalityGenerator {
    config: GeneratorConfig,
}

impl LocalityGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn options(&self, chunk_features: usize) -> PipelineOptions {
        PipelineOptions {
            threads: self.config.effective_threads(),
            chunk_features,
            max_triangles: self.config.max_triangles,
        }
    }

    /// Build the regions index from all area features.
    pub fn regions_index(&self, out_path: &Path, features_file: &Path) -> Result<PipelineSummary> {
        let builder = RegionsLocalityIndexBuilder::new(self.config.regions_covering);
        generate_locality_index(
            out_path,
            features_file,
            &RegionsFilter,
            &builder,
            &self.options(self.config.regions_chunk_features),
        )
    }

    /// Build the geo-objects index, optionally with whitelisted POIs and
    /// streets from a second stream.
    pub fn geo_objects_index(
        &self,
        out_path: &Path,
        geo_objects_file: &Path,
        nodes_whitelist_file: Option<&Path>,
        streets_features_file: Option<&Path>,
    ) -> Result<PipelineSummary> {
        let whitelist = Whitelist::load(nodes_whitelist_file)?;
        let filter = GeoObjectsFilter::new(whitelist, streets_features_file.is_some());
        let builder = GeoObjectsLocalityIndexBuilder::new(self.config.geo_objects_covering);

        match streets_features_file {
            None => generate_locality_index(
                out_path,
                geo_objects_file,
                &filter,
                &builder,
                &self.options(self.config.geo_objects_chunk_features),
            ),
            Some(streets) => {
                let combined = combine_streams(geo_objects_file, streets)?;
                generate_locality_index(
                    out_path,
                    combined.path(),
                    &filter,
                    &builder,
                    &self.options(self.config.geo_objects_with_streets_chunk_features),
                )
            }
        }
    }

    /// Write the `borders` section of the existing container at `out_path`.
    pub fn borders(&self, out_path: &Path, features_file: &Path) -> Result<u64> {
        write_borders(out_path, features_file)
    }

    /// Write `version_text` as the `version` section of an existing container.
    pub fn data_version(&self, out_path: &Path, version_text: &str) -> Result<()> {
        let mut container = Container::open_existing(out_path)?;
        container.set_section(VERSION_SECTION, version_text.as_bytes().to_vec());
        container.commit()?;
        info!(path = %out_path.display(), bytes = version_text.len(), "Data version written");
        Ok(())
    }
}

fn with_threads(worker_count: usize) -> LocalityGenerator {
    LocalityGenerator::new(GeneratorConfig {
        threads: worker_count.max(1),
        ..GeneratorConfig::default()
    })
}

fn report<T>(operation: &str, result: Result<T>) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            error!(operation, error = %e, "Locality generation failed");
            false
        }
    }
}

pub fn try_generate_regions_index(
    out_path: &Path,
    features_file: &Path,
    worker_count: usize,
) -> Result<PipelineSummary> {
    with_threads(worker_count).regions_index(out_path, features_file)
}

pub fn generate_regions_index(out_path: &Path, features_file: &Path, worker_count: usize) -> bool {
    report(
        "regions_index",
        try_generate_regions_index(out_path, features_file, worker_count),
    )
}

pub fn try_generate_geo_objects_index(
    out_path: &Path,
    geo_objects_file: &Path,
    worker_count: usize,
    nodes_whitelist_file: Option<&Path>,
    streets_features_file: Option<&Path>,
) -> Result<PipelineSummary> {
    with_threads(worker_count).geo_objects_index(
        out_path,
        geo_objects_file,
        nodes_whitelist_file,
        streets_features_file,
    )
}

pub fn generate_geo_objects_index(
    out_path: &Path,
    geo_objects_file: &Path,
    worker_count: usize,
    nodes_whitelist_file: Option<&Path>,
    streets_features_file: Option<&Path>,
) -> bool {
    report(
        "geo_objects_index",
        try_generate_geo_objects_index(
            out_path,
            geo_objects_file,
            worker_count,
            nodes_whitelist_file,
            streets_features_file,
        ),
    )
}

pub fn try_generate_borders(out_path: &Path, features_file: &Path) -> Result<u64> {
    LocalityGenerator::default().borders(out_path, features_file)
}

pub fn generate_borders(out_path: &Path, features_file: &Path) -> bool {
    report("borders", try_generate_borders(out_path, features_file))
}

pub fn try_write_data_version_section(out_path: &Path, version_text: &str) -> Result<()> {
    LocalityGenerator::default().data_version(out_path, version_text)
}

pub fn write_data_version_section(out_path: &Path, version_text: &str) -> bool {
    report(
        "data_version",
        try_write_data_version_section(out_path, version_text),
    )
}
