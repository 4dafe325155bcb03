//! Border section extraction.
//!
//! Every area feature contributes one `varint(len) ++ bytes` record with its
//! encoded rings to the `borders` section of an existing container.

use crate::container::Container;
use crate::error::{LocalityError, Result};
use crate::feature::RawFeature;
use crate::geometry_codec::{decode_border, encode_border, GeometryCodingParams};
use crate::varint::{decode_varint, encode_varint};
use geo_types::Coord;
use std::path::Path;
use tracing::{debug, info};

pub const BORDERS_SECTION: &str = "borders";

/// Accumulates border records for one container.
pub struct BordersCollector {
    container: Container,
    params: GeometryCodingParams,
    section: Vec<u8>,
    records: u64,
}

impl BordersCollector {
    /// Open an existing container for border output.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            container: Container::open_existing(path)?,
            params: GeometryCodingParams::default(),
            section: Vec::new(),
            records: 0,
        })
    }

    /// Append the border of `feature` if it is an area.
    pub fn collect(&mut self, feature: &RawFeature) -> Result<()> {
        if !feature.is_area() {
            return Ok(());
        }
        let bytes = encode_border(&feature.geometry, &self.params);
        if bytes.is_empty() {
            return Err(LocalityError::EmptyBorder { id: feature.id });
        }
        encode_varint(bytes.len() as u64, &mut self.section);
        self.section.extend_from_slice(&bytes);
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Write the `borders` section back into the container.
    pub fn finish(mut self) -> Result<u64> {
        debug!(
            path = %self.container.path().display(),
            records = self.records,
            bytes = self.section.len(),
            "Writing borders section"
        );
        self.container
            .set_section(BORDERS_SECTION, std::mem::take(&mut self.section));
        self.container.commit()?;
        Ok(self.records)
    }
}

/// Write the borders of all area features in `features_file` into the
/// existing container at `out_path`.
pub fn write_borders(out_path: &Path, features_file: &Path) -> Result<u64> {
    let _span = tracing::info_span!("generate_borders", out = %out_path.display()).entered();
    let mut collector = BordersCollector::open(out_path)?;
    crate::feature::for_each_feature(features_file, |feature| collector.collect(feature))?;
    let records = collector.finish()?;
    info!(records, "Borders written");
    Ok(records)
}

/// Decode every record of a `borders` section.
pub fn read_borders(section: &[u8]) -> Result<Vec<Vec<Vec<Coord<f64>>>>> {
    let params = GeometryCodingParams::default();
    let mut pos = 0;
    let mut borders = Vec::new();
    while pos < section.len() {
        let len = decode_varint(section, &mut pos)? as usize;
        let end = pos
            .checked_add(len)
            .filter(|&end| end <= section.len())
            .ok_or_else(|| LocalityError::FormatError("truncated border record".into()))?;
        borders.push(decode_border(&section[pos..end], &params)?);
        pos = end;
    }
    Ok(borders)
}
