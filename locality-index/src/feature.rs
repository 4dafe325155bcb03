//! Raw features and the feature stream file format.
//!
//! A feature stream is a headerless sequence of records:
//!
//! ```text
//! [len: varint][payload: postcard(RawFeature)] ...
//! ```
//!
//! Records are self-delimiting, so concatenating two stream files yields a
//! valid stream containing the features of both.

use crate::error::{LocalityError, Result};
use crate::varint::{read_varint, write_varint};
use geo::{BoundingRect, LineString};
use geo_types::Coord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Records larger than this are treated as corruption.
const MAX_RECORD_BYTES: u64 = 256 * 1024 * 1024;

/// Geometry kind of a raw feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeomKind {
    Point,
    Line,
    Area,
}

/// Classification attributes used by the feature filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTags {
    /// Type tags, most specific first (e.g. `building`, `highway-residential`,
    /// `amenity-cafe`).
    pub types: Vec<String>,
    pub house_number: Option<String>,
    pub street: Option<String>,
    pub name: Option<String>,
}

impl FeatureTags {
    pub fn with_type(ty: impl Into<String>) -> Self {
        Self {
            types: vec![ty.into()],
            ..Self::default()
        }
    }

    /// The tag reported in diagnostics.
    pub fn primary_type(&self) -> &str {
        self.types.first().map(String::as_str).unwrap_or("unknown")
    }
}

/// One feature decoded from the raw stream.
///
/// `geometry` holds a single polyline for points and lines, and one closed
/// ring (first == last) per polygon for areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    /// Globally unique id derived from the feature's external id.
    pub id: u64,
    pub kind: GeomKind,
    pub geometry: Vec<Vec<Coord<f64>>>,
    pub tags: FeatureTags,
}

impl RawFeature {
    pub fn point(id: u64, at: Coord<f64>, tags: FeatureTags) -> Self {
        Self {
            id,
            kind: GeomKind::Point,
            geometry: vec![vec![at]],
            tags,
        }
    }

    pub fn line(id: u64, points: Vec<Coord<f64>>, tags: FeatureTags) -> Self {
        Self {
            id,
            kind: GeomKind::Line,
            geometry: vec![points],
            tags,
        }
    }

    pub fn area(id: u64, rings: Vec<Vec<Coord<f64>>>, tags: FeatureTags) -> Self {
        Self {
            id,
            kind: GeomKind::Area,
            geometry: rings,
            tags,
        }
    }

    pub fn is_area(&self) -> bool {
        self.kind == GeomKind::Area
    }

    pub fn is_point(&self) -> bool {
        self.kind == GeomKind::Point
    }

    /// Points of the first polyline / outer ring; empty when there is none.
    pub fn outer_points(&self) -> &[Coord<f64>] {
        self.geometry.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Representative point: the point itself for point features, otherwise
    /// the bounding-box center of the outer geometry.
    pub fn key_point(&self) -> Option<Coord<f64>> {
        let points = self.outer_points();
        match self.kind {
            GeomKind::Point => points.first().copied(),
            GeomKind::Line | GeomKind::Area => LineString::from(points.to_vec())
                .bounding_rect()
                .map(|rect| rect.center()),
        }
    }
}

/// Writes features to a stream file.
pub struct FeatureWriter<W: Write> {
    writer: W,
    count: u64,
}

impl FeatureWriter<BufWriter<File>> {
    /// Create (or truncate) a stream file.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> FeatureWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, count: 0 }
    }

    /// Append one feature record.
    pub fn write(&mut self, feature: &RawFeature) -> Result<()> {
        let payload = postcard::to_allocvec(feature)?;
        write_varint(&mut self.writer, payload.len() as u64)?;
        self.writer.write_all(&payload)?;
        self.count += 1;
        Ok(())
    }

    /// Number of features written so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Flush and return the inner writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Sequentially decodes features from a stream.
pub struct FeatureReader<R: Read> {
    reader: R,
    offset: u64,
    buf: Vec<u8>,
    failed: bool,
}

impl FeatureReader<BufReader<File>> {
    /// Open a stream file for sequential decoding.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::new(BufReader::with_capacity(1 << 20, file)))
    }
}

impl<R: Read> FeatureReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            buf: Vec::new(),
            failed: false,
        }
    }

    /// Byte offset of the next record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Decode the next feature; `Ok(None)` at end of stream.
    pub fn next_feature(&mut self) -> Result<Option<RawFeature>> {
        let record_offset = self.offset;
        let len = match read_varint(&mut self.reader) {
            Ok(Some(len)) => len,
            Ok(None) => return Ok(None),
            Err(e) => {
                return Err(LocalityError::FeatureDecode {
                    offset: record_offset,
                    message: e.to_string(),
                })
            }
        };
        if len > MAX_RECORD_BYTES {
            return Err(LocalityError::FeatureDecode {
                offset: record_offset,
                message: format!("record length {} exceeds limit", len),
            });
        }

        self.buf.resize(len as usize, 0);
        self.reader
            .read_exact(&mut self.buf)
            .map_err(|e| LocalityError::FeatureDecode {
                offset: record_offset,
                message: e.to_string(),
            })?;
        let feature: RawFeature =
            postcard::from_bytes(&self.buf).map_err(|e| LocalityError::FeatureDecode {
                offset: record_offset,
                message: e.to_string(),
            })?;

        self.offset += varint_len(len) + len;
        Ok(Some(feature))
    }
}

impl<R: Read> Iterator for FeatureReader<R> {
    type Item = Result<RawFeature>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_feature() {
            Ok(Some(feature)) => Some(Ok(feature)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn varint_len(value: u64) -> u64 {
    let bits = 64 - value.leading_zeros().min(63);
    u64::from(bits.div_ceil(7))
}

/// Visit every feature of a stream file in order on the calling thread.
pub fn for_each_feature<F>(path: &Path, mut f: F) -> Result<u64>
where
    F: FnMut(&RawFeature) -> Result<()>,
{
    let mut reader = FeatureReader::open(path)?;
    let mut count = 0u64;
    while let Some(feature) = reader.next_feature()? {
        f(&feature)?;
        count += 1;
    }
    Ok(count)
}

/// Write a slice of features to a new stream file.
pub fn write_features(path: &Path, features: &[RawFeature]) -> Result<()> {
    let mut writer = FeatureWriter::create(path)?;
    for feature in features {
        writer.write(feature)?;
    }
    writer.finish()?;
    Ok(())
}
