//! Sorted cell index storage.
//!
//! The cell index maps quadtree cell ids to locality object ids. Entries are
//! sorted by `(cell_id, object_id)` and deduplicated, so a range scan over a
//! covering interval visits each object at most once per cell.
//!
//! # Format
//!
//! The index body is a run of leaflets, routed by the leaflet table stored
//! in the manifest.
//!
//! ```text
//! LCI1 (Locality Cell Index v1)
//!
//! Leaflet Header (44 bytes):
//!   magic: "LCI1" (4B)
//!   version: u8
//!   flags: u8
//!   _reserved: u16
//!   entry_count: u32 (LE)
//!   compressed_len: u32 (LE)
//!   uncompressed_len: u32 (LE)
//!   first_cell_id: u64 (LE)
//!   last_cell_id: u64 (LE)
//!   crc32_compressed: u32 (LE)
//!   crc32_uncompressed: u32 (LE)
//!
//! Body (zstd compressed):
//!   entries: [CellEntry; entry_count]
//! ```

use crate::error::{LocalityError, Result};
use serde::{Deserialize, Serialize};

/// Magic bytes for cell index leaflets.
pub const LEAFLET_MAGIC: &[u8; 4] = b"LCI1";

/// Current leaflet format version.
pub const LEAFLET_VERSION: u8 = 1;

const LEAFLET_HEADER_LEN: usize = 44;

const ZSTD_LEVEL: i32 = 3;

/// A single `(cell, object)` association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellEntry {
    pub cell_id: u64,
    pub object_id: u64,
}

impl CellEntry {
    /// Size of a serialized entry in bytes.
    pub const SIZE: usize = 16;

    pub fn new(cell_id: u64, object_id: u64) -> Self {
        Self { cell_id, object_id }
    }

    /// Serialize to bytes (little-endian).
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..8].copy_from_slice(&self.cell_id.to_le_bytes());
        buf[8..16].copy_from_slice(&self.object_id.to_le_bytes());
        buf
    }

    pub fn from_bytes(data: &[u8; Self::SIZE]) -> Self {
        let mut cell = [0u8; 8];
        let mut object = [0u8; 8];
        cell.copy_from_slice(&data[0..8]);
        object.copy_from_slice(&data[8..16]);
        Self {
            cell_id: u64::from_le_bytes(cell),
            object_id: u64::from_le_bytes(object),
        }
    }
}

/// Location and key range of one leaflet inside the cells section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafletMeta {
    /// Byte offset of the leaflet within the cells section.
    pub offset: u64,

    /// Leaflet length in bytes (header + compressed body).
    pub len: u64,

    pub entry_count: u32,
    pub first_cell_id: u64,
    pub last_cell_id: u64,
}

/// Builder for cell index leaflets.
pub struct CellIndexBuilder {
    /// Accumulated entries (sorted on build).
    entries: Vec<CellEntry>,

    /// Target uncompressed leaflet size in bytes.
    leaflet_target_bytes: usize,
}

impl CellIndexBuilder {
    pub fn new(leaflet_target_bytes: usize) -> Self {
        Self {
            entries: Vec::new(),
            leaflet_target_bytes,
        }
    }

    /// Add entries. Entries can be added in any order.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = CellEntry>) {
        self.entries.extend(entries);
    }

    /// Sort, dedup and encode all entries.
    ///
    /// Returns the concatenated leaflet bytes, the leaflet table and the
    /// number of unique entries.
    pub fn build(mut self) -> Result<(Vec<u8>, Vec<LeafletMeta>, u64)> {
        self.entries.sort_unstable();
        self.entries.dedup();

        let per_leaflet = (self.leaflet_target_bytes / CellEntry::SIZE).max(1);
        let mut body = Vec::new();
        let mut leaflets = Vec::new();

        for chunk in self.entries.chunks(per_leaflet) {
            let (first, last) = match (chunk.first(), chunk.last()) {
                (Some(first), Some(last)) => (first.cell_id, last.cell_id),
                _ => continue,
            };
            let bytes = encode_leaflet(chunk, first, last)?;
            leaflets.push(LeafletMeta {
                offset: body.len() as u64,
                len: bytes.len() as u64,
                entry_count: chunk.len() as u32,
                first_cell_id: first,
                last_cell_id: last,
            });
            body.extend_from_slice(&bytes);
        }

        Ok((body, leaflets, self.entries.len() as u64))
    }
}

fn encode_leaflet(entries: &[CellEntry], first: u64, last: u64) -> Result<Vec<u8>> {
    let mut uncompressed = Vec::with_capacity(entries.len() * CellEntry::SIZE);
    for entry in entries {
        uncompressed.extend_from_slice(&entry.to_bytes());
    }
    let crc32_uncompressed = crc32fast::hash(&uncompressed);

    let compressed = zstd::encode_all(&uncompressed[..], ZSTD_LEVEL)?;
    let crc32_compressed = crc32fast::hash(&compressed);

    let mut buf = Vec::with_capacity(LEAFLET_HEADER_LEN + compressed.len());
    buf.extend_from_slice(LEAFLET_MAGIC); // 0-4
    buf.push(LEAFLET_VERSION); // 4
    buf.push(0); // flags, 5
    buf.extend_from_slice(&[0u8; 2]); // 6-8
    buf.extend_from_slice(&(entries.len() as u32).to_le_bytes()); // 8-12
    buf.extend_from_slice(&(compressed.len() as u32).to_le_bytes()); // 12-16
    buf.extend_from_slice(&(uncompressed.len() as u32).to_le_bytes()); // 16-20
    buf.extend_from_slice(&first.to_le_bytes()); // 20-28
    buf.extend_from_slice(&last.to_le_bytes()); // 28-36
    buf.extend_from_slice(&crc32_compressed.to_le_bytes()); // 36-40
    buf.extend_from_slice(&crc32_uncompressed.to_le_bytes()); // 40-44
    buf.extend_from_slice(&compressed);
    Ok(buf)
}

fn le_u32(data: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(b)
}

/// Decode and validate a single leaflet.
pub fn decode_leaflet(data: &[u8]) -> Result<Vec<CellEntry>> {
    if data.len() < LEAFLET_HEADER_LEN {
        return Err(LocalityError::FormatError("leaflet too short".into()));
    }
    if &data[0..4] != LEAFLET_MAGIC {
        return Err(LocalityError::FormatError("invalid leaflet magic".into()));
    }
    let version = data[4];
    if version != LEAFLET_VERSION {
        return Err(LocalityError::FormatError(format!(
            "unsupported leaflet version: {} (only v{} supported)",
            version, LEAFLET_VERSION
        )));
    }

    let entry_count = le_u32(data, 8) as usize;
    let compressed_len = le_u32(data, 12) as usize;
    if data.len() < LEAFLET_HEADER_LEN + compressed_len {
        return Err(LocalityError::FormatError("truncated leaflet body".into()));
    }
    let expected_crc_compressed = le_u32(data, 36);
    let expected_crc_uncompressed = le_u32(data, 40);

    let compressed = &data[LEAFLET_HEADER_LEN..LEAFLET_HEADER_LEN + compressed_len];
    let actual_crc_c = crc32fast::hash(compressed);
    if actual_crc_c != expected_crc_compressed {
        return Err(LocalityError::FormatError(format!(
            "compressed CRC32 mismatch: expected {:08x}, got {:08x}",
            expected_crc_compressed, actual_crc_c
        )));
    }

    let decompressed = zstd::decode_all(compressed)?;
    let actual_crc_u = crc32fast::hash(&decompressed);
    if actual_crc_u != expected_crc_uncompressed {
        return Err(LocalityError::FormatError(format!(
            "uncompressed CRC32 mismatch: expected {:08x}, got {:08x}",
            expected_crc_uncompressed, actual_crc_u
        )));
    }

    if decompressed.len() != entry_count * CellEntry::SIZE {
        return Err(LocalityError::FormatError("entry count mismatch".into()));
    }

    let mut entries = Vec::with_capacity(entry_count);
    for chunk in decompressed.chunks_exact(CellEntry::SIZE) {
        let mut raw = [0u8; CellEntry::SIZE];
        raw.copy_from_slice(chunk);
        entries.push(CellEntry::from_bytes(&raw));
    }
    Ok(entries)
}

/// Decode every leaflet of a cells section, in table order.
pub fn decode_all(body: &[u8], leaflets: &[LeafletMeta]) -> Result<Vec<CellEntry>> {
    let total: usize = leaflets.iter().map(|l| l.entry_count as usize).sum();
    let mut entries = Vec::with_capacity(total);
    for meta in leaflets {
        let end = meta.offset.saturating_add(meta.len);
        if end > body.len() as u64 {
            return Err(LocalityError::FormatError(format!(
                "leaflet at offset {} exceeds cells section",
                meta.offset
            )));
        }
        let decoded = decode_leaflet(&body[meta.offset as usize..end as usize])?;
        if decoded.len() != meta.entry_count as usize {
            return Err(LocalityError::FormatError(
                "leaflet entry count disagrees with manifest".into(),
            ));
        }
        entries.extend(decoded);
    }
    Ok(entries)
}
