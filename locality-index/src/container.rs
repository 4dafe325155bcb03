//! Section container file.
//!
//! A container holds named binary sections. Index artifacts, borders and
//! the data version all live in containers.
//!
//! ```text
//! [Header: 8 bytes]
//!   magic: "LCF1" (4B), version: u8, _pad: [u8; 3]
//! [Section bodies, back to back]
//! [Table of contents: JSON array of { tag, offset, len, crc32 }]
//! [Trailer: 20 bytes]
//!   toc_offset: u64 (LE), toc_len: u64 (LE), magic: "LCF1" (4B)
//! ```
//!
//! Containers are loaded fully into memory and rewritten as a whole through
//! a temporary file in the destination directory, then renamed into place.

use crate::error::{LocalityError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONTAINER_MAGIC: [u8; 4] = *b"LCF1";
pub const CONTAINER_VERSION: u8 = 1;

const HEADER_LEN: usize = 8;
const TRAILER_LEN: usize = 20;

/// Table of contents entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEntry {
    pub tag: String,
    pub offset: u64,
    pub len: u64,
    pub crc32: u32,
}

/// In-memory view of a container file.
#[derive(Debug)]
pub struct Container {
    path: PathBuf,
    sections: Vec<(String, Vec<u8>)>,
}

impl Container {
    /// A new, empty container. Nothing touches disk until [`commit`](Self::commit).
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sections: Vec::new(),
        }
    }

    /// Load an existing container. Fails if the file is missing or corrupt.
    pub fn open_existing(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = fs::read(&path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
        })?;
        let sections = decode(&data)?;
        debug!(path = %path.display(), sections = sections.len(), "Opened container");
        Ok(Self { path, sections })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Section tags in file order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(tag, _)| tag.as_str())
    }

    pub fn has_section(&self, tag: &str) -> bool {
        self.sections.iter().any(|(t, _)| t == tag)
    }

    pub fn section(&self, tag: &str) -> Result<&[u8]> {
        self.sections
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, body)| body.as_slice())
            .ok_or_else(|| LocalityError::SectionNotFound(tag.to_string()))
    }

    /// Add a section, replacing any existing section with the same tag.
    pub fn set_section(&mut self, tag: &str, body: Vec<u8>) {
        match self.sections.iter_mut().find(|(t, _)| t == tag) {
            Some((_, existing)) => *existing = body,
            None => self.sections.push((tag.to_string(), body)),
        }
    }

    /// Write the container to its path atomically.
    pub fn commit(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            encode(&self.sections, &mut writer)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| LocalityError::Io(e.error))?;
        debug!(
            path = %self.path.display(),
            sections = self.sections.len(),
            "Committed container"
        );
        Ok(())
    }
}

fn encode<W: Write>(sections: &[(String, Vec<u8>)], writer: &mut W) -> Result<()> {
    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(&CONTAINER_MAGIC);
    header[4] = CONTAINER_VERSION;
    writer.write_all(&header)?;

    let mut offset = HEADER_LEN as u64;
    let mut toc = Vec::with_capacity(sections.len());
    for (tag, body) in sections {
        writer.write_all(body)?;
        toc.push(SectionEntry {
            tag: tag.clone(),
            offset,
            len: body.len() as u64,
            crc32: crc32fast::hash(body),
        });
        offset += body.len() as u64;
    }

    let toc_bytes = serde_json::to_vec(&toc)?;
    writer.write_all(&toc_bytes)?;
    writer.write_all(&offset.to_le_bytes())?;
    writer.write_all(&(toc_bytes.len() as u64).to_le_bytes())?;
    writer.write_all(&CONTAINER_MAGIC)?;
    Ok(())
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

/// Parse and validate the table of contents of a container image.
pub fn read_toc(data: &[u8]) -> Result<Vec<SectionEntry>> {
    if data.len() < HEADER_LEN + TRAILER_LEN {
        return Err(LocalityError::Container(format!(
            "file too small: {} bytes",
            data.len()
        )));
    }
    if data[0..4] != CONTAINER_MAGIC {
        return Err(LocalityError::Container("invalid header magic".into()));
    }
    if data[4] != CONTAINER_VERSION {
        return Err(LocalityError::Container(format!(
            "unsupported version {} (expected {})",
            data[4], CONTAINER_VERSION
        )));
    }

    let trailer = data.len() - TRAILER_LEN;
    if data[trailer + 16..] != CONTAINER_MAGIC {
        return Err(LocalityError::Container("invalid trailer magic".into()));
    }
    let toc_offset = read_u64(data, trailer);
    let toc_len = read_u64(data, trailer + 8);
    if toc_offset < HEADER_LEN as u64 || toc_offset.saturating_add(toc_len) != trailer as u64 {
        return Err(LocalityError::Container(format!(
            "table of contents out of bounds: offset {} len {}",
            toc_offset, toc_len
        )));
    }

    let toc: Vec<SectionEntry> =
        serde_json::from_slice(&data[toc_offset as usize..trailer]).map_err(|e| {
            LocalityError::Container(format!("bad table of contents: {}", e))
        })?;
    for entry in &toc {
        if entry.offset < HEADER_LEN as u64 || entry.offset.saturating_add(entry.len) > toc_offset {
            return Err(LocalityError::Container(format!(
                "section {} out of bounds",
                entry.tag
            )));
        }
    }
    Ok(toc)
}

fn decode(data: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let toc = read_toc(data)?;
    let mut sections = Vec::with_capacity(toc.len());
    for entry in toc {
        let body = &data[entry.offset as usize..(entry.offset + entry.len) as usize];
        let actual = crc32fast::hash(body);
        if actual != entry.crc32 {
            return Err(LocalityError::Container(format!(
                "section {} CRC32 mismatch: expected {:08x}, got {:08x}",
                entry.tag, entry.crc32, actual
            )));
        }
        sections.push((entry.tag, body.to_vec()));
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.dat");

        let mut container = Container::create(&path);
        container.set_section("a", b"alpha".to_vec());
        container.set_section("b", Vec::new());
        container.commit().unwrap();

        let reopened = Container::open_existing(&path).unwrap();
        assert_eq!(reopened.tags().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(reopened.section("a").unwrap(), b"alpha");
        assert!(reopened.section("b").unwrap().is_empty());
        assert!(matches!(
            reopened.section("c"),
            Err(LocalityError::SectionNotFound(_))
        ));
    }

    #[test]
    fn test_overwrite_keeps_other_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.dat");

        let mut container = Container::create(&path);
        container.set_section("keep", b"1".to_vec());
        container.set_section("version", b"old".to_vec());
        container.commit().unwrap();

        let mut container = Container::open_existing(&path).unwrap();
        container.set_section("version", b"new".to_vec());
        container.commit().unwrap();

        let reopened = Container::open_existing(&path).unwrap();
        assert_eq!(reopened.section("keep").unwrap(), b"1");
        assert_eq!(reopened.section("version").unwrap(), b"new");
        assert_eq!(reopened.tags().count(), 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Container::open_existing(dir.path().join("nope.dat")).unwrap_err();
        assert!(matches!(err, LocalityError::Io(_)));
    }

    #[test]
    fn test_corrupt_section_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.dat");
        let mut container = Container::create(&path);
        container.set_section("data", b"payload".to_vec());
        container.commit().unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[HEADER_LEN] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        let err = Container::open_existing(&path).unwrap_err();
        assert!(err.to_string().contains("CRC32 mismatch"));
    }

    #[test]
    fn test_bad_magic() {
        let err = read_toc(&[0u8; 64]).unwrap_err();
        assert!(matches!(err, LocalityError::Container(_)));
    }
}
