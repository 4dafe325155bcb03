//! POI node id whitelist.
//!
//! One id per line; only the first whitespace-separated token of each line
//! is read, so trailing annotations are allowed.

use crate::error::{LocalityError, Result};
use rustc_hash::FxHashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Whitelist {
    ids: FxHashSet<u64>,
}

impl Whitelist {
    pub fn from_ids(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// Load from an optional path. `None` or an empty path yields an empty
    /// whitelist; a path that cannot be opened is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => return Ok(Self::default()),
        };
        let file = File::open(path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
        })?;
        let whitelist = Self::parse(BufReader::new(file))?;
        info!(path = %path.display(), ids = whitelist.len(), "Loaded POI whitelist");
        Ok(whitelist)
    }

    /// Parse whitelist lines from a reader.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut ids = FxHashSet::default();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let id = line
                .split_whitespace()
                .next()
                .and_then(|token| token.parse::<u64>().ok())
                .ok_or_else(|| LocalityError::Whitelist {
                    line: idx + 1,
                    content: line.clone(),
                })?;
            ids.insert(id);
        }
        Ok(Self { ids })
    }

    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
