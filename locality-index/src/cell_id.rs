//! Hierarchical quadtree cell ids.
//!
//! The plane `[-180, 180] x [-180, 180]` is split recursively into four
//! quadrants down to [`MAX_LEVEL`]. A cell id packs the Morton (Z-order)
//! position of the cell together with a trailing sentinel bit whose position
//! encodes the level:
//!
//! ```text
//! id = ((morton << 1) | 1) << 2 * (MAX_LEVEL - level)
//! ```
//!
//! With this layout all descendants of a cell occupy the contiguous id range
//! `[range_min, range_max]`, and ids sort parents-before-children in the same
//! order a depth-first traversal visits them.

use geo_types::{coord, Coord, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deepest cell level.
pub const MAX_LEVEL: u8 = 30;

const WORLD_MIN: f64 = -180.0;
const WORLD_SPAN: f64 = 360.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(u64);

/// Spread the low 32 bits of `v` so that bit `i` lands at bit `2i`.
#[inline]
fn part1by1(v: u32) -> u64 {
    let mut x = u64::from(v);
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}

#[inline]
fn compact1by1(v: u64) -> u32 {
    let mut x = v & 0x5555_5555_5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x >> 16)) & 0x0000_0000_FFFF_FFFF;
    x as u32
}

impl CellId {
    /// The level-0 cell covering the whole plane.
    pub fn root() -> Self {
        Self::from_xy(0, 0, 0)
    }

    /// Cell at grid position `(x, y)` on `level`.
    pub fn from_xy(x: u32, y: u32, level: u8) -> Self {
        debug_assert!(level <= MAX_LEVEL);
        let morton = part1by1(x) | (part1by1(y) << 1);
        let shift = 2 * u32::from(MAX_LEVEL - level);
        CellId(((morton << 1) | 1) << shift)
    }

    /// The `level` cell containing `point`. Points outside the plane are
    /// clamped to its edge.
    pub fn from_point(point: Coord<f64>, level: u8) -> Self {
        let cells = 1u64 << level;
        let to_grid = |v: f64| -> u32 {
            let scaled = ((v - WORLD_MIN) / WORLD_SPAN * cells as f64).floor();
            scaled.clamp(0.0, (cells - 1) as f64) as u32
        };
        Self::from_xy(to_grid(point.x), to_grid(point.y), level)
    }

    /// Reinterpret a raw id. Returns `None` if `raw` is not a valid cell.
    pub fn from_raw(raw: u64) -> Option<Self> {
        if raw == 0 || raw >> (2 * u32::from(MAX_LEVEL) + 1) != 0 || raw.trailing_zeros() % 2 != 0 {
            return None;
        }
        Some(CellId(raw))
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    fn lsb(self) -> u64 {
        self.0 & self.0.wrapping_neg()
    }

    pub fn level(self) -> u8 {
        MAX_LEVEL - (self.0.trailing_zeros() / 2) as u8
    }

    /// Grid position of the cell on its own level.
    pub fn xy(self) -> (u32, u32) {
        let morton = self.0 >> (self.0.trailing_zeros() + 1);
        (compact1by1(morton), compact1by1(morton >> 1))
    }

    pub fn parent(self) -> Option<Self> {
        let level = self.level();
        if level == 0 {
            return None;
        }
        let (x, y) = self.xy();
        Some(Self::from_xy(x >> 1, y >> 1, level - 1))
    }

    /// The four children in Morton order. `None` at [`MAX_LEVEL`].
    pub fn children(self) -> Option<[CellId; 4]> {
        let level = self.level();
        if level >= MAX_LEVEL {
            return None;
        }
        let (x, y) = self.xy();
        let (x, y) = (x << 1, y << 1);
        Some([
            Self::from_xy(x, y, level + 1),
            Self::from_xy(x + 1, y, level + 1),
            Self::from_xy(x, y + 1, level + 1),
            Self::from_xy(x + 1, y + 1, level + 1),
        ])
    }

    /// Smallest id of any descendant (inclusive).
    pub fn range_min(self) -> u64 {
        self.0 - (self.lsb() - 1)
    }

    /// Largest id of any descendant (inclusive).
    pub fn range_max(self) -> u64 {
        self.0 + (self.lsb() - 1)
    }

    /// True if `other` is this cell or one of its descendants.
    pub fn contains(self, other: CellId) -> bool {
        other.0 >= self.range_min() && other.0 <= self.range_max()
    }

    /// Plane rectangle covered by the cell.
    pub fn rect(self) -> Rect<f64> {
        let size = WORLD_SPAN / (1u64 << self.level()) as f64;
        let (x, y) = self.xy();
        let min_x = WORLD_MIN + f64::from(x) * size;
        let min_y = WORLD_MIN + f64::from(y) * size;
        Rect::new(
            coord! { x: min_x, y: min_y },
            coord! { x: min_x + size, y: min_y + size },
        )
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.xy();
        write!(f, "{}/{}/{}", self.level(), x, y)
    }
}
