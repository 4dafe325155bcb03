//! Compact border geometry encoding.
//!
//! ```text
//! [ring_count: varint]
//! per ring:
//!   [point_count: varint]
//!   per point: [dx: zigzag varint][dy: zigzag varint]
//! ```
//!
//! Coordinates are quantized onto a `2^coord_bits` grid spanning
//! `[-180, 180]`; each delta is relative to the previous point, the first
//! point of the first ring relative to the grid origin.

use crate::error::{LocalityError, Result};
use crate::varint::{decode_varint, encode_varint, zigzag_decode, zigzag_encode};
use geo_types::{coord, Coord};
use serde::{Deserialize, Serialize};

const WORLD_MIN: f64 = -180.0;
const WORLD_SPAN: f64 = 360.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryCodingParams {
    pub coord_bits: u8,
}

impl Default for GeometryCodingParams {
    fn default() -> Self {
        Self { coord_bits: 30 }
    }
}

impl GeometryCodingParams {
    fn max_value(&self) -> f64 {
        ((1u64 << self.coord_bits.min(32)) - 1) as f64
    }

    pub fn quantize(&self, c: Coord<f64>) -> (i64, i64) {
        let max = self.max_value();
        let q = |v: f64| (((v - WORLD_MIN) / WORLD_SPAN) * max).round().clamp(0.0, max) as i64;
        (q(c.x), q(c.y))
    }

    pub fn dequantize(&self, (x, y): (i64, i64)) -> Coord<f64> {
        let max = self.max_value();
        coord! {
            x: WORLD_MIN + x as f64 / max * WORLD_SPAN,
            y: WORLD_MIN + y as f64 / max * WORLD_SPAN,
        }
    }

    /// Grid cell size in plane units.
    pub fn resolution(&self) -> f64 {
        WORLD_SPAN / self.max_value()
    }
}

/// Encode border rings. Returns no bytes when the rings hold no points.
pub fn encode_border(rings: &[Vec<Coord<f64>>], params: &GeometryCodingParams) -> Vec<u8> {
    if rings.iter().all(Vec::is_empty) {
        return Vec::new();
    }
    let mut buf = Vec::new();
    encode_varint(rings.len() as u64, &mut buf);
    let mut prev = (0i64, 0i64);
    for ring in rings {
        encode_varint(ring.len() as u64, &mut buf);
        for &point in ring {
            let q = params.quantize(point);
            encode_varint(zigzag_encode(q.0 - prev.0), &mut buf);
            encode_varint(zigzag_encode(q.1 - prev.1), &mut buf);
            prev = q;
        }
    }
    buf
}

/// Decode a border produced by [`encode_border`].
pub fn decode_border(bytes: &[u8], params: &GeometryCodingParams) -> Result<Vec<Vec<Coord<f64>>>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let mut pos = 0;
    let ring_count = decode_varint(bytes, &mut pos)? as usize;
    let mut rings = Vec::with_capacity(ring_count.min(1024));
    let mut prev = (0i64, 0i64);
    for _ in 0..ring_count {
        let point_count = decode_varint(bytes, &mut pos)? as usize;
        let mut ring = Vec::with_capacity(point_count.min(1 << 16));
        for _ in 0..point_count {
            let dx = zigzag_decode(decode_varint(bytes, &mut pos)?);
            let dy = zigzag_decode(decode_varint(bytes, &mut pos)?);
            prev = (prev.0 + dx, prev.1 + dy);
            ring.push(params.dequantize(prev));
        }
        rings.push(ring);
    }
    if pos != bytes.len() {
        return Err(LocalityError::FormatError(format!(
            "{} trailing bytes after border geometry",
            bytes.len() - pos
        )));
    }
    Ok(rings)
}
