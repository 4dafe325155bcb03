//! Cell coverings of locality objects.
//!
//! A covering is the set of quadtree cells that together contain an object's
//! geometry. Refinement is breadth-first: every frontier cell carries the
//! primitives (points, segments, triangles) that touch it, and a level is
//! accepted only while the frontier stays within the configured cell budget.

use crate::cell_id::{CellId, MAX_LEVEL};
use crate::config::CoveringConfig;
use crate::locality_object::{LocalityGeometry, LocalityObject};
use geo::Intersects;
use geo_types::{Coord, Line, Polygon};
use serde::{Deserialize, Serialize};

/// The cells assigned to one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveringEntry {
    pub object_id: u64,
    /// Raw cell ids, ascending.
    pub cells: Vec<u64>,
}

/// Accumulated coverings of many objects, in production order.
pub type LocalitiesCovering = Vec<CoveringEntry>;

/// Total number of (object, cell) pairs.
pub fn covering_cell_count(covering: &[CoveringEntry]) -> usize {
    covering.iter().map(|entry| entry.cells.len()).sum()
}

enum Primitive {
    Point(Coord<f64>),
    Segment(Line<f64>),
    Triangle(Polygon<f64>),
}

impl Primitive {
    fn intersects(&self, cell: &Polygon<f64>) -> bool {
        match self {
            Primitive::Point(p) => cell.intersects(p),
            Primitive::Segment(line) => line.intersects(cell),
            Primitive::Triangle(triangle) => triangle.intersects(cell),
        }
    }
}

fn primitives(object: &LocalityObject) -> Vec<Primitive> {
    match object.geometry() {
        LocalityGeometry::Point(p) => vec![Primitive::Point(*p)],
        LocalityGeometry::Polyline(points) if points.len() == 1 => {
            vec![Primitive::Point(points[0])]
        }
        LocalityGeometry::Polyline(_) => object.iter_segments().map(Primitive::Segment).collect(),
        LocalityGeometry::Triangles(_) => object
            .iter_triangles()
            .map(|t| Primitive::Triangle(t.to_polygon()))
            .collect(),
    }
}

/// Compute the covering of `object`, as sorted cells.
///
/// A point yields exactly one cell at `max_level`. Objects without geometry
/// or entirely outside the world plane yield an empty covering.
pub fn cover_object(object: &LocalityObject, config: &CoveringConfig) -> Vec<CellId> {
    let max_level = config.max_level.min(MAX_LEVEL);
    if let LocalityGeometry::Point(p) = object.geometry() {
        return vec![CellId::from_point(*p, max_level)];
    }

    let prims = primitives(object);
    if prims.is_empty() {
        return Vec::new();
    }

    let root = CellId::root();
    let root_shape = root.rect().to_polygon();
    let in_world: Vec<u32> = (0..prims.len() as u32)
        .filter(|&i| prims[i as usize].intersects(&root_shape))
        .collect();
    if in_world.is_empty() {
        return Vec::new();
    }

    let mut frontier: Vec<(CellId, Vec<u32>)> = vec![(root, in_world)];

    for _ in 0..max_level {
        let mut next = Vec::with_capacity(frontier.len() * 4);
        for (cell, candidates) in &frontier {
            let Some(children) = cell.children() else {
                continue;
            };
            for child in children {
                let shape = child.rect().to_polygon();
                let hits: Vec<u32> = candidates
                    .iter()
                    .copied()
                    .filter(|&i| prims[i as usize].intersects(&shape))
                    .collect();
                if !hits.is_empty() {
                    next.push((child, hits));
                }
            }
        }
        if next.is_empty() || next.len() > config.max_cells {
            break;
        }
        frontier = next;
    }

    let mut cells: Vec<CellId> = frontier.into_iter().map(|(cell, _)| cell).collect();
    cells.sort_unstable();
    cells
}

/// Append the covering of `object` to `out`. Nothing is appended when the
/// covering is empty.
pub fn append_covering(
    object: &LocalityObject,
    config: &CoveringConfig,
    out: &mut LocalitiesCovering,
) {
    let cells = cover_object(object, config);
    if cells.is_empty() {
        return;
    }
    out.push(CoveringEntry {
        object_id: object.id(),
        cells: cells.into_iter().map(CellId::raw).collect(),
    });
}
