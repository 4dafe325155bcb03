//! The unit stored in the locality index.

use geo_types::{Coord, Line, Triangle};

/// Simplified geometry of a locality object.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalityGeometry {
    Point(Coord<f64>),
    Polyline(Vec<Coord<f64>>),
    /// Flat triangle list; every three consecutive points form one triangle.
    Triangles(Vec<Coord<f64>>),
}

/// An id plus the index-ready geometry of one accepted feature.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalityObject {
    id: u64,
    geometry: LocalityGeometry,
}

impl LocalityObject {
    pub fn point(id: u64, point: Coord<f64>) -> Self {
        Self {
            id,
            geometry: LocalityGeometry::Point(point),
        }
    }

    pub fn polyline(id: u64, points: Vec<Coord<f64>>) -> Self {
        Self {
            id,
            geometry: LocalityGeometry::Polyline(points),
        }
    }

    /// # Panics
    ///
    /// Panics if `points` is empty or not a multiple of three: a triangle
    /// producer handing over anything else has broken its contract.
    pub fn triangles(id: u64, points: Vec<Coord<f64>>) -> Self {
        assert!(
            points.len() >= 3 && points.len() % 3 == 0,
            "triangle set for object {} has {} points",
            id,
            points.len()
        );
        Self {
            id,
            geometry: LocalityGeometry::Triangles(points),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn geometry(&self) -> &LocalityGeometry {
        &self.geometry
    }

    /// Iterate the polyline segments (empty for other variants).
    pub fn iter_segments(&self) -> impl Iterator<Item = Line<f64>> + '_ {
        let points: &[Coord<f64>] = match &self.geometry {
            LocalityGeometry::Polyline(points) => points,
            _ => &[],
        };
        points.windows(2).map(|w| Line::new(w[0], w[1]))
    }

    /// Iterate the triangles (empty for other variants).
    pub fn iter_triangles(&self) -> impl Iterator<Item = Triangle<f64>> + '_ {
        let points: &[Coord<f64>] = match &self.geometry {
            LocalityGeometry::Triangles(points) => points,
            _ => &[],
        };
        points
            .chunks_exact(3)
            .map(|t| Triangle::new(t[0], t[1], t[2]))
    }
}
