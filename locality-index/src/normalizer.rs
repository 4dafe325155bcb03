//! Feature to locality object normalization.
//!
//! Points keep their key point, lines are simplified, and areas are reduced
//! to an explicit triangle list through a single triangle strip of the
//! simplified outer ring (falling back to the ring's convex hull).

use crate::config::{simplify_epsilon, HULL_EPSILON, UPPER_SCALE};
use crate::feature::{GeomKind, RawFeature};
use crate::hull::convex_hull;
use crate::locality_object::LocalityObject;
use crate::strip::{strip_to_triangles, StripBuilder};
use geo::Simplify;
use geo_types::{Coord, LineString};
use tracing::warn;

fn simplify(points: &[Coord<f64>], epsilon: f64) -> Vec<Coord<f64>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    LineString::from(points.to_vec()).simplify(&epsilon).0
}

/// Reusable per-worker normalizer. Not shared between threads.
#[derive(Debug)]
pub struct LocalityObjectBuilder {
    epsilon: f64,
    strip: StripBuilder,
    triangles: Vec<Coord<f64>>,
}

impl Default for LocalityObjectBuilder {
    fn default() -> Self {
        Self::new(None)
    }
}

impl LocalityObjectBuilder {
    /// `max_triangles` caps the triangles accepted per area; `None` means
    /// no limit.
    pub fn new(max_triangles: Option<usize>) -> Self {
        Self {
            epsilon: simplify_epsilon(UPPER_SCALE),
            strip: StripBuilder::new(max_triangles),
            triangles: Vec::new(),
        }
    }

    /// Convert an accepted feature into its index-ready form.
    ///
    /// Returns `None` when the geometry is empty after simplification or no
    /// strip exists even for the convex hull.
    ///
    /// # Panics
    ///
    /// Panics if an area that passed strip construction yields fewer than
    /// three triangle vertices.
    pub fn build(&mut self, feature: &RawFeature) -> Option<LocalityObject> {
        match feature.kind {
            GeomKind::Point => feature
                .key_point()
                .map(|p| LocalityObject::point(feature.id, p)),
            GeomKind::Line => {
                let points = simplify(feature.outer_points(), self.epsilon);
                if points.is_empty() {
                    return None;
                }
                Some(LocalityObject::polyline(feature.id, points))
            }
            GeomKind::Area => self.build_area(feature),
        }
    }

    fn build_area(&mut self, feature: &RawFeature) -> Option<LocalityObject> {
        self.strip.reset();

        let mut points = simplify(feature.outer_points(), self.epsilon);
        if points.is_empty() {
            return None;
        }
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if feature.geometry.len() > 1 {
            // Holes and extra outers are folded into one point set; the
            // strip rejects it and the hull covers the union.
            points = feature.geometry.iter().flatten().copied().collect();
        }
        points.dedup();

        if points.len() > 2 && !self.strip.try_make_strip(&mut points) {
            let mut hull = convex_hull(&points, HULL_EPSILON);
            self.strip.set_inner();
            if !self.strip.try_make_strip(&mut hull) {
                warn!(
                    id = feature.id,
                    kind = feature.tags.primary_type(),
                    original = ?feature.geometry,
                    ?hull,
                    "Error while building triangles for object"
                );
                return None;
            }
        }

        if self.strip.need_process_triangles() {
            return None;
        }

        self.triangles.clear();
        strip_to_triangles(self.strip.strip(), &mut self.triangles);
        assert!(
            self.triangles.len() >= 3,
            "area {} produced {} triangle vertices",
            feature.id,
            self.triangles.len()
        );
        Some(LocalityObject::triangles(
            feature.id,
            std::mem::take(&mut self.triangles),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::FeatureTags;
    use crate::locality_object::LocalityGeometry;
    use geo_types::coord;
    use parking_lot::Mutex;
    use std::io::Write;
    use std::sync::Arc;

    fn ring(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        let mut ring: Vec<Coord<f64>> = points.iter().map(|&(x, y)| coord! { x: x, y: y }).collect();
        ring.push(ring[0]);
        ring
    }

    fn area(id: u64, rings: Vec<Vec<Coord<f64>>>) -> RawFeature {
        RawFeature::area(id, rings, FeatureTags::with_type("building"))
    }

    fn triangle_count(obj: &LocalityObject) -> usize {
        match obj.geometry() {
            LocalityGeometry::Triangles(points) => points.len() / 3,
            other => panic!("expected triangles, got {:?}", other),
        }
    }

    #[test]
    fn test_point_keeps_key_point() {
        let mut builder = LocalityObjectBuilder::default();
        let feature = RawFeature::point(7, coord! { x: 1.5, y: 2.5 }, FeatureTags::default());
        let obj = builder.build(&feature).unwrap();
        assert_eq!(obj.id(), 7);
        assert_eq!(obj.geometry(), &LocalityGeometry::Point(coord! { x: 1.5, y: 2.5 }));
    }

    #[test]
    fn test_line_is_simplified() {
        let mut builder = LocalityObjectBuilder::default();
        let feature = RawFeature::line(
            8,
            vec![
                coord! { x: 0.0, y: 0.0 },
                coord! { x: 0.5, y: 0.0 },
                coord! { x: 1.0, y: 0.0 },
            ],
            FeatureTags::default(),
        );
        let obj = builder.build(&feature).unwrap();
        assert_eq!(
            obj.geometry(),
            &LocalityGeometry::Polyline(vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 0.0 }])
        );
    }

    #[test]
    fn test_empty_line_dropped() {
        let mut builder = LocalityObjectBuilder::default();
        let feature = RawFeature::line(9, vec![], FeatureTags::default());
        assert!(builder.build(&feature).is_none());
    }

    #[test]
    fn test_square_area() {
        let mut builder = LocalityObjectBuilder::default();
        let feature = area(10, vec![ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])]);
        let obj = builder.build(&feature).unwrap();
        assert_eq!(triangle_count(&obj), 2);
    }

    #[test]
    fn test_self_intersecting_area_uses_hull() {
        let mut builder = LocalityObjectBuilder::default();
        let feature = area(11, vec![ring(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)])]);
        let obj = builder.build(&feature).unwrap();
        assert_eq!(triangle_count(&obj), 2);
    }

    #[test]
    fn test_multi_ring_area_uses_hull_of_all_points() {
        let mut builder = LocalityObjectBuilder::default();
        let feature = area(
            12,
            vec![
                ring(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]),
                ring(&[(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0)]),
            ],
        );
        let obj = builder.build(&feature).unwrap();
        assert_eq!(triangle_count(&obj), 2);
    }

    #[test]
    fn test_degenerate_area_dropped() {
        let mut builder = LocalityObjectBuilder::default();
        let collinear = area(13, vec![ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])]);
        assert!(builder.build(&collinear).is_none());

        let tiny = area(14, vec![vec![coord! { x: 0.0, y: 0.0 }, coord! { x: 0.0, y: 0.0 }]]);
        assert!(builder.build(&tiny).is_none());
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_triangulation_failure_logs_original_rings() {
        // Two collinear rings sharing an endpoint: the strip and the hull
        // both fail, and the flattened set loses a duplicate to dedup.
        let feature = area(
            17,
            vec![
                ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]),
                ring(&[(0.0, 0.0), (3.0, 0.0), (4.0, 0.0)]),
            ],
        );
        let log = CapturedLog::default();
        let sink = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();

        let mut builder = LocalityObjectBuilder::default();
        let built = tracing::subscriber::with_default(subscriber, || builder.build(&feature));
        assert!(built.is_none());

        let output = String::from_utf8(log.0.lock().clone()).unwrap();
        assert!(output.contains("Error while building triangles for object"));
        assert!(output.contains("id=17"));
        assert!(output.contains(&format!("original={:?}", feature.geometry)));
    }

    #[test]
    fn test_builder_is_reusable_after_failure() {
        let mut builder = LocalityObjectBuilder::default();
        let collinear = area(15, vec![ring(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])]);
        assert!(builder.build(&collinear).is_none());

        let square = area(16, vec![ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])]);
        assert_eq!(triangle_count(&builder.build(&square).unwrap()), 2);
    }
}
