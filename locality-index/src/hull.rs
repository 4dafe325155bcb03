//! Convex hull fallback for areas that do not decompose into one strip.

use crate::strip::orient;
use geo::ConvexHull;
use geo_types::{Coord, MultiPoint};

/// Convex hull of `points` as an open counter-clockwise ring.
///
/// Points closer than `eps` to their predecessor are merged and collinear
/// hull vertices are dropped, so the result is a strictly convex polygon (or
/// fewer than three points for degenerate input).
pub fn convex_hull(points: &[Coord<f64>], eps: f64) -> Vec<Coord<f64>> {
    if points.is_empty() {
        return Vec::new();
    }
    let hull = MultiPoint::from(points.to_vec()).convex_hull();
    let mut ring: Vec<Coord<f64>> = hull.exterior().0.clone();

    ring.dedup_by(|b, a| (a.x - b.x).abs() <= eps && (a.y - b.y).abs() <= eps);
    while ring.len() > 1 {
        let first = ring[0];
        let last = ring[ring.len() - 1];
        if (first.x - last.x).abs() <= eps && (first.y - last.y).abs() <= eps {
            ring.pop();
        } else {
            break;
        }
    }

    // Drop collinear vertices until none remain.
    let mut changed = true;
    while changed && ring.len() >= 3 {
        changed = false;
        let n = ring.len();
        for i in 0..n {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            if orient(prev, ring[i], next).abs() <= eps {
                ring.remove(i);
                changed = true;
                break;
            }
        }
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HULL_EPSILON;
    use crate::strip::signed_area;
    use geo_types::coord;

    #[test]
    fn test_hull_of_bowtie() {
        let points = vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 2.0, y: 2.0 },
            coord! { x: 2.0, y: 0.0 },
            coord! { x: 0.0, y: 2.0 },
        ];
        let hull = convex_hull(&points, HULL_EPSILON);
        assert_eq!(hull.len(), 4);
        assert!(signed_area(&hull) > 0.0);
        assert!((signed_area(&hull) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_hull_drops_interior_and_collinear() {
        let points = vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 0.0 },
            coord! { x: 2.0, y: 0.0 },
            coord! { x: 2.0, y: 2.0 },
            coord! { x: 1.0, y: 1.0 },
            coord! { x: 0.0, y: 2.0 },
            coord! { x: 0.0, y: 2.0 },
        ];
        let hull = convex_hull(&points, HULL_EPSILON);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&coord! { x: 1.0, y: 0.0 }));
        assert!(!hull.contains(&coord! { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn test_hull_degenerate() {
        let line = vec![
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 1.0 },
            coord! { x: 2.0, y: 2.0 },
        ];
        assert!(convex_hull(&line, HULL_EPSILON).len() < 3);
        assert!(convex_hull(&[], HULL_EPSILON).is_empty());
    }
}
