//! Single triangle strip decomposition of simple polygons.
//!
//! A polygon with `n` vertices is covered by one strip when there is a start
//! vertex `i` from which alternately stepping one vertex backward and one
//! vertex forward only ever crosses interior diagonals. The strip is then
//! `i, prev(i), next(i), prev²(i), next²(i), …` and expands to `n - 2`
//! triangles.

use geo::line_intersection::{line_intersection, LineIntersection};
use geo_types::{Coord, Line};

#[inline]
fn prev_mod(i: usize, n: usize) -> usize {
    if i == 0 {
        n - 1
    } else {
        i - 1
    }
}

#[inline]
fn next_mod(i: usize, n: usize) -> usize {
    if i + 1 == n {
        0
    } else {
        i + 1
    }
}

/// Twice the signed area of `(a, b, c)`; positive when `c` is left of `a→b`.
#[inline]
pub(crate) fn orient(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Shoelace signed area of a ring given without its closing point.
pub(crate) fn signed_area(points: &[Coord<f64>]) -> f64 {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let p = points[i];
        let q = points[next_mod(i, n)];
        sum += p.x * q.y - q.x * p.y;
    }
    sum / 2.0
}

/// True if any two ring edges touch other than at their shared vertex.
pub fn has_self_intersections(points: &[Coord<f64>]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let edge = |i: usize| Line::new(points[i], points[next_mod(i, n)]);

    for i in 0..n {
        let e1 = edge(i);
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(e1, edge(j)) {
                None => {}
                Some(LineIntersection::Collinear { intersection }) => {
                    if !adjacent || intersection.start != intersection.end {
                        return true;
                    }
                }
                Some(LineIntersection::SinglePoint { .. }) => {
                    if !adjacent {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Is the diagonal `a → b` inside the polygon cone at vertex `a`?
///
/// Assumes counter-clockwise orientation.
fn in_cone(points: &[Coord<f64>], a: usize, b: usize) -> bool {
    let n = points.len();
    let a0 = points[prev_mod(a, n)];
    let a1 = points[next_mod(a, n)];
    let pa = points[a];
    let pb = points[b];

    if orient(pa, a1, a0) >= 0.0 {
        // Convex vertex: b strictly inside the wedge.
        orient(pa, pb, a0) > 0.0 && orient(pb, pa, a1) > 0.0
    } else {
        // Reflex vertex: b not inside the exterior wedge.
        !(orient(pa, pb, a1) >= 0.0 && orient(pb, pa, a0) >= 0.0)
    }
}

/// Is `a - b` an interior diagonal (or a polygon edge)?
pub fn is_diagonal_visible(points: &[Coord<f64>], a: usize, b: usize) -> bool {
    let n = points.len();
    if a == b {
        return false;
    }
    if next_mod(a, n) == b || prev_mod(a, n) == b {
        return true;
    }
    if !in_cone(points, a, b) || !in_cone(points, b, a) {
        return false;
    }

    let diagonal = Line::new(points[a], points[b]);
    for c in 0..n {
        let c1 = next_mod(c, n);
        if c == a || c == b || c1 == a || c1 == b {
            continue;
        }
        if line_intersection(diagonal, Line::new(points[c], points[c1])).is_some() {
            return false;
        }
    }
    true
}

/// Find a start vertex from which a single strip covers all `n` vertices.
pub fn find_single_strip<F>(n: usize, mut is_visible: F) -> Option<usize>
where
    F: FnMut(usize, usize) -> bool,
{
    if n < 3 {
        return None;
    }
    'start: for i in 0..n {
        let mut a = prev_mod(i, n);
        let mut b = next_mod(i, n);
        for j in 2..n {
            if !is_visible(a, b) {
                continue 'start;
            }
            if j % 2 == 0 {
                a = prev_mod(a, n);
            } else {
                b = next_mod(b, n);
            }
        }
        if a == b {
            return Some(i);
        }
    }
    None
}

/// Vertex order of the strip starting at `i`.
pub fn make_single_strip(i: usize, n: usize) -> Vec<usize> {
    debug_assert!(i < n && n >= 3);
    let mut order = Vec::with_capacity(n);
    let mut a = prev_mod(i, n);
    let mut b = next_mod(i, n);
    order.extend([i, a, b]);
    for j in 2..(n - 1) {
        if j % 2 == 0 {
            a = prev_mod(a, n);
            order.push(a);
        } else {
            b = next_mod(b, n);
            order.push(b);
        }
    }
    order
}

/// Expand a strip into an explicit triangle list with consistent winding.
pub fn strip_to_triangles(strip: &[Coord<f64>], out: &mut Vec<Coord<f64>>) {
    for k in 2..strip.len() {
        if k % 2 == 0 {
            out.extend([strip[k - 2], strip[k - 1], strip[k]]);
        } else {
            out.extend([strip[k - 1], strip[k - 2], strip[k]]);
        }
    }
}

/// Strip state for one area feature.
///
/// `inner` turns false when a strip attempt fails; the hull fallback resets
/// it with [`set_inner`](Self::set_inner) before retrying.
#[derive(Debug)]
pub struct StripBuilder {
    inner: bool,
    strip: Vec<Coord<f64>>,
    max_triangles: usize,
}

impl StripBuilder {
    pub fn new(max_triangles: Option<usize>) -> Self {
        Self {
            inner: true,
            strip: Vec::new(),
            max_triangles: max_triangles.unwrap_or(usize::MAX),
        }
    }

    /// Clear state for the next feature.
    pub fn reset(&mut self) {
        self.inner = true;
        self.strip.clear();
    }

    /// Allow another strip attempt after a failure.
    pub fn set_inner(&mut self) {
        self.inner = true;
        self.strip.clear();
    }

    /// True while no complete strip has been produced.
    pub fn need_process_triangles(&self) -> bool {
        !self.inner || self.strip.is_empty()
    }

    /// The strip vertices in strip order.
    pub fn strip(&self) -> &[Coord<f64>] {
        &self.strip
    }

    /// Try to decompose `points` (ring without closing point) into one strip.
    ///
    /// May reverse `points` in place to make the ring counter-clockwise.
    pub fn try_make_strip(&mut self, points: &mut [Coord<f64>]) -> bool {
        let count = points.len();
        if !self.inner || count < 3 || count - 2 > self.max_triangles {
            self.inner = false;
            return false;
        }
        if has_self_intersections(points) {
            self.inner = false;
            return false;
        }

        if signed_area(points) < 0.0 {
            points.reverse();
        }

        let start = match find_single_strip(count, |a, b| is_diagonal_visible(points, a, b)) {
            Some(start) => start,
            None => {
                self.inner = false;
                return false;
            }
        };

        self.strip.clear();
        self.strip
            .extend(make_single_strip(start, count).into_iter().map(|i| points[i]));
        debug_assert_eq!(self.strip.len(), count);
        true
    }
}
