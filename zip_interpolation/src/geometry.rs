use geo::{BoundingRect, LineString, Rect};

use crate::config::GeoPoint;

/// A simple closed ring. The first and last vertices do not need to be equal:
/// the sequence is treated as cyclic.
#[derive(PartialEq, Debug, Clone)]
pub struct Polygon {
    ring: Vec<GeoPoint>,
    bbox: Option<Rect<f64>>,
}

impl Polygon {
    pub fn new(ring: Vec<GeoPoint>) -> Polygon {
        let bbox = LineString::from(ring.clone()).bounding_rect();
        Polygon { ring, bbox }
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Polygon {
        Polygon::new(pairs.iter().map(|&(x, y)| GeoPoint { x, y }).collect())
    }

    pub fn ring(&self) -> &[GeoPoint] {
        &self.ring
    }

    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.bbox
    }

    /// Ray casting test. The bounding box check, if requested, never changes the outcome:
    /// a point outside the closed box has an even number of crossings.
    pub fn contains(&self, point: GeoPoint, use_bounding_box: bool) -> bool {
        if use_bounding_box && !in_box(self.bbox, point) {
            return false;
        }
        ring_contains(point, &self.ring)
    }
}

fn in_box(bbox: Option<Rect<f64>>, p: GeoPoint) -> bool {
    match bbox {
        Some(r) => p.x >= r.min().x && p.x <= r.max().x && p.y >= r.min().y && p.y <= r.max().y,
        None => false,
    }
}

/// Returns true if the point is inside the ring, using a horizontal ray towards +x.
///
/// An edge is crossed when the point's y is in (min y, max y] of the edge and the
/// intersection lies at or to the right of the point. Horizontal edges are skipped:
/// a horizontal ray never crosses them.
///
/// Points exactly on an edge may be classified either way. With this convention
/// points on a right or top edge come out inside and points on a left or bottom
/// edge come out outside.
pub fn ring_contains(point: GeoPoint, ring: &[GeoPoint]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let (x, y) = (point.x, point.y);
    let mut inside = false;
    let mut p1 = ring[n - 1];
    for &p2 in ring.iter() {
        if p1.y != p2.y && y > p1.y.min(p2.y) && y <= p1.y.max(p2.y) && x <= p1.x.max(p2.x) {
            let xinters = (y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y) + p1.x;
            if p1.x == p2.x || x <= xinters {
                inside = !inside;
            }
        }
        p1 = p2;
    }
    inside
}

/// True if the point is inside any of the parts.
pub fn any_contains(point: GeoPoint, parts: &[Polygon], use_bounding_box: bool) -> bool {
    parts.iter().any(|p| p.contains(point, use_bounding_box))
}
