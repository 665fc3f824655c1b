//! Conversion between annotation objects and `geo` polygons, plus the set operations
//! the combiner needs.
//!
//! Union and intersection may produce several disjoint parts. They are reported as a
//! [`GeometryResult`] and reduced to one polygon by [`GeometryResult::select`], so the
//! choice of part lives in one place.
use std::cmp::Ordering;
use std::str::FromStr;

use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::combine::annotations::LabeledObject;
use crate::combine::combine_errors::{ConfigError, GeometryError};
use crate::utils::{Point, Rect};

/// Outcome of a polygon set operation
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryResult {
    Empty,
    Single(Polygon<f64>),
    Multi(Vec<Polygon<f64>>),
}

/// How to pick one polygon out of a multi-part result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// First usable part in the order the geometry library lists them
    #[default]
    First,
    /// Usable part with the biggest area. Earlier part wins on ties
    LargestArea,
}

impl FromStr for SelectionPolicy {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(SelectionPolicy::First),
            "largest_area" | "largest-area" | "largest" => Ok(SelectionPolicy::LargestArea),
            _ => Err(ConfigError::UnknownSelection(s.to_string())),
        }
    }
}

/// Polygon picked from a [`GeometryResult`] together with its position among the parts
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPolygon {
    pub member: usize,
    pub polygon: Polygon<f64>,
}

impl From<MultiPolygon<f64>> for GeometryResult {
    fn from(multi: MultiPolygon<f64>) -> Self {
        let mut parts = multi.0;
        match parts.len() {
            0 => GeometryResult::Empty,
            1 => GeometryResult::Single(parts.remove(0)),
            _ => GeometryResult::Multi(parts),
        }
    }
}

impl GeometryResult {
    pub fn kind(&self) -> &'static str {
        match self {
            GeometryResult::Empty => "empty",
            GeometryResult::Single(_) => "polygon",
            GeometryResult::Multi(_) => "multipolygon",
        }
    }
    pub fn parts(&self) -> &[Polygon<f64>] {
        match self {
            GeometryResult::Empty => &[],
            GeometryResult::Single(polygon) => std::slice::from_ref(polygon),
            GeometryResult::Multi(polygons) => polygons,
        }
    }
    /// Picks one simple polygon according to `policy`.
    /// Returns None when no part has at least 3 distinct vertices and a positive area.
    pub fn select(self, policy: SelectionPolicy) -> Option<SelectedPolygon> {
        let mut usable = self
            .parts()
            .iter()
            .enumerate()
            .filter(|(_, polygon)| is_usable(polygon))
            .map(|(member, polygon)| (member, polygon.unsigned_area()));
        let member = match policy {
            SelectionPolicy::First => usable.next().map(|(member, _)| member),
            SelectionPolicy::LargestArea => usable
                .fold(None, |best: Option<(usize, f64)>, (member, area)| match best {
                    Some((_, best_area)) if best_area >= area => best,
                    _ => Some((member, area)),
                })
                .map(|(member, _)| member),
        }?;
        let polygon = match self {
            GeometryResult::Empty => return None,
            GeometryResult::Single(polygon) => polygon,
            GeometryResult::Multi(mut polygons) => polygons.swap_remove(member),
        };
        Some(SelectedPolygon { member, polygon })
    }
}

fn is_usable(polygon: &Polygon<f64>) -> bool {
    // Rings are closed, so 3 distinct vertices means at least 4 coordinates
    polygon.exterior().0.len() >= 4 && polygon.unsigned_area() > 0.0
}

/// Outline of an object as a `geo` polygon.
/// Objects without explicit polygon get their bounding box as a 4-point ring.
pub fn to_polygon(object: &LabeledObject) -> Result<Polygon<f64>, GeometryError> {
    let points: Vec<Point> = match object.get_polygon() {
        Some(points) => points.to_vec(),
        None => object.get_bbox().corners().to_vec(),
    };
    points_to_polygon(&points)
}

pub fn points_to_polygon(points: &[Point]) -> Result<Polygon<f64>, GeometryError> {
    if points.len() < 3 {
        return Err(GeometryError::TooFewPoints(points.len()));
    }
    if let Some(pt) = points.iter().find(|pt| !pt.is_finite()) {
        return Err(GeometryError::NonFinite { x: pt.x, y: pt.y });
    }
    let coords: Vec<Coord<f64>> = points.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect();
    Ok(Polygon::new(LineString::from(coords), vec![]))
}

/// Exterior ring as a point list (closing vertex removed) and its enclosing box.
/// Interior rings are ignored.
pub fn from_polygon(polygon: &Polygon<f64>) -> (Vec<Point>, Rect) {
    let coords = &polygon.exterior().0;
    let open_len = match (coords.first(), coords.last()) {
        (Some(first), Some(last)) if coords.len() > 1 && first == last => coords.len() - 1,
        _ => coords.len(),
    };
    let points: Vec<Point> = coords[..open_len]
        .iter()
        .map(|c| Point::new(c.x, c.y))
        .collect();
    let bbox = Rect::enclosing(&points).unwrap_or_else(Rect::default);
    (points, bbox)
}

/// Builds a fresh object from a combination result
pub fn polygon_to_object(polygon: &Polygon<f64>) -> LabeledObject {
    let (points, _) = from_polygon(polygon);
    LabeledObject::new_with_polygon(points)
}

pub fn intersect(a: &Polygon<f64>, b: &Polygon<f64>) -> GeometryResult {
    if a == b {
        return GeometryResult::Single(a.clone());
    }
    GeometryResult::from(a.intersection(b))
}

pub fn union(a: &Polygon<f64>, b: &Polygon<f64>) -> GeometryResult {
    if a == b {
        return GeometryResult::Single(a.clone());
    }
    GeometryResult::from(a.union(b))
}

/// Intersection over Union of two polygons.
///
/// Symmetric, bounded to [0, 1]. Disjoint or zero-area inputs give 0.0.
pub fn iou(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    let (first, second) = match compare_rings(a, b) {
        Ordering::Greater => (b, a),
        _ => (a, b),
    };
    let area_first = first.unsigned_area();
    let area_second = second.unsigned_area();
    if area_first <= 0.0 || area_second <= 0.0 {
        return 0.0;
    }
    if first == second {
        return 1.0;
    }
    let inter = first.intersection(second).unsigned_area();
    if inter <= 0.0 {
        return 0.0;
    }
    let union_area = area_first + area_second - inter;
    if union_area <= 0.0 {
        return 0.0;
    }
    (inter / union_area).clamp(0.0, 1.0)
}

// Total order over exterior rings, so iou(a, b) and iou(b, a) run the exact same arithmetic
fn compare_rings(a: &Polygon<f64>, b: &Polygon<f64>) -> Ordering {
    let ring_a = &a.exterior().0;
    let ring_b = &b.exterior().0;
    ring_a
        .iter()
        .zip(ring_b.iter())
        .map(|(ca, cb)| ca.x.total_cmp(&cb.x).then(ca.y.total_cmp(&cb.y)))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or_else(|| ring_a.len().cmp(&ring_b.len()))
}
