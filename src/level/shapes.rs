//! Planar shapes used by level geometry
//!
//! Rectangles (buildings, access paths, spawn areas) and simple polygons
//! (piste outline, cliffs, steep zones, hazard zones). Both answer the same
//! two questions through [`Region`]: does it contain a point, and where is
//! the nearest point on its boundary.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Nearest boundary point of a region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    /// Closest point on the boundary
    pub point: Vec2,
    /// Unit normal at that point, pointing out of the region
    pub normal: Vec2,
    /// Distance from the query point to `point`
    pub distance: f32,
}

/// A closed 2D region
pub trait Region {
    fn contains(&self, p: Vec2) -> bool;
    fn nearest_boundary(&self, p: Vec2) -> Boundary;
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    /// Build from any two opposite corners
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Clamp a point into the rectangle (never wraps)
    #[inline]
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    /// Width and height are both positive and finite
    pub fn is_valid(&self) -> bool {
        let size = self.size();
        size.x > 0.0 && size.y > 0.0 && size.is_finite()
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min.x >= self.min.x
            && other.min.y >= self.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

impl Region for Rect {
    fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    fn nearest_boundary(&self, p: Vec2) -> Boundary {
        if self.contains(p) {
            // Inside: exit through the closest side
            let candidates = [
                (p.x - self.min.x, Vec2::NEG_X),
                (self.max.x - p.x, Vec2::X),
                (p.y - self.min.y, Vec2::NEG_Y),
                (self.max.y - p.y, Vec2::Y),
            ];
            let (distance, normal) = candidates
                .into_iter()
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .unwrap_or((0.0, Vec2::X));
            Boundary {
                point: p + normal * distance,
                normal,
                distance,
            }
        } else {
            let point = self.clamp(p);
            let offset = p - point;
            Boundary {
                point,
                normal: offset.normalize_or_zero(),
                distance: offset.length(),
            }
        }
    }
}

/// Simple polygon (no self-intersections), either winding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    points: Vec<Vec2>,
}

impl Polygon {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Shoelace area; positive for counter-clockwise winding (y-up convention)
    pub fn signed_area(&self) -> f32 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        sum * 0.5
    }

    /// At least three finite points enclosing a non-zero area
    pub fn is_valid(&self) -> bool {
        self.points.len() >= 3
            && self.points.iter().all(|p| p.is_finite())
            && self.signed_area().abs() > f32::EPSILON
    }

    /// Axis-aligned bounding box
    pub fn bounds(&self) -> Rect {
        let mut min = Vec2::splat(f32::MAX);
        let mut max = Vec2::splat(f32::MIN);
        for p in &self.points {
            min = min.min(*p);
            max = max.max(*p);
        }
        Rect { min, max }
    }

    /// Average of the vertices (inside for convex shapes)
    pub fn vertex_centroid(&self) -> Vec2 {
        if self.points.is_empty() {
            return Vec2::ZERO;
        }
        self.points.iter().copied().sum::<Vec2>() / self.points.len() as f32
    }

    fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }
}

/// Closest point to `p` on segment `a`-`b`
#[inline]
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

impl Region for Polygon {
    /// Even-odd ray cast
    fn contains(&self, p: Vec2) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    fn nearest_boundary(&self, p: Vec2) -> Boundary {
        let winding = self.signed_area().signum();
        let mut best = Boundary {
            point: p,
            normal: Vec2::ZERO,
            distance: f32::MAX,
        };
        for (a, b) in self.edges() {
            let q = closest_point_on_segment(p, a, b);
            let d = p.distance(q);
            if d < best.distance {
                let edge = b - a;
                let normal = (Vec2::new(edge.y, -edge.x) * winding).normalize_or_zero();
                best = Boundary {
                    point: q,
                    normal,
                    distance: d,
                };
            }
        }
        best
    }
}

impl From<Rect> for Polygon {
    fn from(rect: Rect) -> Self {
        Self::new(vec![
            rect.min,
            Vec2::new(rect.max.x, rect.min.y),
            rect.max,
            Vec2::new(rect.min.x, rect.max.y),
        ])
    }
}
