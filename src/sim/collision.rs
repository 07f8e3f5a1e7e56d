//! Collision detection and response against level geometry
//!
//! Both the vehicle and wildlife are treated as points. Responses never
//! hard-stop a mover: positions are pushed back to the nearest legal point
//! and velocity loses only the component driving into the surface (slide),
//! or is mirrored off it (bounce).

use glam::Vec2;

use crate::consts::CLAMP_EPSILON;
use crate::level::{LevelGeometry, Rect, Region};

/// Result of a collision check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Whether a correction was needed
    pub hit: bool,
    /// Corrected (legal) position
    pub point: Vec2,
    /// Unit push direction, pointing from the surface into free space
    pub normal: Vec2,
    /// How far the original position was past the surface
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss(p: Vec2) -> Self {
        Self {
            hit: false,
            point: p,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Drop the velocity component heading into the surface, keep the tangential part
#[inline]
pub fn slide_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    let into = velocity.dot(normal);
    if into < 0.0 {
        velocity - normal * into
    } else {
        velocity
    }
}

/// Bounce only when moving into the surface
#[inline]
pub fn bounce_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    if velocity.dot(normal) < 0.0 {
        reflect_velocity(velocity, normal)
    } else {
        velocity
    }
}

/// Pull a point outside the drivable area (piste plus access paths) back
/// to the nearest drivable point
pub fn clamp_to_drivable(geometry: &LevelGeometry, p: Vec2) -> CollisionResult {
    if geometry.is_drivable(p) {
        return CollisionResult::miss(p);
    }

    let edge = geometry.piste.nearest_boundary(p);
    let mut best = CollisionResult {
        hit: true,
        point: edge.point - edge.normal * CLAMP_EPSILON,
        normal: -edge.normal,
        penetration: edge.distance,
    };

    for path in &geometry.access_paths {
        let q = path.rect.clamp(p);
        let d = p.distance(q);
        if d < best.penetration {
            best = CollisionResult {
                hit: true,
                point: q,
                normal: (q - p).normalize_or_zero(),
                penetration: d,
            };
        }
    }
    best
}

/// Push a point out of any building or cliff it ended up inside
///
/// Obstacles are resolved in declaration order; the returned normal is the
/// last push applied.
pub fn push_out_of_obstacles(geometry: &LevelGeometry, p: Vec2) -> CollisionResult {
    let mut result = CollisionResult::miss(p);
    for obstacle in geometry.obstacles() {
        if !obstacle.contains(result.point) {
            continue;
        }
        let edge = obstacle.nearest_boundary(result.point);
        result = CollisionResult {
            hit: true,
            point: edge.point + edge.normal * CLAMP_EPSILON,
            normal: edge.normal,
            penetration: result.penetration + edge.distance,
        };
    }
    result
}

/// Keep a point inside `rect`
pub fn clamp_into_rect(rect: &Rect, p: Vec2) -> CollisionResult {
    if rect.contains(p) {
        return CollisionResult::miss(p);
    }
    let q = rect.clamp(p);
    CollisionResult {
        hit: true,
        point: q,
        normal: (q - p).normalize_or_zero(),
        penetration: p.distance(q),
    }
}

/// Full vehicle response: leave obstacles, stay drivable, slide along walls
pub fn resolve_vehicle(geometry: &LevelGeometry, pos: Vec2, vel: Vec2) -> (Vec2, Vec2) {
    let mut pos = pos;
    let mut vel = vel;

    let wall = clamp_to_drivable(geometry, pos);
    if wall.hit {
        pos = wall.point;
        vel = slide_velocity(vel, wall.normal);
    }

    let hit = push_out_of_obstacles(geometry, pos);
    if hit.hit {
        pos = hit.point;
        vel = slide_velocity(vel, hit.normal);

        // An obstacle on the piste edge can push us back out; settle on the edge
        let wall = clamp_to_drivable(geometry, pos);
        if wall.hit {
            pos = wall.point;
            vel = slide_velocity(vel, wall.normal);
        }
    }
    (pos, vel)
}
