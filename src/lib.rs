//! Snow Groomer - piste grooming simulation core
//!
//! Core modules:
//! - `level`: Static level geometry, JSON definitions and seeded daily runs
//! - `sim`: Deterministic simulation (coverage, slope/winch physics, avalanche risk, wildlife)
//! - `tuning`: Data-driven gameplay constants
//! - `objectives`: Bonus objectives and star rating, computed from snapshots

pub mod level;
pub mod objectives;
pub mod sim;
pub mod tuning;

pub use level::{Level, LevelDef, LevelError, Rank, generate_level};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, matches the reference frame for risk rates)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Default size of one terrain tile / coverage cell, in world units
    pub const TILE_SIZE: f32 = 16.0;

    /// Collision radius of the groomer
    pub const VEHICLE_RADIUS: f32 = 12.0;
    /// Collision radius of a wildlife agent
    pub const AGENT_RADIUS: f32 = 4.0;

    /// How far a clamped point is pushed off a boundary
    pub const CLAMP_EPSILON: f32 = 0.01;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector for a heading angle (radians, 0 = +x)
#[inline]
pub fn heading_vector(heading: f32) -> Vec2 {
    Vec2::new(heading.cos(), heading.sin())
}

/// Heading angle of a direction; falls back to `fallback` for a zero-length vector
#[inline]
pub fn heading_of(dir: Vec2, fallback: f32) -> f32 {
    if dir.length_squared() <= f32::EPSILON {
        fallback
    } else {
        dir.y.atan2(dir.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-5);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_heading_of_zero_vector_uses_fallback() {
        assert_eq!(heading_of(Vec2::ZERO, 1.25), 1.25);
        assert!((heading_of(Vec2::new(0.0, 2.0), 0.0) - PI / 2.0).abs() < 1e-6);
    }
}
