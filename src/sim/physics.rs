//! Slope physics for the groomer
//!
//! One call advances the vehicle by `dt`: tumble check, steering, thrust
//! scaled by surface traction, gravity on slopes the tracks can't hold,
//! winch pull, drag, then the sliding clamp against level geometry.

use glam::Vec2;

use super::collision::resolve_vehicle;
use super::coverage::Surface;
use super::state::Vehicle;
use crate::consts::TILE_SIZE;
use crate::level::{LevelGeometry, Slope};
use crate::tuning::Tuning;
use crate::{heading_of, heading_vector, normalize_angle};

/// Search step when looking for ground to recover on
const RECOVERY_STEP: f32 = TILE_SIZE * 0.5;

/// Driver controls for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveInput {
    /// -1 (reverse) to 1 (full forward)
    pub throttle: f32,
    /// -1 (left) to 1 (right)
    pub steer: f32,
}

/// Terrain under the vehicle at the start of the step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Terrain {
    pub slope: Slope,
    pub surface: Surface,
}

/// What happened to the vehicle this step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsOutcome {
    Moving,
    /// Slope exceeded the tumble threshold this step
    Tumbled,
    /// Still immobile after a tumble
    Recovering,
    /// Recovery finished; heading reset uphill
    Recovered,
}

/// Advance the vehicle one step
///
/// `winch_pull` is the unit direction from the vehicle to its anchor while
/// the winch is attached. An attached winch holds the vehicle on slopes that
/// would otherwise tumble it.
pub fn step_vehicle(
    vehicle: &mut Vehicle,
    input: DriveInput,
    terrain: Terrain,
    winch_pull: Option<Vec2>,
    geometry: &LevelGeometry,
    tuning: &Tuning,
    dt: f32,
) -> PhysicsOutcome {
    let slope = terrain.slope;

    if vehicle.tumbled {
        vehicle.vel = Vec2::ZERO;
        vehicle.tumble_timer -= dt;
        if vehicle.tumble_timer > 0.0 {
            return PhysicsOutcome::Recovering;
        }
        vehicle.tumbled = false;
        vehicle.tumble_timer = 0.0;
        vehicle.tumble_grace = tuning.tumble_recovery_secs;
        if let Some(spot) = recovery_spot(geometry, vehicle.pos, slope, tuning.max_climb_slope_degrees) {
            vehicle.pos = spot;
        }
        vehicle.heading = heading_of(slope.uphill(), vehicle.heading);
        return PhysicsOutcome::Recovered;
    }

    vehicle.tumble_grace = (vehicle.tumble_grace - dt).max(0.0);
    if slope.degrees > tuning.tumble_slope_degrees
        && winch_pull.is_none()
        && vehicle.tumble_grace <= 0.0
    {
        vehicle.tumbled = true;
        vehicle.tumble_timer = tuning.tumble_recovery_secs;
        vehicle.vel = Vec2::ZERO;
        return PhysicsOutcome::Tumbled;
    }

    let throttle = input.throttle.clamp(-1.0, 1.0);
    let steer = input.steer.clamp(-1.0, 1.0);
    vehicle.heading = normalize_angle(vehicle.heading + steer * tuning.turn_rate * dt);
    let forward = heading_vector(vehicle.heading);

    let mut power = tuning.traction.get(terrain.surface);
    if vehicle.fuel <= 0.0 {
        power *= tuning.empty_fuel_power;
    }
    if vehicle.stamina <= 0.0 {
        power *= tuning.exhausted_power;
    }

    let mut thrust = forward * throttle * tuning.engine_accel * power;
    let mut accel = Vec2::ZERO;

    if slope.degrees > tuning.max_climb_slope_degrees {
        // Tracks can't climb this; only gravity and the winch act along the fall line
        let uphill = slope.uphill();
        let climb = thrust.dot(uphill);
        if climb > 0.0 {
            thrust -= uphill * climb;
        }
        accel += slope.fall_line * tuning.gravity * slope.radians().sin();
    }
    accel += thrust;

    if let Some(pull) = winch_pull {
        accel += pull * tuning.winch_force;
    }

    let mut vel = vehicle.vel + accel * dt;
    let drag = (1.0 - tuning.friction.get(terrain.surface) * dt).max(0.0);
    vel = (vel * drag).clamp_length_max(tuning.max_speed);

    let (pos, vel) = resolve_vehicle(geometry, vehicle.pos + vel * dt, vel);
    vehicle.pos = pos;
    vehicle.vel = vel;

    PhysicsOutcome::Moving
}

/// Nearest point along the fall line, downhill first, where the tracks hold
///
/// `None` when the whole line through `from` is too steep; the grace period
/// then lets gravity carry the vehicle off instead.
fn recovery_spot(geometry: &LevelGeometry, from: Vec2, slope: Slope, max_degrees: f32) -> Option<Vec2> {
    let reach = geometry.bounds.size().length();
    let steps = (reach / RECOVERY_STEP).ceil() as u32;
    for i in 1..=steps {
        let offset = RECOVERY_STEP * i as f32;
        for dir in [slope.fall_line, slope.uphill()] {
            let (p, _) = resolve_vehicle(geometry, from + dir * offset, Vec2::ZERO);
            if geometry.slope_at(p).degrees <= max_degrees {
                return Some(p);
            }
        }
    }
    None
}
