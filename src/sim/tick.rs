//! Fixed timestep simulation tick
//!
//! Phase order within a tick is fixed: winch, slope physics, fuel and
//! stamina, snow quality decay, grooming, avalanche risk, wildlife, and
//! finally progress checks. Each phase is the only writer of its data.

use super::hazard::HazardSignals;
use super::physics::{DriveInput, PhysicsOutcome, Terrain, step_vehicle};
use super::state::{GameEvent, GamePhase, GameState};
use super::winch::WinchEvent;
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::level::BuildingKind;
use crate::{heading_of, normalize_angle};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInput {
    /// -1 (reverse) to 1 (full forward)
    pub throttle: f32,
    /// -1 (left) to 1 (right)
    pub steer: f32,
    /// Raise or lower the tiller
    pub groom_toggle: bool,
    /// Hook up to the nearest anchor, or let the cable go
    pub winch_toggle: bool,
    /// Pause toggle
    pub pause: bool,
    /// Start the level over
    pub restart: bool,
    /// Demo mode - the groomer drives itself
    pub autopilot: bool,
}

impl TickInput {
    /// Same held controls with the one-shot toggles cleared
    pub fn held(&self) -> Self {
        Self {
            groom_toggle: false,
            winch_toggle: false,
            pause: false,
            restart: false,
            ..self.clone()
        }
    }
}

/// Advance the game state by one timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.restart {
        state.restart();
        return;
    }

    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                return;
            }
            GamePhase::Paused => state.phase = GamePhase::Playing,
            _ => {}
        }
    }

    // Don't tick unless playing
    if state.phase != GamePhase::Playing {
        return;
    }

    let mut input = input.clone();
    if input.autopilot {
        autopilot(state, &mut input);
    }

    state.time_ticks += 1;
    state.elapsed_secs += dt;

    if input.groom_toggle {
        state.vehicle.grooming = !state.vehicle.grooming;
    }

    update_winch(state, &input, dt);
    update_vehicle(state, &input, dt);
    update_resources(state, &input, dt);
    let newly_groomed = update_coverage(state, dt);
    update_hazard(state, newly_groomed, dt);

    // Wildlife last: it reacts to where the vehicle ended up
    let vehicle_pos = state.vehicle.pos;
    state
        .wildlife
        .update(dt, vehicle_pos, &state.level.geometry, &mut state.events);

    check_progress(state);
}

fn push_winch_event(state: &mut GameState, event: WinchEvent) {
    state.events.push(match event {
        WinchEvent::Attached {
            anchor_id,
            use_count,
        } => GameEvent::WinchAttached {
            anchor_id,
            use_count,
        },
        WinchEvent::Detached { anchor_id, reason } => GameEvent::WinchDetached { anchor_id, reason },
    });
}

/// Runs before physics, against the position the tick started from
fn update_winch(state: &mut GameState, input: &TickInput, dt: f32) {
    let pos = state.vehicle.pos;

    if input.winch_toggle {
        if state.winch.is_detached() {
            let attached = state
                .winch
                .try_attach(pos, state.vehicle.fuel, &state.level.geometry.anchors);
            if let Some(anchor_id) = attached {
                state.events.push(GameEvent::WinchAttaching { anchor_id });
            }
        } else if let Some(event) = state.winch.release() {
            push_winch_event(state, event);
        }
    }

    if let Some(event) = state.winch.update(pos, &state.level.geometry.anchors, dt) {
        push_winch_event(state, event);
    }
}

fn update_vehicle(state: &mut GameState, input: &TickInput, dt: f32) {
    let geometry = &state.level.geometry;
    let pos = state.vehicle.pos;
    let terrain = Terrain {
        slope: geometry.slope_at(pos),
        surface: state.coverage.surface_at(pos, geometry),
    };
    let pull = state.winch.pull_direction(pos, &geometry.anchors);
    let drive = DriveInput {
        throttle: input.throttle,
        steer: input.steer,
    };

    match step_vehicle(&mut state.vehicle, drive, terrain, pull, geometry, &state.tuning, dt) {
        PhysicsOutcome::Tumbled => {
            state.tumble_count += 1;
            log::info!(
                "groomer tumbled at ({:.0}, {:.0}) on a {:.1} degree slope",
                pos.x,
                pos.y,
                terrain.slope.degrees
            );
            state.events.push(GameEvent::Tumble {
                pos,
                slope_degrees: terrain.slope.degrees,
            });
        }
        PhysicsOutcome::Recovered => {
            state.events.push(GameEvent::TumbleRecovered {
                pos: state.vehicle.pos,
            });
        }
        PhysicsOutcome::Moving | PhysicsOutcome::Recovering => {}
    }
}

/// Fuel burn, driver fatigue, and top-ups at service buildings
fn update_resources(state: &mut GameState, input: &TickInput, dt: f32) {
    let tuning = &state.tuning;
    let geometry = &state.level.geometry;
    let vehicle = &mut state.vehicle;

    let mut burn = tuning.fuel_idle_burn;
    if !vehicle.tumbled {
        burn += input.throttle.abs().min(1.0) * tuning.fuel_throttle_burn;
        if vehicle.grooming {
            burn += tuning.fuel_groom_burn;
        }
    }
    if state.winch.is_active() {
        burn += tuning.fuel_winch_burn;
    }
    vehicle.fuel = (vehicle.fuel - burn * dt).max(0.0);
    vehicle.stamina = (vehicle.stamina - tuning.stamina_drain_per_second * dt).max(0.0);

    if vehicle.speed() < tuning.stationary_speed {
        let pos = vehicle.pos;
        let near = |kind: BuildingKind| {
            geometry
                .building_in_range(pos, kind, tuning.service_radius)
                .is_some()
        };
        if near(BuildingKind::FuelStation) {
            vehicle.fuel = (vehicle.fuel + tuning.refuel_per_second * dt).min(tuning.fuel_max);
        }
        if near(BuildingKind::Chalet) {
            vehicle.stamina = (vehicle.stamina + tuning.rest_per_second * dt).min(tuning.stamina_max);
        }
    }
}

/// Quality decay first, then the tiller marks fresh cells
fn update_coverage(state: &mut GameState, dt: f32) -> u32 {
    state
        .coverage
        .quality_decay(state.tuning.quality_decay_rate_per_second, dt);

    let vehicle = &state.vehicle;
    if !vehicle.grooming || vehicle.tumbled || vehicle.fuel <= 0.0 {
        return 0;
    }
    let groomed = state
        .coverage
        .mark_covered(vehicle.pos, state.tuning.groom_radius);
    state.score += u64::from(groomed);
    groomed
}

fn update_hazard(state: &mut GameState, newly_groomed: u32, dt: f32) {
    let geometry = &state.level.geometry;
    let vehicle = &state.vehicle;
    let winch_anchor = if state.winch.is_active() {
        state.winch.anchor_id()
    } else {
        None
    };
    let signals = HazardSignals {
        pos: vehicle.pos,
        speed: vehicle.speed(),
        slope_degrees: geometry.slope_at(vehicle.pos).degrees,
        newly_groomed,
        winch_anchor,
    };
    state
        .hazard
        .accumulate(dt, &geometry.hazard_zones, &signals);

    if let Some(trigger) = state.hazard.resolve() {
        state.phase = GamePhase::GameOver {
            reason: trigger.reason,
        };
        state.events.push(GameEvent::HazardTriggered {
            zone_id: trigger.zone_id,
            reason: trigger.reason,
        });
    }
}

/// Coverage milestones and the win condition
fn check_progress(state: &mut GameState) {
    let ratio = state.coverage.coverage_ratio();
    let milestones = &state.tuning.coverage_milestones;
    while let Some(&threshold) = milestones.get(state.milestones_reached) {
        if ratio < threshold {
            break;
        }
        state.milestones_reached += 1;
        log::debug!("coverage milestone {threshold:.2} reached ({ratio:.3})");
        state
            .events
            .push(GameEvent::CoverageMilestone { threshold, ratio });
    }

    if state.phase == GamePhase::Playing && ratio >= state.level.target_coverage {
        state.phase = GamePhase::LevelComplete;
        log::info!(
            "level '{}' complete: {:.1}% in {:.1}s",
            state.level.name,
            ratio * 100.0,
            state.elapsed_secs
        );
        state.events.push(GameEvent::LevelComplete {
            coverage: ratio,
            elapsed_secs: state.elapsed_secs,
        });
    }
}

/// Greedy demo driver: tiller down, head for the closest ungroomed cell
fn autopilot(state: &GameState, input: &mut TickInput) {
    let vehicle = &state.vehicle;
    if !vehicle.grooming {
        input.groom_toggle = true;
    }
    let Some(target) = state.coverage.nearest_ungroomed(vehicle.pos) else {
        input.throttle = 0.0;
        input.steer = 0.0;
        return;
    };
    let desired = heading_of(target - vehicle.pos, vehicle.heading);
    let error = normalize_angle(desired - vehicle.heading);
    input.steer = (error * 2.0).clamp(-1.0, 1.0);
    input.throttle = if error.abs() < 0.6 { 1.0 } else { 0.3 };
}

/// Turns variable frame times into whole simulation steps
///
/// Leftover time carries into the next frame. After a long stall at most
/// [`MAX_SUBSTEPS`] steps run and the backlog is dropped.
#[derive(Debug, Clone, Default)]
pub struct FixedStepper {
    accumulator: f32,
}

impl FixedStepper {
    /// Run as many ticks as `frame_dt` covers; returns how many ran.
    /// One-shot toggles in `input` apply to the first tick only.
    pub fn advance(&mut self, state: &mut GameState, input: &TickInput, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.max(0.0);
        let held = input.held();
        let mut steps = 0;
        while self.accumulator >= SIM_DT && steps < MAX_SUBSTEPS {
            tick(state, if steps == 0 { input } else { &held }, SIM_DT);
            self.accumulator -= SIM_DT;
            steps += 1;
        }
        if steps == MAX_SUBSTEPS && self.accumulator >= SIM_DT {
            log::debug!("dropping {:.3}s of simulation backlog", self.accumulator);
            self.accumulator = 0.0;
        }
        steps
    }

    /// Fraction of a step waiting in the accumulator, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / SIM_DT
    }
}
