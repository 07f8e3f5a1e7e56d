//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by id)
//! - No rendering or platform dependencies

pub mod collision;
pub mod coverage;
pub mod hazard;
pub mod physics;
pub mod state;
pub mod tick;
pub mod wildlife;
pub mod winch;

pub use collision::{CollisionResult, clamp_to_drivable, push_out_of_obstacles, reflect_velocity};
pub use coverage::{CoverageField, Surface, TerrainCell};
pub use hazard::{HazardSignals, HazardState, HazardSystem, HazardTrigger, ZoneRisk};
pub use physics::{DriveInput, PhysicsOutcome, Terrain, step_vehicle};
pub use state::{GameEvent, GameOverReason, GamePhase, GameState, Snapshot, Vehicle};
pub use tick::{FixedStepper, TickInput, tick};
pub use wildlife::{Agent, AgentState, AgentStateKind, Species, WildlifeSystem};
pub use winch::{Cable, DetachReason, WinchEvent, WinchState, WinchSystem};
