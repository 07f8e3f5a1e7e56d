//! Game state and core simulation types
//!
//! Everything one session mutates lives in [`GameState`]: the vehicle, the
//! four subsystems, phase and counters, plus the queue of events raised
//! since the caller last drained it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::coverage::CoverageField;
use super::hazard::HazardSystem;
use super::winch::{Cable, DetachReason, WinchSystem};
use super::wildlife::{AgentStateKind, Species, WildlifeSystem};
use crate::heading_vector;
use crate::level::{Level, LevelError};
use crate::tuning::Tuning;

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum GamePhase {
    /// Active grooming
    Playing,
    /// Simulation frozen by the driver
    Paused,
    /// Coverage target reached
    LevelComplete,
    /// Session ended
    GameOver { reason: GameOverReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameOverReason {
    Avalanche,
}

/// The groomer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub pos: Vec2,
    /// Radians, 0 = +x, -pi/2 = uphill
    pub heading: f32,
    pub vel: Vec2,
    pub fuel: f32,
    pub stamina: f32,
    /// Tiller down
    pub grooming: bool,
    pub tumbled: bool,
    /// Seconds left until a tumbled vehicle is back on its tracks
    pub tumble_timer: f32,
    /// Seconds after a recovery during which the vehicle can't tumble again
    #[serde(default)]
    pub tumble_grace: f32,
}

impl Vehicle {
    pub fn new(pos: Vec2, heading: f32, tuning: &Tuning) -> Self {
        Self {
            pos,
            heading,
            vel: Vec2::ZERO,
            fuel: tuning.fuel_max,
            stamina: tuning.stamina_max,
            grooming: false,
            tumbled: false,
            tumble_timer: 0.0,
            tumble_grace: 0.0,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Direction of travel; the heading when standing still
    pub fn travel_direction(&self) -> Vec2 {
        self.vel
            .try_normalize()
            .unwrap_or_else(|| heading_vector(self.heading))
    }
}

/// Discrete things that happened during a tick, for audio, visuals and UI
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GameEvent {
    #[serde(rename_all = "camelCase")]
    CoverageMilestone { threshold: f32, ratio: f32 },
    #[serde(rename_all = "camelCase")]
    LevelComplete { coverage: f32, elapsed_secs: f32 },
    #[serde(rename_all = "camelCase")]
    WinchAttaching { anchor_id: u32 },
    #[serde(rename_all = "camelCase")]
    WinchAttached { anchor_id: u32, use_count: u32 },
    #[serde(rename_all = "camelCase")]
    WinchDetached { anchor_id: u32, reason: DetachReason },
    #[serde(rename_all = "camelCase")]
    HazardTriggered { zone_id: u32, reason: GameOverReason },
    #[serde(rename_all = "camelCase")]
    Tumble { pos: Vec2, slope_degrees: f32 },
    TumbleRecovered { pos: Vec2 },
    #[serde(rename_all = "camelCase")]
    AgentSpawned { agent_id: u32, species: Species, pos: Vec2 },
    #[serde(rename_all = "camelCase")]
    AgentStateChanged {
        agent_id: u32,
        species: Species,
        from: AgentStateKind,
        to: AgentStateKind,
    },
    /// Agent moved into grid cell (`col`, `row`)
    #[serde(rename_all = "camelCase")]
    AgentTrack {
        agent_id: u32,
        species: Species,
        col: u32,
        row: u32,
    },
    #[serde(rename_all = "camelCase")]
    AgentRemoved { agent_id: u32, species: Species },
    Restarted { count: u32 },
}

/// Per-tick view for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub tick: u64,
    pub elapsed_secs: f32,
    pub phase: GamePhase,
    pub position: Vec2,
    pub heading: f32,
    pub speed: f32,
    pub fuel: f32,
    pub fuel_max: f32,
    pub stamina: f32,
    pub stamina_max: f32,
    pub grooming: bool,
    pub coverage_ratio: f32,
    pub target_coverage: f32,
    pub mean_quality: f32,
    pub winch_active: bool,
    pub cable: Option<Cable>,
    pub winch_use_count: u32,
    pub tumbled: bool,
    pub tumble_count: u32,
    pub hazard_triggered: bool,
    pub max_risk: f32,
    pub agent_count: usize,
    pub restart_count: u32,
}

/// One grooming session on one level
#[derive(Debug, Clone)]
pub struct GameState {
    /// Session seed for reproducibility
    pub seed: u64,
    pub level: Level,
    pub tuning: Tuning,
    pub vehicle: Vehicle,
    pub coverage: CoverageField,
    pub winch: WinchSystem,
    pub hazard: HazardSystem,
    pub wildlife: WildlifeSystem,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub elapsed_secs: f32,
    pub tumble_count: u32,
    pub restart_count: u32,
    /// Total cells groomed this run
    pub score: u64,
    /// Coverage milestones already announced
    pub(crate) milestones_reached: usize,
    pub(crate) events: Vec<GameEvent>,
}

impl GameState {
    /// Start a session. Fails only if `tuning` is invalid; the level was
    /// validated when it was loaded.
    pub fn new(level: Level, tuning: Tuning, seed: u64) -> Result<Self, LevelError> {
        tuning.validate()?;
        let vehicle = Vehicle::new(level.vehicle_start, level.start_heading, &tuning);
        let coverage = CoverageField::new(&level.geometry);
        let winch = WinchSystem::new(&tuning);
        let hazard = HazardSystem::new(&level.geometry.hazard_zones, &tuning);
        let wildlife = WildlifeSystem::new(&level.geometry, &tuning, seed);
        log::info!(
            "session start: level '{}' seed {seed}, {} groomable cells, {} agents",
            level.name,
            coverage.groomable_count(),
            wildlife.agents().len()
        );
        Ok(Self {
            seed,
            level,
            tuning,
            vehicle,
            coverage,
            winch,
            hazard,
            wildlife,
            phase: GamePhase::Playing,
            time_ticks: 0,
            elapsed_secs: 0.0,
            tumble_count: 0,
            restart_count: 0,
            score: 0,
            milestones_reached: 0,
            events: Vec::new(),
        })
    }

    /// Restart the level
    ///
    /// Coverage, hazard risk, winch and wildlife are rebuilt together before
    /// any of them is swapped in, so the state is never half reset.
    pub fn restart(&mut self) {
        let geometry = &self.level.geometry;
        let mut coverage = self.coverage.clone();
        coverage.reset();
        let mut hazard = self.hazard.clone();
        hazard.reset();
        let mut winch = self.winch.clone();
        winch.reset();
        let mut wildlife = self.wildlife.clone();
        wildlife.reset(geometry);
        let vehicle = Vehicle::new(self.level.vehicle_start, self.level.start_heading, &self.tuning);

        self.coverage = coverage;
        self.hazard = hazard;
        self.winch = winch;
        self.wildlife = wildlife;
        self.vehicle = vehicle;
        self.phase = GamePhase::Playing;
        self.time_ticks = 0;
        self.elapsed_secs = 0.0;
        self.tumble_count = 0;
        self.score = 0;
        self.milestones_reached = 0;
        self.restart_count += 1;
        self.events.clear();
        self.events.push(GameEvent::Restarted {
            count: self.restart_count,
        });
        log::info!("level '{}' restarted ({})", self.level.name, self.restart_count);
    }

    pub fn snapshot(&self) -> Snapshot {
        let anchors = &self.level.geometry.anchors;
        Snapshot {
            tick: self.time_ticks,
            elapsed_secs: self.elapsed_secs,
            phase: self.phase,
            position: self.vehicle.pos,
            heading: self.vehicle.heading,
            speed: self.vehicle.speed(),
            fuel: self.vehicle.fuel,
            fuel_max: self.tuning.fuel_max,
            stamina: self.vehicle.stamina,
            stamina_max: self.tuning.stamina_max,
            grooming: self.vehicle.grooming,
            coverage_ratio: self.coverage.coverage_ratio(),
            target_coverage: self.level.target_coverage,
            mean_quality: self.coverage.mean_quality(),
            winch_active: self.winch.is_active(),
            cable: self.winch.cable(self.vehicle.pos, anchors),
            winch_use_count: self.winch.use_count(),
            tumbled: self.vehicle.tumbled,
            tumble_count: self.tumble_count,
            hazard_triggered: self.hazard.is_triggered(),
            max_risk: self.hazard.max_risk(),
            agent_count: self.wildlife.agents().len(),
            restart_count: self.restart_count,
        }
    }

    /// Events raised since the last drain
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    #[inline]
    pub fn is_over(&self) -> bool {
        matches!(self.phase, GamePhase::GameOver { .. } | GamePhase::LevelComplete)
    }
}
