//! Gameplay tuning constants
//!
//! Every number the simulation consumes comes from here, never from literals
//! inside the systems. Loaded from JSON (camelCase keys, missing keys fall
//! back to defaults) and validated before a session starts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::level::LevelError;
use crate::sim::coverage::Surface;
use crate::sim::wildlife::Species;

/// Per-surface multiplier table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceTable {
    pub groomed: f32,
    pub ungroomed: f32,
    pub off_piste: f32,
}

impl SurfaceTable {
    pub fn get(&self, surface: Surface) -> f32 {
        match surface {
            Surface::Groomed => self.groomed,
            Surface::Ungroomed => self.ungroomed,
            Surface::OffPiste => self.off_piste,
        }
    }

    fn all_positive(&self) -> bool {
        self.groomed > 0.0 && self.ungroomed > 0.0 && self.off_piste > 0.0
    }
}

/// What limits how often the winch can be attached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WinchBudget {
    /// Fixed number of attachments per session
    Count { uses: u32 },
    /// Attachment requires at least `reserve` fuel in the tank
    Fuel { reserve: f32 },
}

/// Species behaviour constants (radius and population cap live in their own maps)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeciesTuning {
    /// Speed while fleeing (units/s)
    pub flee_speed: f32,
    /// Speed while wandering (units/s)
    pub wander_speed: f32,
    /// Idle duration range after spawning (seconds)
    pub idle_min_secs: f32,
    pub idle_max_secs: f32,
    /// Seconds between random-walk heading changes
    pub wander_turn_secs: f32,
    /// Seconds of continuous fleeing before the agent is gone
    pub flee_secs: f32,
    /// Seconds after calming down before flee can retrigger
    pub cooldown_secs: f32,
    /// Seconds between scheduled spawns
    pub spawn_interval_secs: f32,
}

impl Default for SpeciesTuning {
    fn default() -> Self {
        Self {
            flee_speed: 80.0,
            wander_speed: 15.0,
            idle_min_secs: 1.0,
            idle_max_secs: 4.0,
            wander_turn_secs: 2.0,
            flee_secs: 4.0,
            cooldown_secs: 1.5,
            spawn_interval_secs: 8.0,
        }
    }
}

impl SpeciesTuning {
    fn for_species(species: Species) -> Self {
        let base = Self::default();
        match species {
            Species::Marmot => Self {
                flee_speed: 70.0,
                wander_speed: 10.0,
                flee_secs: 2.5,
                ..base
            },
            Species::Chamois => base,
            Species::Ibex => Self {
                flee_speed: 60.0,
                wander_speed: 12.0,
                idle_max_secs: 6.0,
                ..base
            },
            Species::Fox => Self {
                flee_speed: 90.0,
                wander_speed: 25.0,
                wander_turn_secs: 1.2,
                spawn_interval_secs: 15.0,
                ..base
            },
            Species::Ptarmigan => Self {
                flee_speed: 110.0,
                wander_speed: 8.0,
                flee_secs: 2.0,
                cooldown_secs: 1.0,
                ..base
            },
        }
    }
}

/// All tunable constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Tuning {
    // === Slope physics ===
    /// Slope beyond which an unwinched groomer tumbles
    pub tumble_slope_degrees: f32,
    /// Steepest slope the tracks can climb without the winch
    pub max_climb_slope_degrees: f32,
    /// Immobile time after a tumble
    pub tumble_recovery_secs: f32,
    /// Downhill acceleration on a vertical wall (scaled by sin of slope)
    pub gravity: f32,
    /// Full-throttle engine acceleration on groomed snow
    pub engine_accel: f32,
    pub max_speed: f32,
    /// Steering rate (radians/s)
    pub turn_rate: f32,
    /// Engine acceleration multiplier by surface
    pub traction: SurfaceTable,
    /// Velocity drag (per second) by surface
    pub friction: SurfaceTable,
    /// Engine output left when the tank is empty
    pub empty_fuel_power: f32,
    /// Engine output when the driver is out of stamina
    pub exhausted_power: f32,

    // === Winch ===
    /// Constant pull along the cable while attached
    pub winch_force: f32,
    pub winch_max_cable_length: f32,
    /// Max distance to an anchor for attaching
    pub winch_attach_radius: f32,
    pub winch_attach_secs: f32,
    pub winch_detach_secs: f32,
    pub winch_budget: WinchBudget,

    // === Coverage ===
    pub quality_decay_rate_per_second: f32,
    /// Tiller width (radius around the vehicle that gets groomed)
    pub groom_radius: f32,
    /// Coverage ratios that raise a milestone event, ascending
    pub coverage_milestones: Vec<f32>,

    // === Avalanche risk ===
    /// Risk added per reference frame while inside a zone
    pub risk_per_frame: f32,
    /// Frame rate `risk_per_frame` is expressed against
    pub risk_reference_fps: f32,
    pub risk_dwell_multiplier: f32,
    /// Stationary time in a zone before the dwell multiplier applies
    pub risk_dwell_threshold_secs: f32,
    /// Slope where risk starts scaling up
    pub risk_slope_onset_degrees: f32,
    /// Extra risk factor reached at the tumble slope
    pub risk_slope_gain: f32,
    /// Factor applied while tilling fresh snow inside a zone
    pub risk_groom_multiplier: f32,
    /// Factor applied while winched to the zone's protecting anchor
    pub risk_winch_multiplier: f32,
    pub risk_decay_per_second: f32,
    /// Below this speed the vehicle counts as stationary
    pub stationary_speed: f32,

    // === Fuel & stamina ===
    pub fuel_max: f32,
    pub stamina_max: f32,
    pub fuel_idle_burn: f32,
    pub fuel_throttle_burn: f32,
    pub fuel_groom_burn: f32,
    pub fuel_winch_burn: f32,
    pub stamina_drain_per_second: f32,
    /// Reach of fuel stations and chalets
    pub service_radius: f32,
    pub refuel_per_second: f32,
    pub rest_per_second: f32,

    // === Wildlife ===
    pub flee_detection_radius_by_species: BTreeMap<Species, f32>,
    pub population_cap_by_species: BTreeMap<Species, u32>,
    pub species: BTreeMap<Species, SpeciesTuning>,
}

fn default_flee_radius(species: Species) -> f32 {
    match species {
        Species::Marmot => 90.0,
        Species::Chamois => 150.0,
        Species::Ibex => 110.0,
        Species::Fox => 130.0,
        Species::Ptarmigan => 70.0,
    }
}

fn default_population_cap(species: Species) -> u32 {
    match species {
        Species::Marmot => 6,
        Species::Chamois => 4,
        Species::Ibex => 3,
        Species::Fox => 2,
        Species::Ptarmigan => 5,
    }
}

impl Default for Tuning {
    fn default() -> Self {
        let flee_detection_radius_by_species = Species::ALL
            .iter()
            .map(|&s| (s, default_flee_radius(s)))
            .collect();
        let population_cap_by_species = Species::ALL
            .iter()
            .map(|&s| (s, default_population_cap(s)))
            .collect();
        let species = Species::ALL
            .iter()
            .map(|&s| (s, SpeciesTuning::for_species(s)))
            .collect();

        Self {
            tumble_slope_degrees: 40.0,
            max_climb_slope_degrees: 30.0,
            tumble_recovery_secs: 2.5,
            gravity: 180.0,
            engine_accel: 140.0,
            max_speed: 110.0,
            turn_rate: 2.6,
            traction: SurfaceTable {
                groomed: 1.0,
                ungroomed: 0.7,
                off_piste: 0.45,
            },
            friction: SurfaceTable {
                groomed: 1.2,
                ungroomed: 2.0,
                off_piste: 3.5,
            },
            empty_fuel_power: 0.05,
            exhausted_power: 0.5,

            winch_force: 160.0,
            winch_max_cable_length: 320.0,
            winch_attach_radius: 40.0,
            winch_attach_secs: 0.5,
            winch_detach_secs: 0.3,
            winch_budget: WinchBudget::Fuel { reserve: 5.0 },

            quality_decay_rate_per_second: 0.002,
            groom_radius: 20.0,
            coverage_milestones: vec![0.25, 0.5, 0.75],

            risk_per_frame: 0.015,
            risk_reference_fps: 60.0,
            risk_dwell_multiplier: 2.0,
            risk_dwell_threshold_secs: 2.0,
            risk_slope_onset_degrees: 30.0,
            risk_slope_gain: 1.0,
            risk_groom_multiplier: 1.5,
            risk_winch_multiplier: 0.5,
            risk_decay_per_second: 0.01,
            stationary_speed: 4.0,

            fuel_max: 100.0,
            stamina_max: 100.0,
            fuel_idle_burn: 0.05,
            fuel_throttle_burn: 0.35,
            fuel_groom_burn: 0.15,
            fuel_winch_burn: 0.4,
            stamina_drain_per_second: 0.3,
            service_radius: 48.0,
            refuel_per_second: 20.0,
            rest_per_second: 25.0,

            flee_detection_radius_by_species,
            population_cap_by_species,
            species,
        }
    }
}

impl Tuning {
    /// Parse tuning from JSON; keys that are absent keep their defaults
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Avalanche risk added per second inside a zone (before modifiers)
    pub fn risk_rate_per_second(&self) -> f32 {
        self.risk_per_frame * self.risk_reference_fps
    }

    /// Species missing from a partial override keep their default radius
    pub fn flee_radius(&self, species: Species) -> f32 {
        self.flee_detection_radius_by_species
            .get(&species)
            .copied()
            .unwrap_or_else(|| default_flee_radius(species))
    }

    /// Species missing from a partial override keep their default cap
    pub fn population_cap(&self, species: Species) -> u32 {
        self.population_cap_by_species
            .get(&species)
            .copied()
            .unwrap_or_else(|| default_population_cap(species))
    }

    pub fn species(&self, species: Species) -> SpeciesTuning {
        self.species
            .get(&species)
            .copied()
            .unwrap_or_else(|| SpeciesTuning::for_species(species))
    }

    /// Reject values that would break the simulation's invariants
    pub fn validate(&self) -> Result<(), LevelError> {
        if !(0.0..90.0).contains(&self.tumble_slope_degrees) {
            return Err(LevelError::InvalidTuning(
                "tumbleSlopeDegrees must be in [0, 90)",
            ));
        }
        if self.max_climb_slope_degrees < 0.0
            || self.max_climb_slope_degrees > self.tumble_slope_degrees
        {
            return Err(LevelError::InvalidTuning(
                "maxClimbSlopeDegrees must be in [0, tumbleSlopeDegrees]",
            ));
        }
        if self.tumble_recovery_secs < 0.0
            || self.gravity < 0.0
            || self.engine_accel <= 0.0
            || self.max_speed <= 0.0
            || self.turn_rate < 0.0
        {
            return Err(LevelError::InvalidTuning(
                "vehicle motion constants must be non-negative, accel and speed positive",
            ));
        }
        if !self.traction.all_positive() || !self.friction.all_positive() {
            return Err(LevelError::InvalidTuning(
                "traction and friction must be positive for every surface",
            ));
        }
        if !(0.0..=1.0).contains(&self.empty_fuel_power)
            || !(0.0..=1.0).contains(&self.exhausted_power)
        {
            return Err(LevelError::InvalidTuning(
                "emptyFuelPower and exhaustedPower must be in [0, 1]",
            ));
        }
        if self.winch_force < 0.0
            || self.winch_max_cable_length <= 0.0
            || self.winch_attach_radius <= 0.0
            || self.winch_attach_radius > self.winch_max_cable_length
            || self.winch_attach_secs < 0.0
            || self.winch_detach_secs < 0.0
        {
            return Err(LevelError::InvalidTuning(
                "winch constants must be non-negative and attach radius within cable length",
            ));
        }
        if matches!(self.winch_budget, WinchBudget::Fuel { reserve } if reserve < 0.0) {
            return Err(LevelError::InvalidTuning("winch fuel reserve must be non-negative"));
        }
        if self.quality_decay_rate_per_second < 0.0 || self.groom_radius <= 0.0 {
            return Err(LevelError::InvalidTuning(
                "qualityDecayRatePerSecond must be non-negative, groomRadius positive",
            ));
        }
        if self
            .coverage_milestones
            .windows(2)
            .any(|w| w[0] >= w[1])
            || self
                .coverage_milestones
                .iter()
                .any(|m| !(0.0..=1.0).contains(m))
        {
            return Err(LevelError::InvalidTuning(
                "coverageMilestones must be strictly ascending within [0, 1]",
            ));
        }
        if self.risk_per_frame < 0.0
            || self.risk_reference_fps <= 0.0
            || self.risk_dwell_multiplier < 1.0
            || self.risk_dwell_threshold_secs < 0.0
            || self.risk_slope_gain < 0.0
            || self.risk_groom_multiplier < 0.0
            || self.risk_winch_multiplier < 0.0
            || self.risk_decay_per_second < 0.0
            || self.stationary_speed < 0.0
        {
            return Err(LevelError::InvalidTuning(
                "risk rates must be non-negative, riskDwellMultiplier at least 1",
            ));
        }
        if self.fuel_max <= 0.0 || self.stamina_max <= 0.0 {
            return Err(LevelError::InvalidTuning("fuelMax and staminaMax must be positive"));
        }
        if self.fuel_idle_burn < 0.0
            || self.fuel_throttle_burn < 0.0
            || self.fuel_groom_burn < 0.0
            || self.fuel_winch_burn < 0.0
            || self.stamina_drain_per_second < 0.0
            || self.service_radius < 0.0
            || self.refuel_per_second < 0.0
            || self.rest_per_second < 0.0
        {
            return Err(LevelError::InvalidTuning(
                "fuel and stamina rates must be non-negative",
            ));
        }
        if self
            .flee_detection_radius_by_species
            .values()
            .any(|r| *r <= 0.0)
        {
            return Err(LevelError::InvalidTuning(
                "fleeDetectionRadiusBySpecies values must be positive",
            ));
        }
        for s in self.species.values() {
            if s.flee_speed <= 0.0
                || s.wander_speed < 0.0
                || s.idle_min_secs < 0.0
                || s.idle_max_secs < s.idle_min_secs
                || s.wander_turn_secs <= 0.0
                || s.flee_secs <= 0.0
                || s.cooldown_secs < 0.0
                || s.spawn_interval_secs <= 0.0
            {
                return Err(LevelError::InvalidTuning(
                    "species speeds and timers must be positive with idleMin <= idleMax",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json(
            r#"{ "tumbleSlopeDegrees": 35.0, "riskPerFrame": 0.02,
                 "fleeDetectionRadiusBySpecies": { "Chamois": 200.0 } }"#,
        )
        .unwrap();
        assert_eq!(tuning.tumble_slope_degrees, 35.0);
        assert_eq!(tuning.risk_per_frame, 0.02);
        assert_eq!(tuning.flee_radius(Species::Chamois), 200.0);
        // Species left out of the override keep their defaults
        let defaults = Tuning::default();
        assert_eq!(tuning.flee_radius(Species::Marmot), defaults.flee_radius(Species::Marmot));
        assert_eq!(tuning.flee_radius(Species::Marmot), 90.0);
        assert_eq!(tuning.winch_force, Tuning::default().winch_force);
    }

    #[test]
    fn test_partial_population_caps_keep_other_species() {
        let tuning = Tuning::from_json(r#"{ "populationCapBySpecies": { "Fox": 0 } }"#).unwrap();
        assert_eq!(tuning.population_cap(Species::Fox), 0);
        for species in [Species::Marmot, Species::Chamois, Species::Ibex, Species::Ptarmigan] {
            assert_eq!(tuning.population_cap(species), Tuning::default().population_cap(species));
            assert!(tuning.population_cap(species) > 0);
        }
    }

    #[test]
    fn test_winch_budget_json() {
        let tuning = Tuning::from_json(r#"{ "winchBudget": { "kind": "count", "uses": 3 } }"#)
            .unwrap();
        assert_eq!(tuning.winch_budget, WinchBudget::Count { uses: 3 });
    }

    #[test]
    fn test_rejects_climb_above_tumble() {
        let tuning = Tuning {
            max_climb_slope_degrees: 50.0,
            ..Default::default()
        };
        assert!(matches!(
            tuning.validate(),
            Err(LevelError::InvalidTuning(_))
        ));
    }

    #[test]
    fn test_rejects_unsorted_milestones() {
        let tuning = Tuning {
            coverage_milestones: vec![0.5, 0.25],
            ..Default::default()
        };
        assert!(tuning.validate().is_err());
    }

    #[test]
    fn test_risk_rate_matches_reference_frame() {
        let tuning = Tuning::default();
        let per_tick = tuning.risk_rate_per_second() * crate::consts::SIM_DT;
        assert!((per_tick - 0.015).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(matches!(
            Tuning::from_json("{ not json"),
            Err(LevelError::Json(_))
        ));
    }
}
