//! Level definitions
//!
//! A level arrives as a [`LevelDef`] (usually JSON), is validated once, and
//! becomes an immutable [`Level`]. Authoring mistakes are reported here, at
//! load time, so the simulation never has to tolerate them at runtime.

pub mod generate;
pub mod geometry;
pub mod shapes;

pub use generate::{Rank, generate_level, seed_from_str};
pub use geometry::{
    AccessPath, Anchor, Building, BuildingKind, CliffSegment, GridSpec, HazardZone,
    LevelGeometry, Side, Slope, SpawnArea, SteepZone,
};
pub use shapes::{Boundary, Polygon, Rect, Region};

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::TILE_SIZE;
use crate::objectives::BonusObjective;

/// Load-time contract violations
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid level dimensions: {0}")]
    InvalidDimensions(&'static str),
    #[error("{0} polygon needs at least 3 points and a non-zero area")]
    InvalidPolygon(String),
    #[error("{0} rectangle is empty or not finite")]
    InvalidRect(String),
    #[error("{0} lies outside the level bounds")]
    OutOfBounds(String),
    #[error("duplicate anchor id {0}")]
    DuplicateAnchor(u32),
    #[error("duplicate hazard zone id {0}")]
    DuplicateZone(u32),
    #[error("hazard zone {zone} references unknown anchor {anchor}")]
    UnknownAnchor { zone: u32, anchor: u32 },
    #[error("vehicle start {0} is not on the piste or an access path")]
    StartNotDrivable(Vec2),
    #[error("level has no groomable cells")]
    NoGroomableCells,
    #[error("invalid level value: {0}")]
    InvalidValue(&'static str),
    #[error("invalid tuning: {0}")]
    InvalidTuning(&'static str),
}

/// Serialized level description
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDef {
    pub name: String,
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    pub piste: Polygon,
    #[serde(default)]
    pub base_slope_degrees: f32,
    #[serde(default)]
    pub steep_zones: Vec<SteepZone>,
    #[serde(default)]
    pub cliffs: Vec<CliffSegment>,
    #[serde(default)]
    pub access_paths: Vec<AccessPath>,
    #[serde(default)]
    pub buildings: Vec<Building>,
    #[serde(default)]
    pub anchors: Vec<Anchor>,
    #[serde(default)]
    pub hazard_zones: Vec<HazardZone>,
    #[serde(default)]
    pub wildlife: Vec<SpawnArea>,
    pub vehicle_start: Vec2,
    /// Facing at spawn (radians); defaults to uphill
    #[serde(default = "default_heading")]
    pub start_heading: f32,
    #[serde(default = "default_target_coverage")]
    pub target_coverage: f32,
    #[serde(default = "default_par_time")]
    pub par_time_secs: f32,
    #[serde(default)]
    pub bonus_objectives: Vec<BonusObjective>,
}

fn default_tile_size() -> f32 {
    TILE_SIZE
}

fn default_heading() -> f32 {
    -std::f32::consts::FRAC_PI_2
}

fn default_target_coverage() -> f32 {
    0.8
}

fn default_par_time() -> f32 {
    180.0
}

impl LevelDef {
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A validated level
#[derive(Debug, Clone)]
pub struct Level {
    pub name: String,
    pub geometry: LevelGeometry,
    pub vehicle_start: Vec2,
    pub start_heading: f32,
    pub target_coverage: f32,
    pub par_time_secs: f32,
    pub bonus_objectives: Vec<BonusObjective>,
}

impl Level {
    /// Parse and validate in one go
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        Self::from_def(LevelDef::from_json(json)?)
    }

    /// Validate a definition; fails fast on the first authoring error
    pub fn from_def(def: LevelDef) -> Result<Self, LevelError> {
        if def.width == 0 || def.height == 0 {
            return Err(LevelError::InvalidDimensions("width and height must be non-zero"));
        }
        if !(def.tile_size > 0.0 && def.tile_size.is_finite()) {
            return Err(LevelError::InvalidDimensions("tileSize must be positive"));
        }
        let grid = GridSpec {
            origin: Vec2::ZERO,
            cell_size: def.tile_size,
            cols: def.width,
            rows: def.height,
        };
        let bounds = grid.bounds();

        check_polygon(&def.piste, "piste".to_string(), &bounds)?;
        if !(0.0..90.0).contains(&def.base_slope_degrees) {
            return Err(LevelError::InvalidValue("baseSlopeDegrees must be in [0, 90)"));
        }
        for (i, zone) in def.steep_zones.iter().enumerate() {
            check_polygon(&zone.area, format!("steep zone {i}"), &bounds)?;
            if !(0.0..90.0).contains(&zone.slope_degrees) {
                return Err(LevelError::InvalidValue("steep zone slopeDegrees must be in [0, 90)"));
            }
        }
        for (i, cliff) in def.cliffs.iter().enumerate() {
            check_polygon(&cliff.area, format!("cliff {i}"), &bounds)?;
        }
        for (i, path) in def.access_paths.iter().enumerate() {
            check_rect(&path.rect, format!("access path {i}"), &bounds)?;
            if !(0.0..90.0).contains(&path.slope_degrees) {
                return Err(LevelError::InvalidValue("access path slopeDegrees must be in [0, 90)"));
            }
        }
        for (i, building) in def.buildings.iter().enumerate() {
            check_rect(&building.footprint, format!("building {i}"), &bounds)?;
        }
        for (i, spawn) in def.wildlife.iter().enumerate() {
            check_rect(&spawn.area, format!("wildlife area {i}"), &bounds)?;
        }

        let mut anchors = def.anchors;
        let mut anchor_ids = BTreeSet::new();
        for anchor in &anchors {
            if !anchor_ids.insert(anchor.id) {
                return Err(LevelError::DuplicateAnchor(anchor.id));
            }
            if !bounds.contains(anchor.pos) {
                return Err(LevelError::OutOfBounds(format!("anchor {}", anchor.id)));
            }
        }
        anchors.sort_by_key(|a| a.id);

        let mut hazard_zones = def.hazard_zones;
        let mut zone_ids = BTreeSet::new();
        for zone in &hazard_zones {
            if !zone_ids.insert(zone.id) {
                return Err(LevelError::DuplicateZone(zone.id));
            }
            check_polygon(&zone.area, format!("hazard zone {}", zone.id), &bounds)?;
            if !(zone.rate_scale >= 0.0 && zone.rate_scale.is_finite()) {
                return Err(LevelError::InvalidValue("hazard zone rateScale must be non-negative"));
            }
            if let Some(anchor) = zone.anchor {
                if !anchor_ids.contains(&anchor) {
                    return Err(LevelError::UnknownAnchor {
                        zone: zone.id,
                        anchor,
                    });
                }
            }
        }
        hazard_zones.sort_by_key(|z| z.id);

        if !(def.target_coverage > 0.0 && def.target_coverage <= 1.0) {
            return Err(LevelError::InvalidValue("targetCoverage must be in (0, 1]"));
        }
        if !(def.par_time_secs > 0.0) {
            return Err(LevelError::InvalidValue("parTimeSecs must be positive"));
        }

        let geometry = LevelGeometry {
            bounds,
            grid,
            piste: def.piste,
            base_slope_degrees: def.base_slope_degrees,
            steep_zones: def.steep_zones,
            cliffs: def.cliffs,
            access_paths: def.access_paths,
            buildings: def.buildings,
            anchors,
            hazard_zones,
            spawn_areas: def.wildlife,
        };

        if !geometry.is_drivable(def.vehicle_start) || geometry.is_blocked(def.vehicle_start) {
            return Err(LevelError::StartNotDrivable(def.vehicle_start));
        }
        let groomable = (0..grid.rows)
            .flat_map(|row| (0..grid.cols).map(move |col| (col, row)))
            .any(|(col, row)| geometry.is_groomable(grid.cell_center(col, row)));
        if !groomable {
            return Err(LevelError::NoGroomableCells);
        }

        log::info!(
            "Level '{}' loaded: {}x{} cells, {} anchors, {} hazard zones, {} wildlife areas",
            def.name,
            grid.cols,
            grid.rows,
            geometry.anchors.len(),
            geometry.hazard_zones.len(),
            geometry.spawn_areas.len()
        );

        Ok(Self {
            name: def.name,
            geometry,
            vehicle_start: def.vehicle_start,
            start_heading: def.start_heading,
            target_coverage: def.target_coverage,
            par_time_secs: def.par_time_secs,
            bonus_objectives: def.bonus_objectives,
        })
    }
}

fn check_polygon(poly: &Polygon, what: String, bounds: &Rect) -> Result<(), LevelError> {
    if !poly.is_valid() {
        return Err(LevelError::InvalidPolygon(what));
    }
    if !bounds.intersects(&poly.bounds()) {
        return Err(LevelError::OutOfBounds(what));
    }
    Ok(())
}

fn check_rect(rect: &Rect, what: String, bounds: &Rect) -> Result<(), LevelError> {
    if !rect.is_valid() {
        return Err(LevelError::InvalidRect(what));
    }
    if !bounds.contains_rect(rect) {
        return Err(LevelError::OutOfBounds(what));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::test_support::training_def;
    use super::*;

    #[test]
    fn test_training_level_loads() {
        let level = Level::from_def(training_def()).unwrap();
        // Anchors come back sorted
        assert_eq!(level.geometry.anchors[0].id, 1);
        assert_eq!(level.geometry.anchor(2).map(|a| a.pos.x), Some(450.0));
        assert!(level.geometry.anchor(9).is_none());
    }

    #[test]
    fn test_json_round_trip_validates() {
        let json = training_def().to_json().unwrap();
        let level = Level::from_json(&json).unwrap();
        assert_eq!(level.name, "Training");
        assert_eq!(level.geometry.hazard_zones[0].anchor, Some(1));
    }

    #[test]
    fn test_unknown_anchor_fails_fast() {
        let mut def = training_def();
        def.hazard_zones[0].anchor = Some(42);
        assert!(matches!(
            Level::from_def(def),
            Err(LevelError::UnknownAnchor { zone: 7, anchor: 42 })
        ));
    }

    #[test]
    fn test_duplicate_anchor_rejected() {
        let mut def = training_def();
        def.anchors[1].id = 2;
        assert!(matches!(Level::from_def(def), Err(LevelError::DuplicateAnchor(2))));
    }

    #[test]
    fn test_start_off_piste_rejected() {
        let mut def = training_def();
        def.vehicle_start = Vec2::new(20.0, 20.0);
        assert!(matches!(Level::from_def(def), Err(LevelError::StartNotDrivable(_))));
    }

    #[test]
    fn test_degenerate_piste_rejected() {
        let mut def = training_def();
        def.piste = Polygon::new(vec![Vec2::ZERO, Vec2::X]);
        assert!(matches!(Level::from_def(def), Err(LevelError::InvalidPolygon(_))));
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let json = r#"{
            "name": "Bunny Hill",
            "width": 10, "height": 10,
            "piste": [[16, 16], [144, 16], [144, 144], [16, 144]],
            "vehicleStart": [80, 120]
        }"#;
        let level = Level::from_json(json).unwrap();
        assert_eq!(level.geometry.grid.cell_size, TILE_SIZE);
        assert_eq!(level.target_coverage, 0.8);
        assert!(level.geometry.hazard_zones.is_empty());
    }

    #[test]
    fn test_slope_lookup() {
        let level = Level::from_def(training_def()).unwrap();
        let geo = &level.geometry;
        assert_eq!(geo.slope_at(Vec2::new(300.0, 600.0)).degrees, 12.0);
        assert_eq!(geo.slope_at(Vec2::new(300.0, 250.0)).degrees, 35.0);
        // Service road off the piste
        assert_eq!(geo.slope_at(Vec2::new(580.0, 730.0)).degrees, 6.0);
        assert_eq!(geo.slope_at(Vec2::new(300.0, 250.0)).fall_line, Vec2::Y);
    }

    #[test]
    fn test_groomable_excludes_buildings_and_roads() {
        let level = Level::from_def(training_def()).unwrap();
        let geo = &level.geometry;
        assert!(geo.is_groomable(Vec2::new(300.0, 600.0)));
        assert!(!geo.is_groomable(Vec2::new(430.0, 820.0)));
        assert!(!geo.is_groomable(Vec2::new(580.0, 730.0)));
        assert!(geo.is_drivable(Vec2::new(580.0, 730.0)));
    }

    #[test]
    fn test_building_in_range() {
        let level = Level::from_def(training_def()).unwrap();
        let geo = &level.geometry;
        assert!(
            geo.building_in_range(Vec2::new(430.0, 870.0), BuildingKind::FuelStation, 48.0)
                .is_some()
        );
        assert!(
            geo.building_in_range(Vec2::new(300.0, 500.0), BuildingKind::FuelStation, 48.0)
                .is_none()
        );
    }
}
