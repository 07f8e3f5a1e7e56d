//! Static level geometry
//!
//! Pure spatial data queried by every simulation system. Nothing in here
//! changes after the level is loaded.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shapes::{Polygon, Rect, Region};
use crate::sim::wildlife::Species;

/// Which piste edge a feature hugs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Service road leaving the piste; drivable, but off-piste snow and not groomable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPath {
    pub rect: Rect,
    pub side: Side,
    #[serde(default = "default_access_slope")]
    pub slope_degrees: f32,
}

fn default_access_slope() -> f32 {
    6.0
}

/// Rock band beside the piste; impassable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliffSegment {
    pub area: Polygon,
    pub side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildingKind {
    #[default]
    Hut,
    /// Refuels a stationary groomer in range
    FuelStation,
    /// Restores driver stamina in range
    Chalet,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub footprint: Rect,
    #[serde(default)]
    pub kind: BuildingKind,
}

/// Area steeper than the level's base slope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SteepZone {
    pub area: Polygon,
    pub slope_degrees: f32,
    /// Downhill direction; defaults to +y
    #[serde(default)]
    pub fall_line: Option<Vec2>,
}

/// Winch anchor point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub id: u32,
    pub pos: Vec2,
}

/// Avalanche-prone area with its own risk accumulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardZone {
    pub id: u32,
    pub area: Polygon,
    /// Multiplier on the tuning's base risk rate
    #[serde(default = "default_rate_scale")]
    pub rate_scale: f32,
    /// Anchor whose cable secures this slope (reduces accumulation while winched)
    #[serde(default)]
    pub anchor: Option<u32>,
}

fn default_rate_scale() -> f32 {
    1.0
}

/// Where a species lives and how many start on the level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnArea {
    pub species: Species,
    pub area: Rect,
    #[serde(default)]
    pub initial: u32,
}

/// Local slope: angle and unit downhill direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slope {
    pub degrees: f32,
    pub fall_line: Vec2,
}

impl Slope {
    pub fn flat() -> Self {
        Self {
            degrees: 0.0,
            fall_line: Vec2::Y,
        }
    }

    #[inline]
    pub fn radians(&self) -> f32 {
        self.degrees.to_radians()
    }

    /// Uphill unit direction
    #[inline]
    pub fn uphill(&self) -> Vec2 {
        -self.fall_line
    }
}

/// Regular grid laid over the level bounds (coverage cells, wildlife tracks)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub origin: Vec2,
    pub cell_size: f32,
    pub cols: u32,
    pub rows: u32,
}

impl GridSpec {
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    #[inline]
    pub fn index(&self, col: u32, row: u32) -> usize {
        row as usize * self.cols as usize + col as usize
    }

    /// Cell containing `p`, clamped to the grid edges
    pub fn cell_of(&self, p: Vec2) -> (u32, u32) {
        let local = (p - self.origin) / self.cell_size;
        let col = (local.x.floor().max(0.0) as u32).min(self.cols.saturating_sub(1));
        let row = (local.y.floor().max(0.0) as u32).min(self.rows.saturating_sub(1));
        (col, row)
    }

    #[inline]
    pub fn cell_center(&self, col: u32, row: u32) -> Vec2 {
        self.origin + (Vec2::new(col as f32, row as f32) + 0.5) * self.cell_size
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.origin,
            self.origin + Vec2::new(self.cols as f32, self.rows as f32) * self.cell_size,
        )
    }
}

/// Validated, immutable level geometry
#[derive(Debug, Clone)]
pub struct LevelGeometry {
    pub bounds: Rect,
    pub grid: GridSpec,
    pub piste: Polygon,
    pub base_slope_degrees: f32,
    pub steep_zones: Vec<SteepZone>,
    pub cliffs: Vec<CliffSegment>,
    pub access_paths: Vec<AccessPath>,
    pub buildings: Vec<Building>,
    /// Sorted by id
    pub anchors: Vec<Anchor>,
    /// Sorted by id
    pub hazard_zones: Vec<HazardZone>,
    pub spawn_areas: Vec<SpawnArea>,
}

impl LevelGeometry {
    /// Slope under `p`: steepest steep zone, then access path, then base slope
    pub fn slope_at(&self, p: Vec2) -> Slope {
        let steepest = self
            .steep_zones
            .iter()
            .filter(|z| z.area.contains(p))
            .max_by(|a, b| a.slope_degrees.total_cmp(&b.slope_degrees));
        if let Some(zone) = steepest {
            return Slope {
                degrees: zone.slope_degrees,
                fall_line: zone
                    .fall_line
                    .and_then(|d| d.try_normalize())
                    .unwrap_or(Vec2::Y),
            };
        }
        if !self.piste.contains(p) {
            if let Some(path) = self.access_path_at(p) {
                return Slope {
                    degrees: path.slope_degrees,
                    fall_line: Vec2::Y,
                };
            }
        }
        Slope {
            degrees: self.base_slope_degrees,
            fall_line: Vec2::Y,
        }
    }

    #[inline]
    pub fn on_piste(&self, p: Vec2) -> bool {
        self.piste.contains(p)
    }

    pub fn access_path_at(&self, p: Vec2) -> Option<&AccessPath> {
        self.access_paths.iter().find(|a| a.rect.contains(p))
    }

    /// Point is on the piste or a service road
    pub fn is_drivable(&self, p: Vec2) -> bool {
        self.on_piste(p) || self.access_path_at(p).is_some()
    }

    /// Building footprints and cliffs, the regions nothing may enter
    pub fn obstacles(&self) -> impl Iterator<Item = &dyn Region> + '_ {
        self.buildings
            .iter()
            .map(|b| &b.footprint as &dyn Region)
            .chain(self.cliffs.iter().map(|c| &c.area as &dyn Region))
    }

    pub fn is_blocked(&self, p: Vec2) -> bool {
        self.obstacles().any(|o| o.contains(p))
    }

    /// Cells with centers here count toward coverage
    pub fn is_groomable(&self, p: Vec2) -> bool {
        self.on_piste(p) && !self.is_blocked(p)
    }

    pub fn anchor(&self, id: u32) -> Option<&Anchor> {
        self.anchors
            .binary_search_by_key(&id, |a| a.id)
            .ok()
            .map(|i| &self.anchors[i])
    }

    /// Nearest building of the given kind within `radius` of `p`
    pub fn building_in_range(&self, p: Vec2, kind: BuildingKind, radius: f32) -> Option<&Building> {
        self.buildings
            .iter()
            .filter(|b| b.kind == kind)
            .map(|b| (b, b.footprint.nearest_boundary(p)))
            .filter(|(b, edge)| b.footprint.contains(p) || edge.distance <= radius)
            .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance))
            .map(|(b, _)| b)
    }
}
