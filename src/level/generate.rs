//! Daily runs: seeded procedural levels
//!
//! A shareable seed string plus a difficulty rank always yields the same
//! level. Generated levels are built to pass [`Level::from_def`].
//!
//! [`Level::from_def`]: super::Level::from_def

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::geometry::{
    AccessPath, Anchor, Building, BuildingKind, CliffSegment, HazardZone, Side, SpawnArea,
    SteepZone,
};
use super::shapes::{Polygon, Rect};
use super::LevelDef;
use crate::consts::TILE_SIZE;
use crate::objectives::BonusObjective;
use crate::sim::wildlife::Species;

/// Piste difficulty rank (European slope colours)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    #[default]
    Green,
    Blue,
    Red,
    Black,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Green => "green",
            Rank::Blue => "blue",
            Rank::Red => "red",
            Rank::Black => "black",
        }
    }

    /// Parse a rank name; anything unrecognised is green
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "blue" => Rank::Blue,
            "red" => Rank::Red,
            "black" => Rank::Black,
            _ => Rank::Green,
        }
    }

    fn difficulty(&self) -> u32 {
        match self {
            Rank::Green => 0,
            Rank::Blue => 1,
            Rank::Red => 2,
            Rank::Black => 3,
        }
    }

    /// (min, max) slope of steep bands
    fn steep_range(&self) -> (f32, f32) {
        match self {
            Rank::Green => (18.0, 24.0),
            Rank::Blue => (24.0, 31.0),
            Rank::Red => (30.0, 38.0),
            Rank::Black => (34.0, 45.0),
        }
    }

    fn species(&self) -> &'static [Species] {
        match self {
            Rank::Green => &[Species::Marmot, Species::Ptarmigan],
            Rank::Blue => &[Species::Marmot, Species::Ptarmigan, Species::Chamois],
            Rank::Red => &[Species::Marmot, Species::Chamois, Species::Fox],
            Rank::Black => &[Species::Chamois, Species::Fox, Species::Ibex],
        }
    }
}

/// FNV-1a over the normalised seed text
pub fn seed_from_str(seed: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in seed.trim().to_uppercase().bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const WIDTH_TILES: u32 = 48;
const BASE_HEIGHT_TILES: u32 = 80;
/// Rows between piste edge control points
const EDGE_STEP_TILES: u32 = 8;
/// Edges never come closer than this to the level border
const EDGE_MARGIN_TILES: f32 = 3.0;

/// Piste outline as (y, left x, right x) control points, top to bottom
struct Outline {
    rows: Vec<(f32, f32, f32)>,
}

impl Outline {
    fn edges_at(&self, y: f32) -> (f32, f32) {
        let first = self.rows[0];
        if y <= first.0 {
            return (first.1, first.2);
        }
        for pair in self.rows.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if y <= b.0 {
                let t = (y - a.0) / (b.0 - a.0);
                return (a.1 + (b.1 - a.1) * t, a.2 + (b.2 - a.2) * t);
            }
        }
        let last = self.rows[self.rows.len() - 1];
        (last.1, last.2)
    }

    /// Narrowest pair of edges over a vertical span
    fn narrowest_in(&self, top: f32, bottom: f32) -> (f32, f32) {
        let mut left = f32::MIN;
        let mut right = f32::MAX;
        let mut y = top;
        while y <= bottom {
            let (l, r) = self.edges_at(y);
            left = left.max(l);
            right = right.min(r);
            y += TILE_SIZE;
        }
        let (l, r) = self.edges_at(bottom);
        (left.max(l), right.min(r))
    }

    fn polygon(&self) -> Polygon {
        let mut points: Vec<Vec2> = self.rows.iter().map(|r| Vec2::new(r.1, r.0)).collect();
        points.extend(self.rows.iter().rev().map(|r| Vec2::new(r.2, r.0)));
        Polygon::new(points)
    }
}

/// Build the daily-run level for `seed` at `rank`
pub fn generate_level(seed: &str, rank: Rank) -> LevelDef {
    let mut rng = Pcg32::seed_from_u64(seed_from_str(seed) ^ ((rank.difficulty() as u64) << 56));
    let difficulty = rank.difficulty();
    let tile = TILE_SIZE;

    let width_tiles = WIDTH_TILES;
    let height_tiles = BASE_HEIGHT_TILES + 10 * difficulty;
    let width = width_tiles as f32 * tile;
    let height = height_tiles as f32 * tile;
    let margin = EDGE_MARGIN_TILES * tile;

    // Piste outline: a wandering centre line with a varying half-width
    let narrowest_half = (12.0 - 1.5 * difficulty as f32) * tile;
    let mut rows = Vec::new();
    let mut center = width * 0.5;
    let mut row = 1;
    loop {
        let y = (row.min(height_tiles - 1)) as f32 * tile;
        let half = narrowest_half + rng.random_range(0.0..4.0) * tile;
        let max_offset = (width * 0.5 - margin - half).max(0.0);
        center = (center + rng.random_range(-3.0..3.0) * tile)
            .clamp(width * 0.5 - max_offset, width * 0.5 + max_offset);
        rows.push((y, center - half, center + half));
        if row >= height_tiles - 1 {
            break;
        }
        row += EDGE_STEP_TILES;
    }
    let outline = Outline { rows };

    // Keep the bottom of the run flat for the start area and services
    let service_top = height - 10.0 * tile;

    // Steep bands across the run, evenly spread above the service area
    let band_count = difficulty + 1;
    let band_span = (service_top - 4.0 * tile) / band_count as f32;
    let (slope_min, slope_max) = rank.steep_range();
    let mut steep_zones = Vec::new();
    let mut anchors = Vec::new();
    let mut hazard_zones = Vec::new();
    let mut cliffs = Vec::new();

    for band in 0..band_count {
        let span_top = 4.0 * tile + band as f32 * band_span;
        let band_height = rng.random_range(4.0..8.0) * tile;
        let top = span_top + rng.random_range(2.0..(band_span / tile - 9.0).max(2.5)) * tile;
        let bottom = (top + band_height).min(span_top + band_span - tile);
        let slope_degrees = rng.random_range(slope_min..slope_max);
        steep_zones.push(SteepZone {
            area: Polygon::from(Rect::new(Vec2::new(0.0, top), Vec2::new(width, bottom))),
            slope_degrees,
            fall_line: None,
        });

        let (left, right) = outline.narrowest_in(top, bottom);
        let center = (left + right) * 0.5;

        // Anchors above anything too steep to climb unaided
        let anchor_id = if slope_degrees >= 28.0 {
            let id = anchors.len() as u32 + 1;
            anchors.push(Anchor {
                id,
                pos: Vec2::new(center, (top - 2.0 * tile).max(tile)),
            });
            Some(id)
        } else {
            None
        };

        let inset = 2.0 * tile;
        if difficulty >= 2 && band % 2 == 0 && right - left > 2.0 * inset + tile {
            hazard_zones.push(HazardZone {
                id: 100 + band,
                area: Polygon::from(Rect::new(
                    Vec2::new(left + inset, top),
                    Vec2::new(right - inset, bottom),
                )),
                rate_scale: 0.8 + 0.2 * (difficulty - 1) as f32,
                anchor: anchor_id,
            });
        }

        if difficulty >= 3 {
            let side = if rng.random_bool(0.5) { Side::Left } else { Side::Right };
            let (l, r) = outline.edges_at((top + bottom) * 0.5);
            let area = match side {
                Side::Left => Rect::new(Vec2::new(0.5 * tile, top), Vec2::new(l - tile, bottom)),
                Side::Right => {
                    Rect::new(Vec2::new(r + tile, top), Vec2::new(width - 0.5 * tile, bottom))
                }
            };
            if area.is_valid() {
                cliffs.push(CliffSegment {
                    area: Polygon::from(area),
                    side,
                });
            }
        }
    }

    // Services at the bottom
    let start_y = height - 3.0 * tile;
    let (bottom_left, bottom_right) = outline.narrowest_in(service_top, height - tile);
    let (start_left, start_right) = outline.edges_at(start_y);
    let vehicle_start = Vec2::new((start_left + start_right) * 0.5, start_y);
    let mut buildings = vec![Building {
        footprint: Rect::new(
            Vec2::new(bottom_left + 2.0 * tile, height - 7.0 * tile),
            Vec2::new(bottom_left + 5.0 * tile, height - 5.0 * tile),
        ),
        kind: BuildingKind::FuelStation,
    }];
    if difficulty >= 1 {
        buildings.push(Building {
            footprint: Rect::new(
                Vec2::new(bottom_right - 5.0 * tile, height - 7.0 * tile),
                Vec2::new(bottom_right - 2.0 * tile, height - 5.0 * tile),
            ),
            kind: BuildingKind::Chalet,
        });
    }

    let mut access_paths = Vec::new();
    if difficulty >= 1 {
        let y = service_top - 6.0 * tile;
        let (_, right) = outline.edges_at(y);
        let rect = Rect::new(
            Vec2::new(right - tile, y),
            Vec2::new((right + 4.0 * tile).min(width - 0.5 * tile), y + 3.0 * tile),
        );
        if rect.is_valid() {
            access_paths.push(AccessPath {
                rect,
                side: Side::Right,
                slope_degrees: 6.0,
            });
        }
    }

    let wildlife = rank
        .species()
        .iter()
        .map(|&species| {
            let size = Vec2::new(8.0, 6.0) * tile;
            let min = Vec2::new(
                rng.random_range(0.0..(width - size.x)),
                rng.random_range(0.0..(service_top - size.y)),
            );
            SpawnArea {
                species,
                area: Rect::new(min, min + size),
                initial: rng.random_range(1..=2),
            }
        })
        .collect();

    let par_time_secs = 150.0 + 30.0 * difficulty as f32;
    let mut bonus_objectives = vec![BonusObjective::UnderTime {
        secs: par_time_secs * 0.8,
    }];
    bonus_objectives.push(match rng.random_range(0..3) {
        0 => BonusObjective::NoTumbles,
        1 => BonusObjective::MinFuelRemaining { fraction: 0.3 },
        _ if !anchors.is_empty() => BonusObjective::MaxWinchUses {
            uses: anchors.len() as u32,
        },
        _ => BonusObjective::MinCoverage { ratio: 0.9 },
    });

    LevelDef {
        name: format!("Daily {} ({})", seed.trim().to_uppercase(), rank.as_str()),
        width: width_tiles,
        height: height_tiles,
        tile_size: tile,
        piste: outline.polygon(),
        base_slope_degrees: 10.0 + 2.0 * difficulty as f32,
        steep_zones,
        cliffs,
        access_paths,
        buildings,
        anchors,
        hazard_zones,
        wildlife,
        vehicle_start,
        start_heading: -std::f32::consts::FRAC_PI_2,
        target_coverage: 0.7 + 0.05 * difficulty as f32,
        par_time_secs,
        bonus_objectives,
    }
}
