//! Terrain coverage field
//!
//! One cell per tile over the level bounds. Only cells whose centre lies on
//! the piste (and outside buildings and cliffs) are groomable; the coverage
//! ratio is measured against those. The cell count never changes after load.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::level::{GridSpec, LevelGeometry};

/// Snow quality of cells nobody has groomed yet
pub const UNGROOMED_QUALITY: f32 = 0.3;

/// Surface class under the vehicle, drives traction and friction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    Groomed,
    Ungroomed,
    OffPiste,
}

/// A single terrain cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainCell {
    pub groomable: bool,
    pub groomed: bool,
    /// Snow quality 0-1; 1.0 right after grooming, decays over time
    pub quality: f32,
}

#[derive(Debug, Clone)]
pub struct CoverageField {
    grid: GridSpec,
    cells: Vec<TerrainCell>,
    groomable_count: usize,
    groomed_count: usize,
}

impl CoverageField {
    pub fn new(geometry: &LevelGeometry) -> Self {
        let grid = geometry.grid;
        let mut cells = Vec::with_capacity(grid.cell_count());
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                cells.push(TerrainCell {
                    groomable: geometry.is_groomable(grid.cell_center(col, row)),
                    groomed: false,
                    quality: UNGROOMED_QUALITY,
                });
            }
        }
        let groomable_count = cells.iter().filter(|c| c.groomable).count();
        Self {
            grid,
            cells,
            groomable_count,
            groomed_count: 0,
        }
    }

    #[inline]
    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn groomable_count(&self) -> usize {
        self.groomable_count
    }

    #[inline]
    pub fn groomed_count(&self) -> usize {
        self.groomed_count
    }

    pub fn cell(&self, col: u32, row: u32) -> Option<&TerrainCell> {
        if col >= self.grid.cols || row >= self.grid.rows {
            return None;
        }
        self.cells.get(self.grid.index(col, row))
    }

    /// Cell under `pos` (clamped to the grid)
    pub fn cell_at(&self, pos: Vec2) -> &TerrainCell {
        let (col, row) = self.grid.cell_of(pos);
        &self.cells[self.grid.index(col, row)]
    }

    /// Groomed fraction of groomable cells, in [0, 1]
    pub fn coverage_ratio(&self) -> f32 {
        if self.groomable_count == 0 {
            return 0.0;
        }
        self.groomed_count as f32 / self.groomable_count as f32
    }

    /// Age the snow: every cell loses quality at `rate` per second, floor 0
    pub fn quality_decay(&mut self, rate: f32, dt: f32) {
        let loss = rate * dt;
        if loss <= 0.0 {
            return;
        }
        for cell in &mut self.cells {
            cell.quality = (cell.quality - loss).max(0.0);
        }
    }

    /// Groom every groomable cell whose centre is within `radius` of `pos`.
    ///
    /// Returns how many cells were groomed for the first time. Already
    /// groomed cells get their quality restored but are not counted again.
    /// `pos` outside the grid is clamped onto it.
    pub fn mark_covered(&mut self, pos: Vec2, radius: f32) -> u32 {
        let radius = radius.max(0.0);
        let bounds = self.grid.bounds();
        let pos = bounds.clamp(pos);
        let radius_sq = radius * radius;

        let (col_min, row_min) = self.grid.cell_of(pos - Vec2::splat(radius));
        let (col_max, row_max) = self.grid.cell_of(pos + Vec2::splat(radius));

        let mut newly_groomed = 0;
        for row in row_min..=row_max {
            for col in col_min..=col_max {
                let center = self.grid.cell_center(col, row);
                if center.distance_squared(pos) > radius_sq {
                    continue;
                }
                let cell = &mut self.cells[self.grid.index(col, row)];
                if !cell.groomable {
                    continue;
                }
                cell.quality = 1.0;
                if !cell.groomed {
                    cell.groomed = true;
                    newly_groomed += 1;
                }
            }
        }
        self.groomed_count += newly_groomed as usize;
        newly_groomed
    }

    /// Surface class at `pos`
    pub fn surface_at(&self, pos: Vec2, geometry: &LevelGeometry) -> Surface {
        if !geometry.on_piste(pos) {
            return Surface::OffPiste;
        }
        let cell = self.cell_at(pos);
        if !cell.groomable {
            Surface::OffPiste
        } else if cell.groomed {
            Surface::Groomed
        } else {
            Surface::Ungroomed
        }
    }

    /// Centre of the closest groomable cell still waiting for the groomer
    pub fn nearest_ungroomed(&self, pos: Vec2) -> Option<Vec2> {
        let mut best: Option<(f32, Vec2)> = None;
        for row in 0..self.grid.rows {
            for col in 0..self.grid.cols {
                let cell = &self.cells[self.grid.index(col, row)];
                if !cell.groomable || cell.groomed {
                    continue;
                }
                let center = self.grid.cell_center(col, row);
                let d = center.distance_squared(pos);
                if best.is_none_or(|(best_d, _)| d < best_d) {
                    best = Some((d, center));
                }
            }
        }
        best.map(|(_, center)| center)
    }

    /// Average quality over groomable cells
    pub fn mean_quality(&self) -> f32 {
        if self.groomable_count == 0 {
            return 0.0;
        }
        let total: f32 = self
            .cells
            .iter()
            .filter(|c| c.groomable)
            .map(|c| c.quality)
            .sum();
        total / self.groomable_count as f32
    }

    /// Back to the freshly loaded state
    pub fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.groomed = false;
            cell.quality = UNGROOMED_QUALITY;
        }
        self.groomed_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::test_support::training_level;
    use proptest::prelude::*;

    fn field() -> (crate::level::Level, CoverageField) {
        let level = training_level();
        let field = CoverageField::new(&level.geometry);
        (level, field)
    }

    #[test]
    fn test_cell_count_matches_grid() {
        let (level, field) = field();
        assert_eq!(field.cell_count(), level.geometry.grid.cell_count());
        assert!(field.groomable_count() > 0);
        assert!(field.groomable_count() < field.cell_count());
        assert_eq!(field.coverage_ratio(), 0.0);
    }

    #[test]
    fn test_mark_covered_is_idempotent() {
        let (_, mut field) = field();
        let pos = Vec2::new(300.0, 600.0);
        let first = field.mark_covered(pos, 20.0);
        assert!(first > 0);
        assert_eq!(field.mark_covered(pos, 20.0), 0);
        assert_eq!(field.groomed_count(), first as usize);
    }

    #[test]
    fn test_grooming_restores_quality() {
        let (_, mut field) = field();
        let pos = Vec2::new(300.0, 600.0);
        field.mark_covered(pos, 20.0);
        field.quality_decay(0.5, 1.0);
        assert!((field.cell_at(pos).quality - 0.5).abs() < 1e-6);
        field.mark_covered(pos, 20.0);
        assert_eq!(field.cell_at(pos).quality, 1.0);
    }

    #[test]
    fn test_decay_clamps_at_zero() {
        let (_, mut field) = field();
        field.quality_decay(1.0, 10.0);
        assert_eq!(field.cell_at(Vec2::new(300.0, 600.0)).quality, 0.0);
    }

    #[test]
    fn test_out_of_bounds_is_clamped() {
        let (_, mut field) = field();
        // Far outside: clamped to the corner, which is off-piste
        assert_eq!(field.mark_covered(Vec2::new(-1.0e6, -1.0e6), 20.0), 0);
        // Far below: clamped to y = 960. Only row 57 (centre y 920) is still on
        // the piste, and 48 reaches the three cells centred at x 280, 296, 312.
        assert_eq!(field.mark_covered(Vec2::new(300.0, 10_000.0), 48.0), 3);
        let grid = *field.grid();
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let groomed = field.cell(col, row).is_some_and(|c| c.groomed);
                assert_eq!(groomed, row == 57 && (17..=19).contains(&col), "cell ({col}, {row})");
            }
        }
    }

    #[test]
    fn test_surface_classes() {
        let (level, mut field) = field();
        let geo = &level.geometry;
        let pos = Vec2::new(300.0, 600.0);
        assert_eq!(field.surface_at(pos, geo), Surface::Ungroomed);
        field.mark_covered(pos, 20.0);
        assert_eq!(field.surface_at(pos, geo), Surface::Groomed);
        assert_eq!(field.surface_at(Vec2::new(580.0, 730.0), geo), Surface::OffPiste);
    }

    #[test]
    fn test_reset_clears_everything() {
        let (_, mut field) = field();
        field.mark_covered(Vec2::new(300.0, 600.0), 60.0);
        field.reset();
        assert_eq!(field.groomed_count(), 0);
        assert_eq!(field.cell_at(Vec2::new(300.0, 600.0)).quality, UNGROOMED_QUALITY);
    }

    proptest! {
        #[test]
        fn prop_mark_covered_idempotent(
            x in -200.0f32..840.0,
            y in -200.0f32..1160.0,
            radius in 0.0f32..80.0,
        ) {
            let (_, mut field) = field();
            let pos = Vec2::new(x, y);
            let first = field.mark_covered(pos, radius);
            let groomed = field.groomed_count();
            prop_assert_eq!(groomed, first as usize);
            prop_assert_eq!(field.mark_covered(pos, radius), 0);
            prop_assert_eq!(field.groomed_count(), groomed);
        }

        #[test]
        fn prop_coverage_ratio_never_decreases(
            marks in prop::collection::vec((0.0f32..640.0, 0.0f32..960.0, 0.0f32..60.0), 1..40)
        ) {
            let (_, mut field) = field();
            let mut last = field.coverage_ratio();
            for (x, y, r) in marks {
                field.quality_decay(0.01, 1.0 / 60.0);
                field.mark_covered(Vec2::new(x, y), r);
                let ratio = field.coverage_ratio();
                prop_assert!(ratio >= last);
                prop_assert!((0.0..=1.0).contains(&ratio));
                last = ratio;
            }
        }
    }
}
