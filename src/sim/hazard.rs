//! Avalanche hazard
//!
//! Every hazard zone carries its own risk in [0, 1]. Risk builds while the
//! groomer's centre is inside the zone, faster on steeper ground, while
//! lingering, and while cutting fresh snow; a cable to the zone's own anchor
//! slows it down. Outside the zone risk bleeds off slowly. The first zone
//! to reach 1.0 triggers the avalanche, after which everything freezes.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::level::{HazardZone, Region};
use crate::tuning::Tuning;

use super::state::GameOverReason;

/// Risk level at which a zone lets go
pub const TRIGGER_RISK: f32 = 1.0;

/// Per-zone accumulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRisk {
    pub zone_id: u32,
    pub risk: f32,
    /// Time the vehicle has spent stationary inside the zone
    pub dwell_secs: f32,
    pub occupied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum HazardState {
    Armed,
    Triggered { zone_id: u32 },
}

/// What the hazard system needs to know about the vehicle this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardSignals {
    pub pos: Vec2,
    pub speed: f32,
    pub slope_degrees: f32,
    /// Cells groomed for the first time this tick
    pub newly_groomed: u32,
    /// Anchor of an attached cable
    pub winch_anchor: Option<u32>,
}

/// Reported once, when the avalanche goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardTrigger {
    pub zone_id: u32,
    pub reason: GameOverReason,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HazardParams {
    rate_per_second: f32,
    dwell_multiplier: f32,
    dwell_threshold_secs: f32,
    slope_onset_degrees: f32,
    slope_full_degrees: f32,
    slope_gain: f32,
    groom_multiplier: f32,
    winch_multiplier: f32,
    decay_per_second: f32,
    stationary_speed: f32,
}

impl HazardParams {
    fn from_tuning(tuning: &Tuning) -> Self {
        Self {
            rate_per_second: tuning.risk_rate_per_second(),
            dwell_multiplier: tuning.risk_dwell_multiplier,
            dwell_threshold_secs: tuning.risk_dwell_threshold_secs,
            slope_onset_degrees: tuning.risk_slope_onset_degrees,
            slope_full_degrees: tuning.tumble_slope_degrees,
            slope_gain: tuning.risk_slope_gain,
            groom_multiplier: tuning.risk_groom_multiplier,
            winch_multiplier: tuning.risk_winch_multiplier,
            decay_per_second: tuning.risk_decay_per_second,
            stationary_speed: tuning.stationary_speed,
        }
    }

    /// 1.0 at or below the onset angle, ramping to 1 + gain at the tumble angle
    fn slope_factor(&self, degrees: f32) -> f32 {
        let span = self.slope_full_degrees - self.slope_onset_degrees;
        if span <= 0.0 {
            return if degrees > self.slope_onset_degrees {
                1.0 + self.slope_gain
            } else {
                1.0
            };
        }
        let t = ((degrees - self.slope_onset_degrees) / span).clamp(0.0, 1.0);
        1.0 + self.slope_gain * t
    }
}

#[derive(Debug, Clone)]
pub struct HazardSystem {
    params: HazardParams,
    zones: Vec<ZoneRisk>,
    state: HazardState,
}

impl HazardSystem {
    /// `zones` must be the level's hazard zones (sorted by id)
    pub fn new(zones: &[HazardZone], tuning: &Tuning) -> Self {
        Self {
            params: HazardParams::from_tuning(tuning),
            zones: zones
                .iter()
                .map(|z| ZoneRisk {
                    zone_id: z.id,
                    risk: 0.0,
                    dwell_secs: 0.0,
                    occupied: false,
                })
                .collect(),
            state: HazardState::Armed,
        }
    }

    #[inline]
    pub fn state(&self) -> HazardState {
        self.state
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        matches!(self.state, HazardState::Triggered { .. })
    }

    pub fn zones(&self) -> &[ZoneRisk] {
        &self.zones
    }

    pub fn risk(&self, zone_id: u32) -> Option<f32> {
        self.zones
            .iter()
            .find(|z| z.zone_id == zone_id)
            .map(|z| z.risk)
    }

    /// Highest risk across all zones (0 with no zones)
    pub fn max_risk(&self) -> f32 {
        self.zones.iter().map(|z| z.risk).fold(0.0, f32::max)
    }

    /// Apply one tick of risk change
    ///
    /// No-op once triggered.
    pub fn accumulate(&mut self, dt: f32, zones: &[HazardZone], signals: &HazardSignals) {
        if self.is_triggered() || dt <= 0.0 {
            return;
        }
        let params = self.params;
        let stationary = signals.speed < params.stationary_speed;

        for (risk, zone) in self.zones.iter_mut().zip(zones) {
            debug_assert_eq!(risk.zone_id, zone.id);

            risk.occupied = zone.area.contains(signals.pos);
            if !risk.occupied {
                risk.dwell_secs = 0.0;
                risk.risk = (risk.risk - params.decay_per_second * dt).max(0.0);
                continue;
            }

            if stationary {
                risk.dwell_secs += dt;
            } else {
                risk.dwell_secs = 0.0;
            }

            let mut rate = params.rate_per_second * zone.rate_scale;
            rate *= params.slope_factor(signals.slope_degrees);
            if risk.dwell_secs > params.dwell_threshold_secs {
                rate *= params.dwell_multiplier;
            }
            if signals.newly_groomed > 0 {
                rate *= params.groom_multiplier;
            }
            if zone.anchor.is_some() && signals.winch_anchor == zone.anchor {
                rate *= params.winch_multiplier;
            }

            risk.risk = (risk.risk + rate.max(0.0) * dt).clamp(0.0, TRIGGER_RISK);
        }
    }

    /// Check for the avalanche
    ///
    /// Returns the trigger exactly once: on the first call after any zone
    /// reaches [`TRIGGER_RISK`]. Later calls return `None`.
    pub fn resolve(&mut self) -> Option<HazardTrigger> {
        if self.is_triggered() {
            return None;
        }
        let zone = self
            .zones
            .iter()
            .filter(|z| z.risk >= TRIGGER_RISK)
            .min_by_key(|z| z.zone_id)?;
        let zone_id = zone.zone_id;
        self.state = HazardState::Triggered { zone_id };
        log::warn!("avalanche released in hazard zone {zone_id}");
        Some(HazardTrigger {
            zone_id,
            reason: GameOverReason::Avalanche,
        })
    }

    pub fn reset(&mut self) {
        for zone in &mut self.zones {
            zone.risk = 0.0;
            zone.dwell_secs = 0.0;
            zone.occupied = false;
        }
        self.state = HazardState::Armed;
    }
}
