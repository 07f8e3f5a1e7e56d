//! Winch system
//!
//! A single cable between the groomer and a fixed anchor. Attaching and
//! detaching take time; while attached the cable pulls the vehicle toward
//! its anchor and keeps it from tumbling.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::level::Anchor;
use crate::tuning::{Tuning, WinchBudget};

/// Why a cable came off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetachReason {
    /// Driver released it
    Released,
    /// Vehicle moved beyond the maximum cable length
    OutOfRange,
    /// Driver cancelled or drove away while still hooking up
    Aborted,
}

/// Winch state machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum WinchState {
    Detached,
    /// Hooking up to `anchor_id`
    Attaching { anchor_id: u32, remaining: f32 },
    Attached { anchor_id: u32 },
    /// Reeling the cable back in
    Detaching {
        anchor_id: u32,
        remaining: f32,
        reason: DetachReason,
    },
}

/// Transition reported by [`WinchSystem::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinchEvent {
    Attached { anchor_id: u32, use_count: u32 },
    Detached { anchor_id: u32, reason: DetachReason },
}

/// The live cable
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cable {
    pub anchor_id: u32,
    pub from: Vec2,
    pub to: Vec2,
}

impl Cable {
    #[inline]
    pub fn length(&self) -> f32 {
        self.from.distance(self.to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WinchParams {
    attach_radius: f32,
    max_cable_length: f32,
    attach_secs: f32,
    detach_secs: f32,
    budget: WinchBudget,
}

#[derive(Debug, Clone)]
pub struct WinchSystem {
    params: WinchParams,
    state: WinchState,
    use_count: u32,
}

impl WinchSystem {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            params: WinchParams {
                attach_radius: tuning.winch_attach_radius,
                max_cable_length: tuning.winch_max_cable_length,
                attach_secs: tuning.winch_attach_secs,
                detach_secs: tuning.winch_detach_secs,
                budget: tuning.winch_budget,
            },
            state: WinchState::Detached,
            use_count: 0,
        }
    }

    #[inline]
    pub fn state(&self) -> WinchState {
        self.state
    }

    /// Cable attached and pulling
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.state, WinchState::Attached { .. })
    }

    #[inline]
    pub fn is_detached(&self) -> bool {
        matches!(self.state, WinchState::Detached)
    }

    /// Completed attachments this run
    #[inline]
    pub fn use_count(&self) -> u32 {
        self.use_count
    }

    /// Attachments still allowed under a count budget; `None` when fuel-gated
    pub fn uses_remaining(&self) -> Option<u32> {
        match self.params.budget {
            WinchBudget::Count { uses } => Some(uses.saturating_sub(self.use_count)),
            WinchBudget::Fuel { .. } => None,
        }
    }

    /// Anchor the cable is (or is becoming) connected to
    pub fn anchor_id(&self) -> Option<u32> {
        match self.state {
            WinchState::Detached => None,
            WinchState::Attaching { anchor_id, .. }
            | WinchState::Attached { anchor_id }
            | WinchState::Detaching { anchor_id, .. } => Some(anchor_id),
        }
    }

    fn budget_allows(&self, fuel: f32) -> bool {
        match self.params.budget {
            WinchBudget::Count { uses } => self.use_count < uses,
            WinchBudget::Fuel { reserve } => fuel > reserve,
        }
    }

    /// Start hooking up to the nearest anchor within reach
    ///
    /// Returns the chosen anchor id, or `None` when a cable already exists,
    /// the budget is spent, or no anchor is in range. Ties on distance go to
    /// the lower id.
    pub fn try_attach(&mut self, vehicle_pos: Vec2, fuel: f32, anchors: &[Anchor]) -> Option<u32> {
        if !self.is_detached() || !self.budget_allows(fuel) {
            return None;
        }

        let reach_sq = self.params.attach_radius * self.params.attach_radius;
        let nearest = anchors
            .iter()
            .map(|a| (a, a.pos.distance_squared(vehicle_pos)))
            .filter(|(_, d)| *d <= reach_sq)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.id.cmp(&b.0.id)))
            .map(|(a, _)| a.id)?;

        self.state = WinchState::Attaching {
            anchor_id: nearest,
            remaining: self.params.attach_secs,
        };
        log::debug!("winch hooking up to anchor {nearest}");
        Some(nearest)
    }

    /// Driver lets go of the cable
    ///
    /// Attached starts reeling in; a half-finished hookup is abandoned on the
    /// spot. Returns the event when the cable is gone immediately.
    pub fn release(&mut self) -> Option<WinchEvent> {
        match self.state {
            WinchState::Attached { anchor_id } => {
                self.begin_detach(anchor_id, DetachReason::Released);
                None
            }
            WinchState::Attaching { anchor_id, .. } => {
                self.state = WinchState::Detached;
                Some(WinchEvent::Detached {
                    anchor_id,
                    reason: DetachReason::Aborted,
                })
            }
            WinchState::Detached | WinchState::Detaching { .. } => None,
        }
    }

    fn begin_detach(&mut self, anchor_id: u32, reason: DetachReason) {
        self.state = WinchState::Detaching {
            anchor_id,
            remaining: self.params.detach_secs,
            reason,
        };
    }

    /// Advance timers and enforce cable length
    ///
    /// `vehicle_pos` is the position at the start of the tick, before physics.
    pub fn update(&mut self, vehicle_pos: Vec2, anchors: &[Anchor], dt: f32) -> Option<WinchEvent> {
        let anchor_pos = |id: u32| anchors.iter().find(|a| a.id == id).map(|a| a.pos);

        match self.state {
            WinchState::Detached => None,
            WinchState::Attaching { anchor_id, remaining } => {
                let in_reach = anchor_pos(anchor_id)
                    .is_some_and(|p| p.distance(vehicle_pos) <= self.params.attach_radius);
                if !in_reach {
                    self.state = WinchState::Detached;
                    return Some(WinchEvent::Detached {
                        anchor_id,
                        reason: DetachReason::Aborted,
                    });
                }
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.state = WinchState::Attaching { anchor_id, remaining };
                    return None;
                }
                self.state = WinchState::Attached { anchor_id };
                self.use_count += 1;
                log::info!("winch attached to anchor {anchor_id} (use {})", self.use_count);
                Some(WinchEvent::Attached {
                    anchor_id,
                    use_count: self.use_count,
                })
            }
            WinchState::Attached { anchor_id } => {
                let too_far = anchor_pos(anchor_id)
                    .is_none_or(|p| p.distance(vehicle_pos) > self.params.max_cable_length);
                if too_far {
                    log::info!("winch cable to anchor {anchor_id} overstretched, detaching");
                    self.begin_detach(anchor_id, DetachReason::OutOfRange);
                }
                None
            }
            WinchState::Detaching {
                anchor_id,
                remaining,
                reason,
            } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.state = WinchState::Detaching {
                        anchor_id,
                        remaining,
                        reason,
                    };
                    return None;
                }
                self.state = WinchState::Detached;
                Some(WinchEvent::Detached { anchor_id, reason })
            }
        }
    }

    /// Unit direction of the cable's pull, only while attached
    pub fn pull_direction(&self, vehicle_pos: Vec2, anchors: &[Anchor]) -> Option<Vec2> {
        let WinchState::Attached { anchor_id } = self.state else {
            return None;
        };
        let anchor = anchors.iter().find(|a| a.id == anchor_id)?;
        (anchor.pos - vehicle_pos).try_normalize()
    }

    /// Cable endpoints while one exists
    pub fn cable(&self, vehicle_pos: Vec2, anchors: &[Anchor]) -> Option<Cable> {
        let anchor_id = self.anchor_id()?;
        let anchor = anchors.iter().find(|a| a.id == anchor_id)?;
        Some(Cable {
            anchor_id,
            from: vehicle_pos,
            to: anchor.pos,
        })
    }

    pub fn reset(&mut self) {
        self.state = WinchState::Detached;
        self.use_count = 0;
    }
}
