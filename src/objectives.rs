//! Bonus objectives and end-of-level rating
//!
//! Objectives are checked against a [`Snapshot`] when a level finishes.
//! Stars: one for reaching the coverage target, one for beating par time,
//! one for meeting every bonus objective.

use serde::{Deserialize, Serialize};

use crate::level::Level;
use crate::sim::{GamePhase, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BonusObjective {
    /// Winch attached at most this many times
    MaxWinchUses { uses: u32 },
    NoTumbles,
    /// Finish with at least this fraction of the tank left
    MinFuelRemaining { fraction: f32 },
    UnderTime { secs: f32 },
    /// No tumbles and no restarts
    Flawless,
    /// Exceed the level's own target
    MinCoverage { ratio: f32 },
}

impl BonusObjective {
    pub fn is_met(&self, snapshot: &Snapshot) -> bool {
        match *self {
            BonusObjective::MaxWinchUses { uses } => snapshot.winch_use_count <= uses,
            BonusObjective::NoTumbles => snapshot.tumble_count == 0,
            BonusObjective::MinFuelRemaining { fraction } => {
                snapshot.fuel_max > 0.0 && snapshot.fuel / snapshot.fuel_max >= fraction
            }
            BonusObjective::UnderTime { secs } => snapshot.elapsed_secs <= secs,
            BonusObjective::Flawless => snapshot.tumble_count == 0 && snapshot.restart_count == 0,
            BonusObjective::MinCoverage { ratio } => snapshot.coverage_ratio >= ratio,
        }
    }

    pub fn describe(&self) -> String {
        match *self {
            BonusObjective::MaxWinchUses { uses } => format!("use the winch at most {uses} times"),
            BonusObjective::NoTumbles => "don't tumble".to_string(),
            BonusObjective::MinFuelRemaining { fraction } => {
                format!("finish with {:.0}% fuel", fraction * 100.0)
            }
            BonusObjective::UnderTime { secs } => format!("finish within {secs:.0}s"),
            BonusObjective::Flawless => "no tumbles, no restarts".to_string(),
            BonusObjective::MinCoverage { ratio } => format!("groom {:.0}% of the piste", ratio * 100.0),
        }
    }
}

/// How a finished (or abandoned) level went
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelResult {
    pub completed: bool,
    pub coverage_ratio: f32,
    pub elapsed_secs: f32,
    pub under_par: bool,
    /// Each bonus objective and whether it was met
    pub bonus: Vec<(BonusObjective, bool)>,
    /// 0 when the level was not completed, else 1-3
    pub stars: u8,
}

pub fn evaluate(level: &Level, snapshot: &Snapshot) -> LevelResult {
    let completed = snapshot.phase == GamePhase::LevelComplete;
    let under_par = snapshot.elapsed_secs <= level.par_time_secs;
    let bonus: Vec<_> = level
        .bonus_objectives
        .iter()
        .map(|objective| (*objective, objective.is_met(snapshot)))
        .collect();

    let stars = if completed {
        1 + u8::from(under_par) + u8::from(bonus.iter().all(|(_, met)| *met))
    } else {
        0
    };

    LevelResult {
        completed,
        coverage_ratio: snapshot.coverage_ratio,
        elapsed_secs: snapshot.elapsed_secs,
        under_par,
        bonus,
        stars,
    }
}
