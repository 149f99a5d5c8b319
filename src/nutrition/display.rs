//! Display-side helpers
//!
//! Rounding, macro energy split and goal progress. These read engine output
//! and are applied only at the response boundary.

use serde::Serialize;

use super::engine::{derive_calories, KCAL_PER_G_CARBS, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN};
use crate::models::{AggregateTotals, MacroGoals, ScaledMacros};

/// Decimal places used for calories in responses
pub const CALORIE_PLACES: u32 = 0;
/// Decimal places used for macro grams in responses
pub const MACRO_PLACES: u32 = 1;

/// Round `value` to `places` decimal places
pub fn round_to_places(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Rounded copy of scaled macros for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayMacros {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl From<&ScaledMacros> for DisplayMacros {
    fn from(m: &ScaledMacros) -> Self {
        Self {
            calories: round_to_places(m.calories, CALORIE_PLACES),
            protein: round_to_places(m.protein, MACRO_PLACES),
            carbs: round_to_places(m.carbs, MACRO_PLACES),
            fat: round_to_places(m.fat, MACRO_PLACES),
        }
    }
}

impl From<ScaledMacros> for DisplayMacros {
    fn from(m: ScaledMacros) -> Self {
        Self::from(&m)
    }
}

/// Share of macro energy contributed by each macro, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacroSplit {
    pub protein_pct: f64,
    pub carbs_pct: f64,
    pub fat_pct: f64,
}

/// Percent of Atwater energy from protein, carbs and fat.
///
/// Uses energy derived from the grams rather than the labelled calories so the
/// three shares always sum to 100. `None` when there are no macro grams.
pub fn macro_split(macros: &ScaledMacros) -> Option<MacroSplit> {
    let total = derive_calories(macros.protein, macros.carbs, macros.fat);
    if total <= 0.0 {
        return None;
    }

    Some(MacroSplit {
        protein_pct: macros.protein * KCAL_PER_G_PROTEIN * 100.0 / total,
        carbs_pct: macros.carbs * KCAL_PER_G_CARBS * 100.0 / total,
        fat_pct: macros.fat * KCAL_PER_G_FAT * 100.0 / total,
    })
}

/// Progress toward one goal
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldProgress {
    pub consumed: f64,
    pub goal: f64,
    pub remaining: f64,
    /// Fraction of the goal consumed; `None` when no goal is set
    pub fraction: Option<f64>,
}

impl FieldProgress {
    fn new(consumed: f64, goal: f64) -> Self {
        Self {
            consumed,
            goal,
            remaining: goal - consumed,
            fraction: if goal > 0.0 { Some(consumed / goal) } else { None },
        }
    }
}

/// Progress bars for a day against its goals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GoalProgress {
    pub calories: FieldProgress,
    pub protein: FieldProgress,
    pub carbs: FieldProgress,
    pub fat: FieldProgress,
}

pub fn goal_progress(totals: &AggregateTotals, goals: &MacroGoals) -> GoalProgress {
    GoalProgress {
        calories: FieldProgress::new(totals.calories, goals.calories),
        protein: FieldProgress::new(totals.protein, goals.protein),
        carbs: FieldProgress::new(totals.carbs, goals.carbs),
        fat: FieldProgress::new(totals.fat, goals.fat),
    }
}
