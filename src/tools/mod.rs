//! MacroLog Tools module
//!
//! Tool bodies behind the MCP server. Each returns a serializable response or
//! an error string.

pub mod calculate;
pub mod days;
pub mod foods;
pub mod goals;
pub mod meals;
pub mod menus;
pub mod status;

use serde::Serialize;

use crate::models::AggregateTotals;
use crate::nutrition::{macro_split, round_to_nearest_n, DisplayMacros, MacroSplit};

/// Totals as returned to clients: exact sums, rounded copies, energy split
#[derive(Debug, Clone, Serialize)]
pub struct TotalsView {
    pub raw: AggregateTotals,
    pub display: DisplayMacros,
    /// Calories to the nearest 50, for summary charts
    pub calories_nearest_50: i64,
    pub split: Option<MacroSplit>,
}

impl From<AggregateTotals> for TotalsView {
    fn from(raw: AggregateTotals) -> Self {
        Self {
            display: DisplayMacros::from(&raw),
            calories_nearest_50: round_to_nearest_n(raw.calories, 50),
            split: macro_split(&raw),
            raw,
        }
    }
}
