//! Nutrition calculation module
//!
//! The macro aggregation engine, display helpers, and serving unit conversion.

pub mod converter;
pub mod display;
pub mod engine;
pub mod units;

pub use converter::{
    parse_serving_text, resolve_serving_grams, serving_grams, serving_grams_from_parts, to_grams,
    to_ml, ServingGrams,
};
pub use display::{
    goal_progress, macro_split, round_to_places, DisplayMacros, GoalProgress, MacroSplit,
};
pub use engine::{
    aggregate, derive_calories, round_to_nearest_n, scale_to_serving, try_scale_to_serving,
    unscale_from_serving, NutritionError,
};
pub use units::{categorize_unit, grams_per_unit, ml_per_unit, ParsedServing, UnitCategory};
