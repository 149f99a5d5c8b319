//! Measurement units
//!
//! Unit categories, conversion factors and the parsed form of a serving
//! description.

use serde::Serialize;

/// Category of a measurement unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    /// g, mg, kg, oz, lb
    Weight,
    /// ml, l, tsp, tbsp, cup, fl oz
    Volume,
    /// each, piece, item
    Count,
    /// Anything food-specific (slice, scoop, bar)
    Custom,
}

/// A serving description such as "2 tbsp (28 g)" split into parts.
///
/// A parenthetical annotation describes the whole serving, not one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedServing {
    /// Leading quantity; 1 when the text starts with a unit
    pub quantity: f64,
    /// Base unit, lowercased (e.g. "tbsp" from "2 tbsp (28 g)")
    pub base_unit: String,
    pub category: UnitCategory,
    /// Total grams, if annotated
    pub annotated_grams: Option<f64>,
    /// Total milliliters, if annotated
    pub annotated_ml: Option<f64>,
}

// ============================================================================
// Volume factors (to milliliters)
// ============================================================================

pub const ML_PER_TSP: f64 = 4.92892;
pub const ML_PER_TBSP: f64 = 14.7868;
pub const ML_PER_FL_OZ: f64 = 29.5735;
pub const ML_PER_CUP: f64 = 236.588;
pub const ML_PER_LITER: f64 = 1000.0;
pub const ML_PER_CL: f64 = 10.0;
pub const ML_PER_DL: f64 = 100.0;

// ============================================================================
// Weight factors (to grams)
// ============================================================================

pub const G_PER_MG: f64 = 0.001;
pub const G_PER_KG: f64 = 1000.0;
pub const G_PER_OZ: f64 = 28.3495;
pub const G_PER_LB: f64 = 453.592;

/// Grams per milliliter assumed when a volume has no gram annotation
pub const WATER_DENSITY_G_PER_ML: f64 = 1.0;

/// Conversion factor to grams for a weight unit
pub fn grams_per_unit(unit: &str) -> Option<f64> {
    match unit.trim().to_lowercase().as_str() {
        "g" | "gr" | "grm" | "gram" | "grams" => Some(1.0),
        "mg" | "milligram" | "milligrams" => Some(G_PER_MG),
        "kg" | "kilogram" | "kilograms" => Some(G_PER_KG),
        "oz" | "ounce" | "ounces" => Some(G_PER_OZ),
        "lb" | "lbs" | "pound" | "pounds" => Some(G_PER_LB),
        _ => None,
    }
}

/// Conversion factor to milliliters for a volume unit
pub fn ml_per_unit(unit: &str) -> Option<f64> {
    match unit.trim().to_lowercase().as_str() {
        "ml" | "mlt" | "milliliter" | "milliliters" | "millilitre" | "millilitres" => Some(1.0),
        "cl" | "centiliter" | "centilitre" => Some(ML_PER_CL),
        "dl" | "deciliter" | "decilitre" => Some(ML_PER_DL),
        "l" | "liter" | "liters" | "litre" | "litres" => Some(ML_PER_LITER),
        "tsp" | "teaspoon" | "teaspoons" => Some(ML_PER_TSP),
        "tbsp" | "tablespoon" | "tablespoons" => Some(ML_PER_TBSP),
        "fl oz" | "floz" | "fl. oz" | "fluid ounce" | "fluid ounces" => Some(ML_PER_FL_OZ),
        "cup" | "cups" => Some(ML_PER_CUP),
        _ => None,
    }
}

pub fn categorize_unit(unit: &str) -> UnitCategory {
    let lower = unit.trim().to_lowercase();

    if grams_per_unit(&lower).is_some() {
        return UnitCategory::Weight;
    }
    if ml_per_unit(&lower).is_some() {
        return UnitCategory::Volume;
    }

    match lower.as_str() {
        "" | "each" | "piece" | "pieces" | "item" | "items" | "unit" | "units" | "serving"
        | "servings" => UnitCategory::Count,
        _ => UnitCategory::Custom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_units() {
        assert_eq!(categorize_unit("g"), UnitCategory::Weight);
        assert_eq!(categorize_unit("OZ"), UnitCategory::Weight);
        assert_eq!(categorize_unit("tbsp"), UnitCategory::Volume);
        assert_eq!(categorize_unit("cl"), UnitCategory::Volume);
        assert_eq!(categorize_unit("each"), UnitCategory::Count);
        assert_eq!(categorize_unit("slice"), UnitCategory::Custom);
    }

    #[test]
    fn test_factors() {
        assert_eq!(grams_per_unit("GRM"), Some(1.0));
        assert_eq!(grams_per_unit("lb"), Some(G_PER_LB));
        assert_eq!(ml_per_unit("cup"), Some(ML_PER_CUP));
        assert_eq!(ml_per_unit("g"), None);
    }
}
