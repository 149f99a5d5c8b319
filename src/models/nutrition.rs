//! Shared nutrition records
//!
//! Per-100g profiles, serving specs, scaled macros and aggregate totals.
//! The arithmetic over these lives in `crate::nutrition::engine`.

use serde::{Deserialize, Serialize};

/// Per-100g nutrient baseline for a food
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientProfile {
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,  // grams
    pub carbs_per_100g: f64,    // grams
    pub fat_per_100g: f64,      // grams
}

impl NutrientProfile {
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories_per_100g: calories,
            protein_per_100g: protein,
            carbs_per_100g: carbs,
            fat_per_100g: fat,
        }
    }

    /// True when every field is finite and non-negative
    pub fn is_valid(&self) -> bool {
        [
            self.calories_per_100g,
            self.protein_per_100g,
            self.carbs_per_100g,
            self.fat_per_100g,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// User-chosen quantity of a food
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServingSpec {
    /// Grams in a single serving, as declared by the source
    pub serving_size_grams: f64,
    /// User multiplier
    pub number_of_servings: f64,
}

impl ServingSpec {
    pub fn new(serving_size_grams: f64, number_of_servings: f64) -> Self {
        Self {
            serving_size_grams,
            number_of_servings,
        }
    }

    /// A single serving of `grams`
    pub fn grams(grams: f64) -> Self {
        Self::new(grams, 1.0)
    }

    pub fn total_grams(&self) -> f64 {
        self.serving_size_grams * self.number_of_servings
    }

    /// Both fields are finite and strictly positive
    pub fn is_specified(&self) -> bool {
        self.serving_size_grams.is_finite()
            && self.number_of_servings.is_finite()
            && self.serving_size_grams > 0.0
            && self.number_of_servings > 0.0
    }
}

/// Calorie and macro amounts for a specific consumed quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaledMacros {
    pub calories: f64,
    pub protein: f64,  // grams
    pub carbs: f64,    // grams
    pub fat: f64,      // grams
}

/// Sum of scaled macros across a meal, day or menu.
///
/// Always derivable from its members; persisted only as a cache.
pub type AggregateTotals = ScaledMacros;

impl ScaledMacros {
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.calories == 0.0 && self.protein == 0.0 && self.carbs == 0.0 && self.fat == 0.0
    }
}

impl std::ops::Add for ScaledMacros {
    type Output = ScaledMacros;

    fn add(self, other: ScaledMacros) -> ScaledMacros {
        ScaledMacros {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fat: self.fat + other.fat,
        }
    }
}

impl<'a> std::ops::Add<&'a ScaledMacros> for ScaledMacros {
    type Output = ScaledMacros;

    fn add(self, other: &'a ScaledMacros) -> ScaledMacros {
        self + *other
    }
}

impl std::iter::Sum for ScaledMacros {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ScaledMacros::zero(), |acc, m| acc + m)
    }
}

impl<'a> std::iter::Sum<&'a ScaledMacros> for ScaledMacros {
    fn sum<I: Iterator<Item = &'a ScaledMacros>>(iter: I) -> Self {
        iter.fold(ScaledMacros::zero(), |acc, m| acc + m)
    }
}

/// Daily calorie and macro targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroGoals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}
