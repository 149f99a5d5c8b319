//! Upstream food databases
//!
//! Raw records from Open Food Facts and USDA FoodData Central are kept as a
//! tagged union and mapped into the canonical `NutrientProfile` here. Raw
//! field names never leave this module; callers only see `FoodCandidate`.

pub mod openfoodfacts;
pub mod usda;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::models::{NutrientProfile, ServingSpec};
use crate::nutrition::derive_calories;

pub use openfoodfacts::{OffProduct, OpenFoodFactsClient};
pub use usda::{FdcFood, FoodDataCentralClient};

/// Grams assumed when a source declares no usable serving
pub const DEFAULT_SERVING_GRAMS: f64 = 100.0;

/// Where a food record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    OpenFoodFacts,
    FoodDataCentral,
    Manual,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::OpenFoodFacts => "open_food_facts",
            SourceKind::FoodDataCentral => "food_data_central",
            SourceKind::Manual => "manual",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "open_food_facts" | "off" | "openfoodfacts" => SourceKind::OpenFoodFacts,
            "food_data_central" | "fdc" | "usda" => SourceKind::FoodDataCentral,
            _ => SourceKind::Manual,
        }
    }
}

/// Lookup errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("No API key configured for {0}")]
    MissingApiKey(&'static str),
}

/// A raw upstream record, one variant per source schema
#[derive(Debug, Clone)]
pub enum RawFood {
    OpenFoodFacts(OffProduct),
    FoodDataCentral(FdcFood),
}

/// Macro grams and optional labelled calories pulled from a raw record
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawMacros {
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

impl RawMacros {
    /// Missing macros become 0. A labelled calorie value wins when present and
    /// positive; otherwise calories are derived from the macro grams.
    pub fn into_profile(self) -> NutrientProfile {
        let clean = |v: Option<f64>| v.filter(|x| x.is_finite() && *x >= 0.0).unwrap_or(0.0);

        let protein = clean(self.protein);
        let carbs = clean(self.carbs);
        let fat = clean(self.fat);
        let calories = self
            .calories
            .filter(|c| c.is_finite() && *c > 0.0)
            .unwrap_or_else(|| derive_calories(protein, carbs, fat));

        NutrientProfile::new(calories, protein, carbs, fat)
    }
}

/// A food resolved from an upstream source, ready to be logged
#[derive(Debug, Clone, Serialize)]
pub struct FoodCandidate {
    pub source: SourceKind,
    /// Barcode or FDC id
    pub source_ref: String,
    pub name: String,
    pub brand: Option<String>,
    pub profile: NutrientProfile,
    /// One serving as declared by the source
    pub default_serving: ServingSpec,
    /// The source's own serving description, if any
    pub serving_label: Option<String>,
    /// True when the serving grams were estimated from a volume
    pub serving_approximate: bool,
}

impl RawFood {
    pub fn source(&self) -> SourceKind {
        match self {
            RawFood::OpenFoodFacts(_) => SourceKind::OpenFoodFacts,
            RawFood::FoodDataCentral(_) => SourceKind::FoodDataCentral,
        }
    }

    pub fn to_profile(&self) -> NutrientProfile {
        match self {
            RawFood::OpenFoodFacts(p) => p.raw_macros().into_profile(),
            RawFood::FoodDataCentral(f) => f.raw_macros().into_profile(),
        }
    }

    /// One declared serving in grams, or 100 g when it cannot be resolved.
    ///
    /// The flag is true when the grams were approximated from a volume.
    pub fn default_serving(&self) -> (ServingSpec, bool) {
        let resolved = match self {
            RawFood::OpenFoodFacts(p) => p.serving_grams(),
            RawFood::FoodDataCentral(f) => f.serving_grams(),
        };
        match resolved {
            Some(sg) => (ServingSpec::grams(sg.grams), sg.approximate),
            None => (ServingSpec::grams(DEFAULT_SERVING_GRAMS), false),
        }
    }

    pub fn into_candidate(self) -> FoodCandidate {
        let profile = self.to_profile();
        let (default_serving, serving_approximate) = self.default_serving();
        let source = self.source();

        match self {
            RawFood::OpenFoodFacts(p) => FoodCandidate {
                source,
                source_ref: p.code.clone().unwrap_or_default(),
                name: p.display_name(),
                brand: p.first_brand(),
                profile,
                default_serving,
                serving_label: p.serving_size.clone(),
                serving_approximate,
            },
            RawFood::FoodDataCentral(f) => FoodCandidate {
                source,
                source_ref: f.fdc_id.to_string(),
                name: f.description.clone(),
                brand: f.brand_owner.clone().or_else(|| f.brand_name.clone()),
                profile,
                default_serving,
                serving_label: f.serving_label(),
                serving_approximate,
            },
        }
    }
}

/// A source that resolves barcodes and text queries to foods
#[async_trait]
pub trait FoodLookup: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn lookup_barcode(&self, barcode: &str) -> Result<Option<FoodCandidate>, SourceError>;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<FoodCandidate>, SourceError>;

    /// Resolve the `source_ref` of a candidate this source produced earlier
    async fn fetch(&self, source_ref: &str) -> Result<Option<FoodCandidate>, SourceError>;
}

/// Accepts a number, a numeric string, or null
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    })
}

/// Barcodes are digits only, 8 to 14 long (EAN-8 through GTIN-14)
pub fn is_valid_barcode(barcode: &str) -> bool {
    let b = barcode.trim();
    (8..=14).contains(&b.len()) && b.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provided_calories_win() {
        // Labelled value kept even though 4/4/9 would give 165
        let raw = RawMacros {
            calories: Some(170.0),
            protein: Some(10.0),
            carbs: Some(20.0),
            fat: Some(5.0),
        };
        assert_eq!(raw.into_profile().calories_per_100g, 170.0);
    }

    #[test]
    fn test_missing_calories_derived() {
        let raw = RawMacros {
            calories: None,
            protein: Some(10.0),
            carbs: Some(20.0),
            fat: Some(5.0),
        };
        assert_eq!(raw.into_profile().calories_per_100g, 165.0);

        let zero_label = RawMacros { calories: Some(0.0), ..raw };
        assert_eq!(zero_label.into_profile().calories_per_100g, 165.0);
    }

    #[test]
    fn test_missing_macros_become_zero() {
        let raw = RawMacros {
            calories: None,
            protein: Some(3.0),
            carbs: None,
            fat: Some(-1.0),
        };
        let profile = raw.into_profile();
        assert_eq!(profile, NutrientProfile::new(12.0, 3.0, 0.0, 0.0));
    }

    #[test]
    fn test_barcode_validation() {
        assert!(is_valid_barcode("3017620422003"));
        assert!(is_valid_barcode("12345678"));
        assert!(!is_valid_barcode("1234"));
        assert!(!is_valid_barcode("30176204220a3"));
    }

    #[test]
    fn test_source_kind_round_trip() {
        for kind in [SourceKind::OpenFoodFacts, SourceKind::FoodDataCentral, SourceKind::Manual] {
            assert_eq!(SourceKind::from_str(kind.as_str()), kind);
        }
    }
}
