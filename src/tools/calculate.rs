//! Stateless macro calculation tool
//!
//! Runs the engine on a profile and serving without storing anything.

use serde::Serialize;

use crate::models::{NutrientProfile, ScaledMacros, ServingSpec};
use crate::nutrition::{scale_to_serving, serving_grams, DisplayMacros};
use crate::sources::RawMacros;
use super::TotalsView;

/// Response for calculate_macros
#[derive(Debug, Serialize)]
pub struct CalculateMacrosResponse {
    /// Per-100g values after the calorie rule was applied
    pub profile: NutrientProfile,
    pub calories_derived: bool,
    pub serving: ServingSpec,
    /// True when the serving grams were estimated from a volume
    pub serving_approximate: bool,
    /// `None` while the serving is not yet specified
    pub macros: Option<ScaledMacros>,
    pub display: Option<DisplayMacros>,
    pub totals: Option<TotalsView>,
}

/// Scale per-100g values to a serving.
///
/// Grams come from `serving_size_grams`, or from `serving_text` ("2 tbsp (28 g)")
/// when no grams are given. Missing calories are derived from the macros.
pub fn calculate_macros(
    raw: RawMacros,
    serving_size_grams: Option<f64>,
    serving_text: Option<&str>,
    number_of_servings: f64,
) -> Result<CalculateMacrosResponse, String> {
    let calories_derived = !raw.calories.is_some_and(|c| c.is_finite() && c > 0.0);
    let profile = raw.into_profile();

    let (grams, serving_approximate) = match (serving_size_grams, serving_text) {
        (Some(grams), _) => (grams, false),
        (None, Some(text)) => {
            let sg = serving_grams(text).ok_or_else(|| format!("Cannot convert serving '{}' to grams", text))?;
            (sg.grams, sg.approximate)
        }
        (None, None) => return Err("Give serving_size_grams or serving_text".to_string()),
    };

    let serving = ServingSpec::new(grams, number_of_servings);
    let macros = scale_to_serving(&profile, &serving);

    Ok(CalculateMacrosResponse {
        profile,
        calories_derived,
        serving,
        serving_approximate,
        macros,
        display: macros.map(DisplayMacros::from),
        totals: macros.map(TotalsView::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(calories: Option<f64>) -> RawMacros {
        RawMacros {
            calories,
            protein: Some(10.0),
            carbs: Some(30.0),
            fat: Some(5.0),
        }
    }

    #[test]
    fn test_scales_by_grams() {
        let response = calculate_macros(raw(Some(200.0)), Some(50.0), None, 2.0).unwrap();
        assert!(!response.calories_derived);
        assert_eq!(response.macros, Some(ScaledMacros::new(200.0, 10.0, 30.0, 5.0)));
    }

    #[test]
    fn test_derives_calories_and_parses_text() {
        let response = calculate_macros(raw(None), None, Some("1 cup (240 ml)"), 1.0).unwrap();
        assert!(response.calories_derived);
        assert_eq!(response.profile.calories_per_100g, 205.0);
        assert!(response.serving_approximate);
        assert_eq!(response.serving.serving_size_grams, 240.0);
    }

    #[test]
    fn test_unspecified_serving_has_no_macros() {
        let response = calculate_macros(raw(None), Some(100.0), None, 0.0).unwrap();
        assert!(response.macros.is_none());
        assert!(response.totals.is_none());

        assert!(calculate_macros(raw(None), None, None, 1.0).is_err());
        assert!(calculate_macros(raw(None), None, Some("a pinch"), 1.0).is_err());
    }
}
