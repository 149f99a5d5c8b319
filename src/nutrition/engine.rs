//! Macro aggregation engine
//!
//! Pure arithmetic over nutrition records: calorie derivation, serving
//! scaling and its inverse, aggregation, and display rounding. Nothing here
//! performs I/O, logs, or mutates its arguments.

use std::borrow::Borrow;

use thiserror::Error;

use crate::models::{AggregateTotals, NutrientProfile, ScaledMacros, ServingSpec};

/// kcal per gram of protein (Atwater general factor)
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
/// kcal per gram of carbohydrate (Atwater general factor)
pub const KCAL_PER_G_CARBS: f64 = 4.0;
/// kcal per gram of fat (Atwater general factor)
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// Errors raised by the engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NutritionError {
    /// A stored item carried a serving that totals to no grams
    #[error("cannot recover per-100g values from a serving of {grams} g")]
    DegenerateServing { grams: f64 },

    /// A caller supplied a serving that is zero, negative or not a number
    #[error("invalid serving: {serving_size_grams} g x {number_of_servings} servings")]
    InvalidServing {
        serving_size_grams: f64,
        number_of_servings: f64,
    },
}

/// Calories from macro grams using the 4/4/9 Atwater factors.
///
/// No alcohol or fiber correction.
pub fn derive_calories(protein: f64, carbs: f64, fat: f64) -> f64 {
    protein * KCAL_PER_G_PROTEIN + carbs * KCAL_PER_G_CARBS + fat * KCAL_PER_G_FAT
}

/// Scale a per-100g profile to the grams described by `serving`.
///
/// Returns `None` while the serving is not yet specified (either field zero,
/// negative or non-finite) so callers can tell "no data yet" from a real zero.
/// No rounding is applied.
pub fn scale_to_serving(profile: &NutrientProfile, serving: &ServingSpec) -> Option<ScaledMacros> {
    if !serving.is_specified() {
        return None;
    }

    let factor = serving.total_grams() / 100.0;
    Some(ScaledMacros {
        calories: profile.calories_per_100g * factor,
        protein: profile.protein_per_100g * factor,
        carbs: profile.carbs_per_100g * factor,
        fat: profile.fat_per_100g * factor,
    })
}

/// Like [`scale_to_serving`] but treats an unspecified serving as an error.
pub fn try_scale_to_serving(
    profile: &NutrientProfile,
    serving: &ServingSpec,
) -> Result<ScaledMacros, NutritionError> {
    scale_to_serving(profile, serving).ok_or(NutritionError::InvalidServing {
        serving_size_grams: serving.serving_size_grams,
        number_of_servings: serving.number_of_servings,
    })
}

/// Recover the per-100g baseline from stored totals and their serving.
///
/// Every persisted item carries a positive serving, so zero grams here is a
/// broken invariant and fails instead of producing zero or NaN.
pub fn unscale_from_serving(
    scaled: &ScaledMacros,
    serving: &ServingSpec,
) -> Result<NutrientProfile, NutritionError> {
    let grams = serving.total_grams();
    if !grams.is_finite() || grams <= 0.0 {
        return Err(NutritionError::DegenerateServing { grams });
    }

    let factor = 100.0 / grams;
    Ok(NutrientProfile {
        calories_per_100g: scaled.calories * factor,
        protein_per_100g: scaled.protein * factor,
        carbs_per_100g: scaled.carbs * factor,
        fat_per_100g: scaled.fat * factor,
    })
}

/// Element-wise sum of scaled macros. Empty input yields zero totals.
pub fn aggregate<I>(items: I) -> AggregateTotals
where
    I: IntoIterator,
    I::Item: Borrow<ScaledMacros>,
{
    items
        .into_iter()
        .fold(ScaledMacros::zero(), |acc, item| acc + *item.borrow())
}

/// Round to the nearest multiple of `n` for display (e.g. a donut total to
/// the nearest 50 kcal). Halves round away from zero, so 525 → 550 at n = 50.
///
/// Display only; never feed the result into further arithmetic.
pub fn round_to_nearest_n(value: f64, n: u32) -> i64 {
    if n == 0 {
        return value.round() as i64;
    }
    let n = f64::from(n);
    ((value / n).round() * n) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b).abs() <= 1e-6 * scale
    }

    fn macros_approx_eq(a: &ScaledMacros, b: &ScaledMacros) -> bool {
        approx_eq(a.calories, b.calories)
            && approx_eq(a.protein, b.protein)
            && approx_eq(a.carbs, b.carbs)
            && approx_eq(a.fat, b.fat)
    }

    fn profile_approx_eq(a: &NutrientProfile, b: &NutrientProfile) -> bool {
        approx_eq(a.calories_per_100g, b.calories_per_100g)
            && approx_eq(a.protein_per_100g, b.protein_per_100g)
            && approx_eq(a.carbs_per_100g, b.carbs_per_100g)
            && approx_eq(a.fat_per_100g, b.fat_per_100g)
    }

    fn profile_strategy() -> impl Strategy<Value = NutrientProfile> {
        (0.0..900.0f64, 0.0..100.0f64, 0.0..100.0f64, 0.0..100.0f64)
            .prop_map(|(c, p, cb, f)| NutrientProfile::new(c, p, cb, f))
    }

    fn serving_strategy() -> impl Strategy<Value = ServingSpec> {
        (0.1..1000.0f64, 0.1..20.0f64).prop_map(|(s, n)| ServingSpec::new(s, n))
    }

    fn macros_strategy() -> impl Strategy<Value = ScaledMacros> {
        (0.0..2000.0f64, 0.0..200.0f64, 0.0..200.0f64, 0.0..200.0f64)
            .prop_map(|(c, p, cb, f)| ScaledMacros::new(c, p, cb, f))
    }

    #[test]
    fn test_derive_calories_example() {
        assert_eq!(derive_calories(10.0, 20.0, 5.0), 165.0);
        assert_eq!(derive_calories(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_scale_concrete_scenario() {
        let profile = NutrientProfile::new(200.0, 10.0, 30.0, 5.0);
        let serving = ServingSpec::new(50.0, 2.0);

        let scaled = scale_to_serving(&profile, &serving).unwrap();
        assert!(macros_approx_eq(&scaled, &ScaledMacros::new(200.0, 10.0, 30.0, 5.0)));

        let totals = aggregate([scaled, scaled]);
        assert!(macros_approx_eq(&totals, &ScaledMacros::new(400.0, 20.0, 60.0, 10.0)));
    }

    #[test]
    fn test_scale_unspecified_serving() {
        let profile = NutrientProfile::new(200.0, 10.0, 30.0, 5.0);
        assert_eq!(scale_to_serving(&profile, &ServingSpec::new(0.0, 1.0)), None);
        assert_eq!(scale_to_serving(&profile, &ServingSpec::new(30.0, 0.0)), None);
        assert_eq!(scale_to_serving(&profile, &ServingSpec::new(-30.0, 1.0)), None);

        let err = try_scale_to_serving(&profile, &ServingSpec::new(0.0, 1.0)).unwrap_err();
        assert!(matches!(err, NutritionError::InvalidServing { .. }));
    }

    #[test]
    fn test_scale_zero_profile_is_real_zero() {
        let scaled = scale_to_serving(&NutrientProfile::default(), &ServingSpec::grams(250.0));
        assert_eq!(scaled, Some(ScaledMacros::zero()));
    }

    #[test]
    fn test_unscale_degenerate_serving() {
        let scaled = ScaledMacros::new(100.0, 1.0, 1.0, 1.0);
        let err = unscale_from_serving(&scaled, &ServingSpec::new(0.0, 3.0)).unwrap_err();
        assert_eq!(err, NutritionError::DegenerateServing { grams: 0.0 });

        let err = unscale_from_serving(&scaled, &ServingSpec::new(f64::NAN, 1.0));
        assert!(err.is_err());
    }

    #[test]
    fn test_aggregate_empty_and_single() {
        let empty: Vec<ScaledMacros> = Vec::new();
        assert_eq!(aggregate(&empty), ScaledMacros::zero());

        let x = ScaledMacros::new(123.4, 5.6, 7.8, 9.1);
        assert_eq!(aggregate([x]), x);
        assert_eq!(aggregate(&[x]), x);
    }

    #[test]
    fn test_round_to_nearest_n() {
        assert_eq!(round_to_nearest_n(524.0, 50), 500);
        assert_eq!(round_to_nearest_n(525.0, 50), 550);
        assert_eq!(round_to_nearest_n(0.0, 50), 0);
        assert_eq!(round_to_nearest_n(1874.9, 100), 1900);
        assert_eq!(round_to_nearest_n(12.5, 0), 13);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_derive_calories_matches_atwater(
            p in 0.0..500.0f64,
            c in 0.0..500.0f64,
            f in 0.0..500.0f64,
        ) {
            prop_assert!(approx_eq(derive_calories(p, c, f), 4.0 * p + 4.0 * c + 9.0 * f));
        }

        #[test]
        fn prop_scale_unscale_round_trip(
            profile in profile_strategy(),
            serving in serving_strategy(),
        ) {
            let scaled = scale_to_serving(&profile, &serving).unwrap();
            let recovered = unscale_from_serving(&scaled, &serving).unwrap();
            prop_assert!(profile_approx_eq(&recovered, &profile),
                "expected {:?}, got {:?}", profile, recovered);
        }

        #[test]
        fn prop_aggregate_order_independent(
            (items, shuffled) in prop::collection::vec(macros_strategy(), 0..20)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let a = aggregate(&items);
            let b = aggregate(&shuffled);
            prop_assert!(macros_approx_eq(&a, &b), "{:?} != {:?}", a, b);
        }

        #[test]
        fn prop_scaling_indifferent_to_split(
            profile in profile_strategy(),
            size in 0.1..500.0f64,
            count in 0.1..20.0f64,
        ) {
            let split = scale_to_serving(&profile, &ServingSpec::new(size, count)).unwrap();
            let whole = scale_to_serving(&profile, &ServingSpec::new(size * count, 1.0)).unwrap();
            prop_assert!(macros_approx_eq(&split, &whole));
        }

        #[test]
        fn prop_scaled_values_non_negative(
            profile in profile_strategy(),
            serving in serving_strategy(),
        ) {
            let scaled = scale_to_serving(&profile, &serving).unwrap();
            prop_assert!(scaled.calories >= 0.0 && scaled.protein >= 0.0);
            prop_assert!(scaled.carbs >= 0.0 && scaled.fat >= 0.0);
        }
    }
}
