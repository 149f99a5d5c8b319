//! Serving text conversion
//!
//! Turns free-text serving declarations from food databases ("30 g",
//! "1 cup (240 ml)", "2 tbsp (28g)", "1/2 cup") into grams so they can feed a
//! `ServingSpec`.

use serde::Serialize;

use super::units::{
    categorize_unit, grams_per_unit, ml_per_unit, ParsedServing, UnitCategory,
    WATER_DENSITY_G_PER_ML,
};

/// Grams resolved for a serving
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServingGrams {
    pub grams: f64,
    /// True when grams came from a volume through the water-density fallback
    pub approximate: bool,
}

/// Split a leading quantity off `s`.
///
/// Accepts "30", "1.5", "1,5" and "1/2". Returns the remainder untouched.
fn split_quantity(s: &str) -> (Option<f64>, &str) {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '/'))
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    let (num, rest) = s.split_at(end);
    if num.is_empty() {
        return (None, rest);
    }

    let num = num.replace(',', ".");
    let value = match num.split_once('/') {
        Some((n, d)) => match (n.parse::<f64>(), d.parse::<f64>()) {
            (Ok(n), Ok(d)) if d != 0.0 => Some(n / d),
            _ => None,
        },
        None => num.parse::<f64>().ok(),
    };

    (value, rest)
}

/// Parse an annotation such as "240 ml" or "28g" into (grams, ml)
fn parse_annotation(s: &str) -> (Option<f64>, Option<f64>) {
    let (qty, unit) = split_quantity(s);
    let Some(qty) = qty else {
        return (None, None);
    };

    let unit = unit.trim();
    if let Some(factor) = grams_per_unit(unit) {
        return (Some(qty * factor), None);
    }
    if let Some(factor) = ml_per_unit(unit) {
        return (None, Some(qty * factor));
    }
    (None, None)
}

/// Parse a serving description
///
/// Examples:
/// - "30 g" -> quantity 30, unit "g"
/// - "1 cup (240 ml)" -> quantity 1, unit "cup", annotated_ml 240
/// - "2 tbsp (28g)" -> quantity 2, unit "tbsp", annotated_grams 28
/// - "slice" -> quantity 1, unit "slice"
pub fn parse_serving_text(text: &str) -> Option<ParsedServing> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (head, annotation) = match (trimmed.find('('), trimmed.rfind(')')) {
        (Some(open), Some(close)) if close > open => {
            (trimmed[..open].trim(), Some(&trimmed[open + 1..close]))
        }
        _ => (trimmed, None),
    };

    let (quantity, unit) = split_quantity(head);
    let base_unit = unit.trim().to_lowercase();
    let (annotated_grams, annotated_ml) = annotation.map(parse_annotation).unwrap_or((None, None));

    Some(ParsedServing {
        quantity: quantity.unwrap_or(1.0),
        category: categorize_unit(&base_unit),
        base_unit,
        annotated_grams,
        annotated_ml,
    })
}

/// Convert a quantity of a weight unit to grams
pub fn to_grams(quantity: f64, unit: &str) -> Option<f64> {
    grams_per_unit(unit).map(|factor| quantity * factor)
}

/// Convert a quantity of a volume unit to milliliters
pub fn to_ml(quantity: f64, unit: &str) -> Option<f64> {
    ml_per_unit(unit).map(|factor| quantity * factor)
}

/// Resolve the grams of a parsed serving.
///
/// Order: gram annotation, weight unit, ml annotation, volume unit. Volumes go
/// through water density and are flagged approximate. Count and custom units
/// without an annotation cannot be resolved.
pub fn resolve_serving_grams(parsed: &ParsedServing) -> Option<ServingGrams> {
    let exact = |grams: f64| ServingGrams { grams, approximate: false };
    let from_volume = |ml: f64| ServingGrams {
        grams: ml * WATER_DENSITY_G_PER_ML,
        approximate: true,
    };

    let resolved = if let Some(grams) = parsed.annotated_grams {
        Some(exact(grams))
    } else if parsed.category == UnitCategory::Weight {
        to_grams(parsed.quantity, &parsed.base_unit).map(exact)
    } else if let Some(ml) = parsed.annotated_ml {
        Some(from_volume(ml))
    } else if parsed.category == UnitCategory::Volume {
        to_ml(parsed.quantity, &parsed.base_unit).map(from_volume)
    } else {
        None
    };

    resolved.filter(|r| r.grams.is_finite() && r.grams > 0.0)
}

/// Parse and resolve a serving description in one step
pub fn serving_grams(text: &str) -> Option<ServingGrams> {
    parse_serving_text(text).as_ref().and_then(resolve_serving_grams)
}

/// Grams for a numeric serving size with a separate unit (e.g. 28, "g")
pub fn serving_grams_from_parts(size: f64, unit: &str) -> Option<ServingGrams> {
    resolve_serving_grams(&ParsedServing {
        quantity: size,
        base_unit: unit.trim().to_lowercase(),
        category: categorize_unit(unit),
        annotated_grams: None,
        annotated_ml: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_parse_simple_weight() {
        let parsed = parse_serving_text("30 g").unwrap();
        assert_eq!(parsed.quantity, 30.0);
        assert_eq!(parsed.base_unit, "g");
        assert_eq!(parsed.category, UnitCategory::Weight);
        assert_eq!(parsed.annotated_grams, None);
    }

    #[test]
    fn test_parse_without_space_and_comma_decimal() {
        let parsed = parse_serving_text("1,5kg").unwrap();
        assert_eq!(parsed.quantity, 1.5);
        assert_eq!(parsed.base_unit, "kg");
    }

    #[test]
    fn test_parse_with_annotation() {
        let parsed = parse_serving_text("2 tbsp (28g)").unwrap();
        assert_eq!(parsed.quantity, 2.0);
        assert_eq!(parsed.base_unit, "tbsp");
        assert_eq!(parsed.annotated_grams, Some(28.0));

        let parsed = parse_serving_text("1 cup (240 ml)").unwrap();
        assert_eq!(parsed.annotated_ml, Some(240.0));
    }

    #[test]
    fn test_parse_fraction_and_bare_unit() {
        let parsed = parse_serving_text("1/2 cup").unwrap();
        assert_eq!(parsed.quantity, 0.5);

        let parsed = parse_serving_text("slice").unwrap();
        assert_eq!(parsed.quantity, 1.0);
        assert_eq!(parsed.category, UnitCategory::Custom);

        assert!(parse_serving_text("   ").is_none());
    }

    #[test]
    fn test_serving_grams_prefers_annotation() {
        let sg = serving_grams("2 tbsp (28 g)").unwrap();
        assert_eq!(sg, ServingGrams { grams: 28.0, approximate: false });
    }

    #[test]
    fn test_serving_grams_weight_units() {
        assert_eq!(serving_grams("30 g").unwrap().grams, 30.0);
        assert!(close(serving_grams("2 oz").unwrap().grams, 56.699));
        assert!(close(serving_grams("250 mg").unwrap().grams, 0.25));
    }

    #[test]
    fn test_serving_grams_volume_is_approximate() {
        let sg = serving_grams("250ml").unwrap();
        assert_eq!(sg.grams, 250.0);
        assert!(sg.approximate);

        let sg = serving_grams("1 slice (240 ml)").unwrap();
        assert_eq!(sg.grams, 240.0);
        assert!(sg.approximate);
    }

    #[test]
    fn test_serving_grams_unresolvable() {
        assert_eq!(serving_grams("1 slice"), None);
        assert_eq!(serving_grams("each"), None);
        assert_eq!(serving_grams("0 g"), None);
    }

    #[test]
    fn test_serving_grams_from_parts() {
        assert_eq!(serving_grams_from_parts(28.0, "GRM").unwrap().grams, 28.0);
        assert!(serving_grams_from_parts(240.0, "MLT").unwrap().approximate);
        assert_eq!(serving_grams_from_parts(1.0, "bar"), None);
    }
}
