//! Food lookup tools
//!
//! Barcode lookup and text search across the configured food databases, and
//! turning a chosen food (or a manual entry) into an item ready to log.

use std::sync::Arc;

use serde::Serialize;

use crate::config::SourcesConfig;
use crate::models::{MealItemCreate, ServingSpec};
use crate::nutrition::{scale_to_serving, serving_grams, DisplayMacros};
use crate::sources::{
    is_valid_barcode, FoodCandidate, FoodDataCentralClient, FoodLookup, OpenFoodFactsClient,
    RawMacros, SourceError, SourceKind, DEFAULT_SERVING_GRAMS,
};

/// The food databases the server queries, in priority order
#[derive(Clone)]
pub struct FoodSources {
    lookups: Vec<Arc<dyn FoodLookup>>,
}

impl FoodSources {
    pub fn new(lookups: Vec<Arc<dyn FoodLookup>>) -> Self {
        Self { lookups }
    }

    /// Open Food Facts always; FoodData Central only with an API key
    pub fn from_config(config: &SourcesConfig) -> Result<Self, SourceError> {
        let mut lookups: Vec<Arc<dyn FoodLookup>> = vec![Arc::new(OpenFoodFactsClient::new(config)?)];

        if config.usda_api_key.is_some() {
            lookups.push(Arc::new(FoodDataCentralClient::new(config)?));
        } else {
            tracing::info!("No USDA API key configured; FoodData Central lookups disabled");
        }

        Ok(Self::new(lookups))
    }

    pub fn kinds(&self) -> Vec<SourceKind> {
        self.lookups.iter().map(|l| l.kind()).collect()
    }

    fn get(&self, kind: SourceKind) -> Option<&Arc<dyn FoodLookup>> {
        self.lookups.iter().find(|l| l.kind() == kind)
    }
}

/// A candidate plus the macros of one declared serving
#[derive(Debug, Serialize)]
pub struct CandidateView {
    #[serde(flatten)]
    pub candidate: FoodCandidate,
    pub per_serving: Option<DisplayMacros>,
}

impl From<FoodCandidate> for CandidateView {
    fn from(candidate: FoodCandidate) -> Self {
        let per_serving = scale_to_serving(&candidate.profile, &candidate.default_serving)
            .map(DisplayMacros::from);
        Self {
            candidate,
            per_serving,
        }
    }
}

/// Response for lookup_barcode
#[derive(Debug, Serialize)]
pub struct LookupBarcodeResponse {
    pub barcode: String,
    pub found: bool,
    pub food: Option<CandidateView>,
    /// Sources that failed while others were tried
    pub errors: Vec<String>,
}

/// Response for search_foods
#[derive(Debug, Serialize)]
pub struct SearchFoodsResponse {
    pub query: String,
    pub results: Vec<CandidateView>,
    pub errors: Vec<String>,
}

/// Look a barcode up in each source until one knows it.
///
/// A failing source is skipped; the call only errors when every source failed.
pub async fn lookup_barcode(sources: &FoodSources, barcode: &str) -> Result<LookupBarcodeResponse, String> {
    let barcode = barcode.trim();
    if !is_valid_barcode(barcode) {
        return Err(format!("Invalid barcode '{}': expected 8 to 14 digits", barcode));
    }

    let mut errors = Vec::new();
    for lookup in &sources.lookups {
        match lookup.lookup_barcode(barcode).await {
            Ok(Some(candidate)) => {
                return Ok(LookupBarcodeResponse {
                    barcode: barcode.to_string(),
                    found: true,
                    food: Some(candidate.into()),
                    errors,
                })
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("{} barcode lookup failed: {}", lookup.kind().as_str(), e);
                errors.push(format!("{}: {}", lookup.kind().as_str(), e));
            }
        }
    }

    if !sources.lookups.is_empty() && errors.len() == sources.lookups.len() {
        return Err(format!("All food sources failed: {}", errors.join("; ")));
    }

    Ok(LookupBarcodeResponse {
        barcode: barcode.to_string(),
        found: false,
        food: None,
        errors,
    })
}

/// Search every source and concatenate the results in source order
pub async fn search_foods(sources: &FoodSources, query: &str, limit: usize) -> Result<SearchFoodsResponse, String> {
    let query = query.trim();
    if query.is_empty() {
        return Err("Search query must not be empty".to_string());
    }
    let limit = limit.clamp(1, 50);

    let mut results = Vec::new();
    let mut errors = Vec::new();
    for lookup in &sources.lookups {
        match lookup.search(query, limit).await {
            Ok(found) => results.extend(found.into_iter().map(CandidateView::from)),
            Err(e) => {
                tracing::warn!("{} search failed: {}", lookup.kind().as_str(), e);
                errors.push(format!("{}: {}", lookup.kind().as_str(), e));
            }
        }
    }

    if !sources.lookups.is_empty() && errors.len() == sources.lookups.len() {
        return Err(format!("All food sources failed: {}", errors.join("; ")));
    }

    Ok(SearchFoodsResponse {
        query: query.to_string(),
        results,
        errors,
    })
}

/// What to log: a food from a source, or a manual per-100g entry
#[derive(Debug, Clone, Default)]
pub struct FoodSelection {
    /// "open_food_facts" or "food_data_central"; inferred from `source_ref` if absent
    pub source: Option<String>,
    /// Barcode or FDC id
    pub source_ref: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub calories_per_100g: Option<f64>,
    pub protein_per_100g: Option<f64>,
    pub carbs_per_100g: Option<f64>,
    pub fat_per_100g: Option<f64>,
    /// Grams in one serving; overrides the source's declaration
    pub serving_size_grams: Option<f64>,
    /// Free-text serving such as "1 cup (240 ml)", used when grams are absent
    pub serving_text: Option<String>,
    pub number_of_servings: f64,
}

impl FoodSelection {
    fn serving_override(&self) -> Result<Option<f64>, String> {
        if let Some(grams) = self.serving_size_grams {
            return Ok(Some(grams));
        }
        match self.serving_text.as_deref() {
            Some(text) => serving_grams(text)
                .map(|sg| Some(sg.grams))
                .ok_or_else(|| format!("Cannot convert serving '{}' to grams", text)),
            None => Ok(None),
        }
    }
}

/// Resolve a selection into the data for a new item.
///
/// Source foods are re-fetched so the logged snapshot is current. Manual
/// entries go through the same calorie rule as source records.
pub async fn resolve_item(sources: &FoodSources, selection: &FoodSelection) -> Result<MealItemCreate, String> {
    let serving_override = selection.serving_override()?;

    let mut data = match selection.source_ref.as_deref().map(str::trim) {
        Some(source_ref) if !source_ref.is_empty() => {
            let kind = match selection.source.as_deref() {
                Some(s) => SourceKind::from_str(s),
                None if is_valid_barcode(source_ref) => SourceKind::OpenFoodFacts,
                None => SourceKind::FoodDataCentral,
            };
            let lookup = sources
                .get(kind)
                .ok_or_else(|| format!("Food source {} is not configured", kind.as_str()))?;

            let candidate = lookup
                .fetch(source_ref)
                .await
                .map_err(|e| format!("Lookup failed: {}", e))?
                .ok_or_else(|| format!("No food found for {} in {}", source_ref, kind.as_str()))?;

            MealItemCreate::from_candidate(&candidate, selection.number_of_servings)
        }
        _ => {
            let name = selection
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .ok_or("A manual food needs a name (or give source_ref to look one up)")?;

            let profile = RawMacros {
                calories: selection.calories_per_100g,
                protein: selection.protein_per_100g,
                carbs: selection.carbs_per_100g,
                fat: selection.fat_per_100g,
            }
            .into_profile();

            MealItemCreate {
                name,
                brand: selection.brand.clone(),
                source: SourceKind::Manual,
                source_ref: None,
                profile,
                serving: ServingSpec::new(DEFAULT_SERVING_GRAMS, selection.number_of_servings),
            }
        }
    };

    if let Some(grams) = serving_override {
        data.serving.serving_size_grams = grams;
    }
    if let Some(name) = selection.name.as_ref().filter(|n| !n.trim().is_empty()) {
        data.name = name.trim().to_string();
    }
    if selection.brand.is_some() {
        data.brand = selection.brand.clone();
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::models::NutrientProfile;

    struct FakeLookup {
        kind: SourceKind,
        foods: Vec<FoodCandidate>,
        broken: bool,
    }

    impl FakeLookup {
        fn candidate(kind: SourceKind, source_ref: &str, name: &str) -> FoodCandidate {
            FoodCandidate {
                source: kind,
                source_ref: source_ref.to_string(),
                name: name.to_string(),
                brand: None,
                profile: NutrientProfile::new(200.0, 10.0, 30.0, 5.0),
                default_serving: ServingSpec::grams(50.0),
                serving_label: Some("50 g".to_string()),
                serving_approximate: false,
            }
        }

        fn failure() -> SourceError {
            SourceError::Status {
                status: 503,
                url: "http://fake".to_string(),
            }
        }
    }

    #[async_trait]
    impl FoodLookup for FakeLookup {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn lookup_barcode(&self, barcode: &str) -> Result<Option<FoodCandidate>, SourceError> {
            if self.broken {
                return Err(Self::failure());
            }
            Ok(self.foods.iter().find(|f| f.source_ref == barcode).cloned())
        }

        async fn search(&self, query: &str, limit: usize) -> Result<Vec<FoodCandidate>, SourceError> {
            if self.broken {
                return Err(Self::failure());
            }
            let query = query.to_lowercase();
            Ok(self
                .foods
                .iter()
                .filter(|f| f.name.to_lowercase().contains(&query))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn fetch(&self, source_ref: &str) -> Result<Option<FoodCandidate>, SourceError> {
            self.lookup_barcode(source_ref).await
        }
    }

    fn sources(off_broken: bool) -> FoodSources {
        let off = FakeLookup {
            kind: SourceKind::OpenFoodFacts,
            foods: vec![FakeLookup::candidate(SourceKind::OpenFoodFacts, "3017620422003", "Hazelnut spread")],
            broken: off_broken,
        };
        let fdc = FakeLookup {
            kind: SourceKind::FoodDataCentral,
            foods: vec![
                FakeLookup::candidate(SourceKind::FoodDataCentral, "12345678", "Peanut spread"),
                FakeLookup::candidate(SourceKind::FoodDataCentral, "170567", "Almond butter"),
            ],
            broken: false,
        };
        FoodSources::new(vec![Arc::new(off), Arc::new(fdc)])
    }

    #[tokio::test]
    async fn test_barcode_falls_through_sources() {
        let response = lookup_barcode(&sources(false), "12345678").await.unwrap();
        assert!(response.found);
        let food = response.food.unwrap();
        assert_eq!(food.candidate.source, SourceKind::FoodDataCentral);
        assert_eq!(food.per_serving.unwrap().calories, 100.0);
    }

    #[tokio::test]
    async fn test_barcode_survives_one_broken_source() {
        let response = lookup_barcode(&sources(true), "00000000").await.unwrap();
        assert!(!response.found);
        assert_eq!(response.errors.len(), 1);

        assert!(lookup_barcode(&sources(false), "abc").await.is_err());
    }

    #[tokio::test]
    async fn test_search_merges_sources() {
        let response = search_foods(&sources(false), "spread", 10).await.unwrap();
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].candidate.source, SourceKind::OpenFoodFacts);
        assert!(search_foods(&sources(false), "  ", 10).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_source_item() {
        let selection = FoodSelection {
            source_ref: Some("3017620422003".to_string()),
            number_of_servings: 2.0,
            ..Default::default()
        };
        let data = resolve_item(&sources(false), &selection).await.unwrap();
        assert_eq!(data.source, SourceKind::OpenFoodFacts);
        assert_eq!(data.serving, ServingSpec::new(50.0, 2.0));

        let selection = FoodSelection {
            source: Some("fdc".to_string()),
            source_ref: Some("170567".to_string()),
            serving_text: Some("1 oz".to_string()),
            number_of_servings: 1.0,
            ..Default::default()
        };
        let data = resolve_item(&sources(false), &selection).await.unwrap();
        assert_eq!(data.name, "Almond butter");
        assert!((data.serving.serving_size_grams - 28.3495).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_resolve_manual_item() {
        let selection = FoodSelection {
            name: Some("Homemade bread".to_string()),
            protein_per_100g: Some(10.0),
            carbs_per_100g: Some(20.0),
            fat_per_100g: Some(5.0),
            number_of_servings: 1.0,
            ..Default::default()
        };
        let data = resolve_item(&sources(false), &selection).await.unwrap();
        assert_eq!(data.source, SourceKind::Manual);
        assert_eq!(data.profile.calories_per_100g, 165.0);
        assert_eq!(data.serving.serving_size_grams, DEFAULT_SERVING_GRAMS);

        let nameless = FoodSelection {
            number_of_servings: 1.0,
            ..Default::default()
        };
        assert!(resolve_item(&sources(false), &nameless).await.is_err());

        let bad_text = FoodSelection {
            name: Some("Soup".to_string()),
            serving_text: Some("1 bowl".to_string()),
            number_of_servings: 1.0,
            ..Default::default()
        };
        assert!(resolve_item(&sources(false), &bad_text).await.is_err());
    }
}
