//! Open Food Facts
//!
//! Barcode product database. Nutriments are keyed per 100 g
//! (`proteins_100g`, `carbohydrates_100g`, `fat_100g`, `energy-kcal_100g`)
//! and values arrive as numbers or numeric strings.

use async_trait::async_trait;
use serde::Deserialize;

use super::{
    is_valid_barcode, lenient_f64, FoodCandidate, FoodLookup, RawFood, RawMacros,
    SourceError, SourceKind,
};
use crate::config::SourcesConfig;
use crate::nutrition::{serving_grams, ServingGrams};

/// Fields requested from the product API
const PRODUCT_FIELDS: &str =
    "code,product_name,generic_name,brands,serving_size,serving_quantity,nutriments";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OffNutriments {
    #[serde(rename = "energy-kcal_100g", default, deserialize_with = "lenient_f64")]
    pub energy_kcal_100g: Option<f64>,
    #[serde(rename = "proteins_100g", default, deserialize_with = "lenient_f64")]
    pub proteins_100g: Option<f64>,
    #[serde(rename = "carbohydrates_100g", default, deserialize_with = "lenient_f64")]
    pub carbohydrates_100g: Option<f64>,
    #[serde(rename = "fat_100g", default, deserialize_with = "lenient_f64")]
    pub fat_100g: Option<f64>,
}

/// A product record as returned by Open Food Facts
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OffProduct {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub generic_name: Option<String>,
    /// Comma-separated brand list
    #[serde(default)]
    pub brands: Option<String>,
    /// Free text, e.g. "2 tbsp (32 g)"
    #[serde(default)]
    pub serving_size: Option<String>,
    /// Grams in one serving, when the database computed it
    #[serde(default, deserialize_with = "lenient_f64")]
    pub serving_quantity: Option<f64>,
    #[serde(default)]
    pub nutriments: OffNutriments,
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    /// 1 when found, 0 otherwise
    #[serde(default)]
    status: i64,
    #[serde(default)]
    product: Option<OffProduct>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    products: Vec<OffProduct>,
}

impl OffProduct {
    pub(crate) fn raw_macros(&self) -> RawMacros {
        RawMacros {
            calories: self.nutriments.energy_kcal_100g,
            protein: self.nutriments.proteins_100g,
            carbs: self.nutriments.carbohydrates_100g,
            fat: self.nutriments.fat_100g,
        }
    }

    /// `serving_quantity` when positive, otherwise the parsed `serving_size` text
    pub(crate) fn serving_grams(&self) -> Option<ServingGrams> {
        if let Some(q) = self.serving_quantity.filter(|q| q.is_finite() && *q > 0.0) {
            return Some(ServingGrams { grams: q, approximate: false });
        }
        self.serving_size.as_deref().and_then(serving_grams)
    }

    pub(crate) fn display_name(&self) -> String {
        [&self.product_name, &self.generic_name]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.code.clone())
            .unwrap_or_else(|| "Unnamed product".to_string())
    }

    pub(crate) fn first_brand(&self) -> Option<String> {
        self.brands
            .as_deref()
            .and_then(|b| b.split(',').next())
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
    }

    /// Products without any macro data are useless for logging
    pub(crate) fn has_nutrition(&self) -> bool {
        let n = &self.nutriments;
        n.energy_kcal_100g.is_some()
            || n.proteins_100g.is_some()
            || n.carbohydrates_100g.is_some()
            || n.fat_100g.is_some()
    }
}

/// Decode a product API body. `Ok(None)` when the barcode is unknown.
pub fn parse_product_response(body: &str) -> Result<Option<OffProduct>, SourceError> {
    let response: ProductResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;
    if response.status != 1 {
        return Ok(None);
    }
    Ok(response.product)
}

/// Decode a search API body, dropping products without nutrition
pub fn parse_search_response(body: &str) -> Result<Vec<OffProduct>, SourceError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;
    Ok(response
        .products
        .into_iter()
        .filter(OffProduct::has_nutrition)
        .collect())
}

/// HTTP client for the Open Food Facts API
pub struct OpenFoodFactsClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            base_url: config.off_base_url.clone(),
        })
    }

    fn product_request(&self, barcode: &str) -> Result<reqwest::Request, SourceError> {
        let url = format!("{}/api/v2/product/{}.json", self.base_url, barcode);
        Ok(self.http.get(url).query(&[("fields", PRODUCT_FIELDS)]).build()?)
    }

    fn search_request(&self, query: &str, limit: usize) -> Result<reqwest::Request, SourceError> {
        let url = format!("{}/cgi/search.pl", self.base_url);
        let page_size = limit.to_string();
        Ok(self
            .http
            .get(url)
            .query(&[
                ("search_terms", query.trim()),
                ("search_simple", "1"),
                ("action", "process"),
                ("json", "1"),
                ("page_size", page_size.as_str()),
                ("fields", PRODUCT_FIELDS),
            ])
            .build()?)
    }

    async fn get_text(&self, request: reqwest::Request) -> Result<String, SourceError> {
        let url = request.url().to_string();
        tracing::debug!("GET {}", url);
        let response = self.http.execute(request).await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            // Unknown barcodes come back as 404 with a status-0 body
            return Ok(response.text().await?);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl FoodLookup for OpenFoodFactsClient {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenFoodFacts
    }

    async fn lookup_barcode(&self, barcode: &str) -> Result<Option<FoodCandidate>, SourceError> {
        let barcode = barcode.trim();
        if !is_valid_barcode(barcode) {
            return Ok(None);
        }

        let body = self.get_text(self.product_request(barcode)?).await?;
        let product = parse_product_response(&body)?;

        match product {
            Some(mut product) if product.has_nutrition() => {
                if product.code.is_none() {
                    product.code = Some(barcode.to_string());
                }
                Ok(Some(RawFood::OpenFoodFacts(product).into_candidate()))
            }
            Some(_) => {
                tracing::info!("Open Food Facts product {} has no nutrition data", barcode);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<FoodCandidate>, SourceError> {
        let body = self.get_text(self.search_request(query, limit)?).await?;
        let products = parse_search_response(&body)?;

        Ok(products
            .into_iter()
            .take(limit)
            .map(|p| RawFood::OpenFoodFacts(p).into_candidate())
            .collect())
    }

    /// Products are keyed by barcode
    async fn fetch(&self, source_ref: &str) -> Result<Option<FoodCandidate>, SourceError> {
        self.lookup_barcode(source_ref).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenFoodFactsClient {
        OpenFoodFactsClient::new(&SourcesConfig::default()).unwrap()
    }

    #[test]
    fn test_search_request_encodes_terms() {
        let request = client().search_request(" café & crème 50% ", 5).unwrap();
        assert_eq!(request.url().path(), "/cgi/search.pl");

        let pairs: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        assert!(pairs.contains(&("search_terms".to_string(), "café & crème 50%".to_string())));
        assert!(pairs.contains(&("page_size".to_string(), "5".to_string())));
        assert!(pairs.contains(&("json".to_string(), "1".to_string())));
        assert_eq!(pairs.iter().filter(|(k, _)| k == "search_terms").count(), 1);
    }

    #[test]
    fn test_product_request_path() {
        let request = client().product_request("3017620422003").unwrap();
        assert_eq!(request.url().path(), "/api/v2/product/3017620422003.json");
        assert_eq!(
            request.url().query_pairs().find(|(k, _)| k == "fields").map(|(_, v)| v.into_owned()),
            Some(PRODUCT_FIELDS.to_string())
        );
    }

    const NUTELLA: &str = r#"{
        "code": "3017620422003",
        "status": 1,
        "status_verbose": "product found",
        "product": {
            "code": "3017620422003",
            "product_name": "Nutella",
            "brands": "Ferrero, Nutella",
            "serving_size": "15 g",
            "serving_quantity": "15",
            "nutriments": {
                "energy-kcal_100g": 539,
                "proteins_100g": 6.3,
                "carbohydrates_100g": 57.5,
                "fat_100g": "30.9"
            }
        }
    }"#;

    #[test]
    fn test_parse_product() {
        let product = parse_product_response(NUTELLA).unwrap().unwrap();
        assert_eq!(product.display_name(), "Nutella");
        assert_eq!(product.first_brand().as_deref(), Some("Ferrero"));
        assert_eq!(product.nutriments.fat_100g, Some(30.9));

        let candidate = RawFood::OpenFoodFacts(product).into_candidate();
        assert_eq!(candidate.source, SourceKind::OpenFoodFacts);
        assert_eq!(candidate.source_ref, "3017620422003");
        assert_eq!(candidate.profile.calories_per_100g, 539.0);
        assert_eq!(candidate.default_serving.serving_size_grams, 15.0);
        assert_eq!(candidate.default_serving.number_of_servings, 1.0);
        assert!(!candidate.serving_approximate);
    }

    #[test]
    fn test_product_not_found() {
        let body = r#"{"code": "0000000000000", "status": 0, "status_verbose": "product not found"}"#;
        assert!(parse_product_response(body).unwrap().is_none());
    }

    #[test]
    fn test_missing_kcal_is_derived() {
        let body = r#"{"status": 1, "product": {
            "product_name": "Plain oats",
            "serving_size": "1/2 cup (40 g)",
            "nutriments": {"proteins_100g": 10, "carbohydrates_100g": 20, "fat_100g": 5}
        }}"#;
        let product = parse_product_response(body).unwrap().unwrap();
        let raw = RawFood::OpenFoodFacts(product);
        assert_eq!(raw.to_profile().calories_per_100g, 165.0);

        let (serving, approximate) = raw.default_serving();
        assert_eq!(serving.serving_size_grams, 40.0);
        assert!(!approximate);
    }

    #[test]
    fn test_unresolvable_serving_defaults_to_100g() {
        let body = r#"{"status": 1, "product": {
            "product_name": "Bagel",
            "serving_size": "1 bagel",
            "nutriments": {"energy-kcal_100g": 250}
        }}"#;
        let raw = RawFood::OpenFoodFacts(parse_product_response(body).unwrap().unwrap());
        assert_eq!(raw.default_serving().0.serving_size_grams, 100.0);
        assert_eq!(raw.to_profile().protein_per_100g, 0.0);
    }

    #[test]
    fn test_search_drops_products_without_nutrition() {
        let body = r#"{"count": 2, "products": [
            {"code": "1", "product_name": "Empty"},
            {"code": "2", "product_name": "Milk", "nutriments": {"energy-kcal_100g": 64}}
        ]}"#;
        let products = parse_search_response(body).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].display_name(), "Milk");
    }

    #[test]
    fn test_display_name_fallbacks() {
        let product = OffProduct {
            code: Some("123".to_string()),
            product_name: Some("  ".to_string()),
            generic_name: Some("Spread".to_string()),
            ..Default::default()
        };
        assert_eq!(product.display_name(), "Spread");

        let product = OffProduct {
            code: Some("123".to_string()),
            ..Default::default()
        };
        assert_eq!(product.display_name(), "123");
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_product_response("not json"),
            Err(SourceError::Decode(_))
        ));
    }
}
