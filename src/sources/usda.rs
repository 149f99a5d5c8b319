//! USDA FoodData Central
//!
//! Government food-composition database. Nutrients arrive as a list of named
//! entries (`"Protein"`, `"Carbohydrate, by difference"`,
//! `"Total lipid (fat)"`, `"Energy"`), per 100 g. Search results and food
//! detail responses use different entry shapes; both are accepted.
//!
//! API reference: <https://fdc.nal.usda.gov/api-guide.html>

use async_trait::async_trait;
use serde::Deserialize;

use super::{is_valid_barcode, FoodCandidate, FoodLookup, RawFood, RawMacros, SourceError, SourceKind};
use crate::config::SourcesConfig;
use crate::nutrition::{serving_grams_from_parts, ServingGrams};

pub const NUTRIENT_PROTEIN: &str = "Protein";
pub const NUTRIENT_CARBS: &str = "Carbohydrate, by difference";
pub const NUTRIENT_FAT: &str = "Total lipid (fat)";
pub const NUTRIENT_ENERGY: &str = "Energy";

#[derive(Debug, Clone, Deserialize)]
pub struct FdcNutrientInfo {
    pub name: String,
    #[serde(rename = "unitName", default)]
    pub unit_name: Option<String>,
}

/// A nutrient entry in either search (`nutrientName`/`value`) or detail
/// (`nutrient{..}`/`amount`) shape
#[derive(Debug, Clone, Deserialize)]
pub struct FdcNutrient {
    #[serde(rename = "nutrientName", default)]
    pub nutrient_name: Option<String>,
    #[serde(rename = "unitName", default)]
    pub unit_name: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub nutrient: Option<FdcNutrientInfo>,
    #[serde(default)]
    pub amount: Option<f64>,
}

impl FdcNutrient {
    pub fn name(&self) -> Option<&str> {
        self.nutrient_name
            .as_deref()
            .or_else(|| self.nutrient.as_ref().map(|n| n.name.as_str()))
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit_name
            .as_deref()
            .or_else(|| self.nutrient.as_ref().and_then(|n| n.unit_name.as_deref()))
    }

    pub fn quantity(&self) -> Option<f64> {
        self.value.or(self.amount)
    }
}

/// A food record from FoodData Central
#[derive(Debug, Clone, Deserialize)]
pub struct FdcFood {
    #[serde(rename = "fdcId")]
    pub fdc_id: u64,
    pub description: String,
    #[serde(rename = "dataType", default)]
    pub data_type: Option<String>,
    #[serde(rename = "brandOwner", default)]
    pub brand_owner: Option<String>,
    #[serde(rename = "brandName", default)]
    pub brand_name: Option<String>,
    #[serde(rename = "gtinUpc", default)]
    pub gtin_upc: Option<String>,
    #[serde(rename = "servingSize", default)]
    pub serving_size: Option<f64>,
    #[serde(rename = "servingSizeUnit", default)]
    pub serving_size_unit: Option<String>,
    #[serde(rename = "householdServingFullText", default)]
    pub household_serving: Option<String>,
    #[serde(rename = "foodNutrients", default)]
    pub food_nutrients: Vec<FdcNutrient>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<FdcFood>,
}

impl FdcFood {
    fn nutrient(&self, name: &str) -> Option<f64> {
        self.food_nutrients
            .iter()
            .find(|n| n.name() == Some(name))
            .and_then(FdcNutrient::quantity)
    }

    /// First energy entry expressed in kcal; kJ entries are skipped
    fn energy_kcal(&self) -> Option<f64> {
        self.food_nutrients
            .iter()
            .filter(|n| n.name().map_or(false, |name| name.starts_with(NUTRIENT_ENERGY)))
            .find(|n| n.unit().map_or(false, |u| u.eq_ignore_ascii_case("kcal")))
            .and_then(FdcNutrient::quantity)
    }

    pub(crate) fn raw_macros(&self) -> RawMacros {
        RawMacros {
            calories: self.energy_kcal(),
            protein: self.nutrient(NUTRIENT_PROTEIN),
            carbs: self.nutrient(NUTRIENT_CARBS),
            fat: self.nutrient(NUTRIENT_FAT),
        }
    }

    pub(crate) fn serving_grams(&self) -> Option<ServingGrams> {
        match (self.serving_size, self.serving_size_unit.as_deref()) {
            (Some(size), Some(unit)) => serving_grams_from_parts(size, unit),
            _ => None,
        }
    }

    pub(crate) fn serving_label(&self) -> Option<String> {
        if let Some(text) = self.household_serving.as_deref().filter(|t| !t.trim().is_empty()) {
            return Some(text.trim().to_string());
        }
        match (self.serving_size, self.serving_size_unit.as_deref()) {
            (Some(size), Some(unit)) => Some(format!("{} {}", size, unit.to_lowercase())),
            _ => None,
        }
    }

    /// GTIN comparison ignoring leading zeros (UPC-A vs EAN-13 padding)
    fn matches_barcode(&self, barcode: &str) -> bool {
        self.gtin_upc
            .as_deref()
            .map_or(false, |g| g.trim_start_matches('0') == barcode.trim_start_matches('0'))
    }
}

/// Decode a `/foods/search` response body
pub fn parse_search_response(body: &str) -> Result<Vec<FdcFood>, SourceError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))?;
    Ok(response.foods)
}

/// Decode a `/food/{fdcId}` response body
pub fn parse_food_response(body: &str) -> Result<FdcFood, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))
}

/// HTTP client for FoodData Central
pub struct FoodDataCentralClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl FoodDataCentralClient {
    pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            base_url: config.usda_base_url.clone(),
            api_key: config.usda_api_key.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, SourceError> {
        self.api_key
            .as_deref()
            .ok_or(SourceError::MissingApiKey("FoodData Central"))
    }

    fn search_request(
        &self,
        query: &str,
        limit: usize,
        data_type: Option<&str>,
    ) -> Result<reqwest::Request, SourceError> {
        let page_size = limit.to_string();
        let mut params = vec![("query", query.trim()), ("pageSize", page_size.as_str())];
        if let Some(dt) = data_type {
            params.push(("dataType", dt));
        }
        tracing::debug!("GET {}/foods/search {:?}", self.base_url, params);

        params.push(("api_key", self.api_key()?));
        Ok(self
            .http
            .get(format!("{}/foods/search", self.base_url))
            .query(&params)
            .build()?)
    }

    async fn search_foods(
        &self,
        query: &str,
        limit: usize,
        data_type: Option<&str>,
    ) -> Result<Vec<FdcFood>, SourceError> {
        let request = self.search_request(query, limit, data_type)?;
        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: format!("{}/foods/search", self.base_url),
            });
        }

        parse_search_response(&response.text().await?)
    }

    /// Fetch a single food by FDC id
    pub async fn get_food(&self, fdc_id: u64) -> Result<Option<FoodCandidate>, SourceError> {
        let url = format!("{}/food/{}", self.base_url, fdc_id);
        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.api_key()?)])
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let food = parse_food_response(&response.text().await?)?;
        Ok(Some(RawFood::FoodDataCentral(food).into_candidate()))
    }
}

#[async_trait]
impl FoodLookup for FoodDataCentralClient {
    fn kind(&self) -> SourceKind {
        SourceKind::FoodDataCentral
    }

    /// Branded foods carry a GTIN/UPC; search for it and keep an exact match
    async fn lookup_barcode(&self, barcode: &str) -> Result<Option<FoodCandidate>, SourceError> {
        let barcode = barcode.trim();
        if !is_valid_barcode(barcode) {
            return Ok(None);
        }

        let foods = self.search_foods(barcode, 10, Some("Branded")).await?;
        Ok(foods
            .into_iter()
            .find(|f| f.matches_barcode(barcode))
            .map(|f| RawFood::FoodDataCentral(f).into_candidate()))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<FoodCandidate>, SourceError> {
        let foods = self.search_foods(query, limit, None).await?;
        Ok(foods
            .into_iter()
            .take(limit)
            .map(|f| RawFood::FoodDataCentral(f).into_candidate())
            .collect())
    }

    async fn fetch(&self, source_ref: &str) -> Result<Option<FoodCandidate>, SourceError> {
        match source_ref.trim().parse::<u64>() {
            Ok(fdc_id) => self.get_food(fdc_id).await,
            Err(_) => Ok(None),
        }
    }
}
