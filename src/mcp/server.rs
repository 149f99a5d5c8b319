//! MacroLog MCP Server Implementation
//!
//! Exposes the logging, menu, goal and lookup tools over MCP.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{MacroGoals, MealType};
use crate::sources::RawMacros;
use crate::tools::calculate;
use crate::tools::days;
use crate::tools::foods::{self, FoodSelection, FoodSources};
use crate::tools::goals;
use crate::tools::meals;
use crate::tools::menus;
use crate::tools::status::StatusTracker;

/// MacroLog MCP Service
#[derive(Clone)]
pub struct MacroLogService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    sources: FoodSources,
    tool_router: ToolRouter<MacroLogService>,
}

impl MacroLogService {
    pub fn new(database_path: PathBuf, database: Database, sources: FoodSources) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path, sources.kinds()))),
            database,
            sources,
            tool_router: Self::tool_router(),
        }
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Food Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LookupBarcodeParams {
    /// 8 to 14 digit product barcode
    pub barcode: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchFoodsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize { 10 }

/// A food from a lookup result, or a manual per-100g entry
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FoodParams {
    /// "open_food_facts" or "food_data_central"
    pub source: Option<String>,
    /// Barcode or FDC id from a lookup result
    pub source_ref: Option<String>,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub calories_per_100g: Option<f64>,
    pub protein_per_100g: Option<f64>,
    pub carbs_per_100g: Option<f64>,
    pub fat_per_100g: Option<f64>,
    pub serving_size_grams: Option<f64>,
    /// e.g. "2 tbsp (32 g)" or "1 cup (240 ml)"
    pub serving_text: Option<String>,
    #[serde(default = "default_servings")]
    pub number_of_servings: f64,
}

fn default_servings() -> f64 { 1.0 }

impl From<FoodParams> for FoodSelection {
    fn from(p: FoodParams) -> Self {
        FoodSelection {
            source: p.source,
            source_ref: p.source_ref,
            name: p.name,
            brand: p.brand,
            calories_per_100g: p.calories_per_100g,
            protein_per_100g: p.protein_per_100g,
            carbs_per_100g: p.carbs_per_100g,
            fat_per_100g: p.fat_per_100g,
            serving_size_grams: p.serving_size_grams,
            serving_text: p.serving_text,
            number_of_servings: p.number_of_servings,
        }
    }
}

// ============================================================================
// Meal Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogFoodParams {
    /// YYYY-MM-DD
    pub date: String,
    #[serde(default = "default_meal_type")]
    pub meal_type: String,
    #[serde(flatten)]
    pub food: FoodParams,
}

fn default_meal_type() -> String { "unspecified".to_string() }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateItemServingParams {
    pub item_id: i64,
    pub serving_size_grams: Option<f64>,
    pub number_of_servings: Option<f64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ItemIdParams {
    pub item_id: i64,
}

// ============================================================================
// Day Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DateParams {
    /// YYYY-MM-DD
    pub date: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDaysParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 30 }

// ============================================================================
// Menu Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateMenuParams {
    pub name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddMenuItemParams {
    pub menu_id: i64,
    #[serde(flatten)]
    pub food: FoodParams,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveMenuItemParams {
    pub menu_id: i64,
    pub item_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetMenuParams {
    pub menu_id: Option<i64>,
    /// Case-insensitive; used when menu_id is absent
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListMenusParams {
    pub search: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ApplyMenuParams {
    pub menu_id: Option<i64>,
    pub name: Option<String>,
    /// YYYY-MM-DD
    pub date: String,
    #[serde(default = "default_meal_type")]
    pub meal_type: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MenuIdParams {
    pub menu_id: i64,
}

// ============================================================================
// Goal and Calculation Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetGoalsParams {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fat: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetGoalsParams {
    /// Include progress for this YYYY-MM-DD
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateMacrosParams {
    pub calories_per_100g: Option<f64>,
    pub protein_per_100g: Option<f64>,
    pub carbs_per_100g: Option<f64>,
    pub fat_per_100g: Option<f64>,
    pub serving_size_grams: Option<f64>,
    pub serving_text: Option<String>,
    #[serde(default = "default_servings")]
    pub number_of_servings: f64,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl MacroLogService {
    // --- Status ---

    #[tool(description = "Get the current status of the MacroLog service including build info, database counts, and configured food sources")]
    async fn macrolog_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker
            .get_status(&self.database)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&status)
    }

    #[tool(description = "Get step-by-step instructions for logging food. Call this when starting a logging session or when unsure how to use the tools.")]
    fn logging_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::LOGGING_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(LOGGING_INSTRUCTIONS)]))
    }

    // --- Food Lookup ---

    #[tool(description = "Look up a packaged food by barcode. Tries Open Food Facts, then USDA FoodData Central when configured.")]
    async fn lookup_barcode(&self, Parameters(p): Parameters<LookupBarcodeParams>) -> Result<CallToolResult, McpError> {
        let result = foods::lookup_barcode(&self.sources, &p.barcode)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Search the configured food databases by text. Results carry per-100g values and one declared serving.")]
    async fn search_foods(&self, Parameters(p): Parameters<SearchFoodsParams>) -> Result<CallToolResult, McpError> {
        let result = foods::search_foods(&self.sources, &p.query, p.limit)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Meals ---

    #[tool(description = "Log a food to a meal on a date. Give source + source_ref from a lookup, or a manual name with per-100g values. Meal and day totals are recomputed.")]
    async fn log_food(&self, Parameters(p): Parameters<LogFoodParams>) -> Result<CallToolResult, McpError> {
        let meal_type = MealType::from_str(&p.meal_type);
        let data = foods::resolve_item(&self.sources, &p.food.into())
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        let result = meals::log_food(&self.database, &p.date, meal_type, &data)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Change a logged item's serving size or number of servings. The stored per-100g values are rescaled; the food is not looked up again.")]
    fn update_item_serving(&self, Parameters(p): Parameters<UpdateItemServingParams>) -> Result<CallToolResult, McpError> {
        let result = meals::update_item_serving(&self.database, p.item_id, p.serving_size_grams, p.number_of_servings)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Remove a logged item from its meal or menu and recompute totals")]
    fn remove_item(&self, Parameters(p): Parameters<ItemIdParams>) -> Result<CallToolResult, McpError> {
        let result = meals::remove_item(&self.database, p.item_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Show an item's stored per-100g snapshot next to the values recovered from its totals and serving")]
    fn get_item_baseline(&self, Parameters(p): Parameters<ItemIdParams>) -> Result<CallToolResult, McpError> {
        let result = meals::get_item_baseline(&self.database, p.item_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Days ---

    #[tool(description = "Get a day's meals, items, totals and progress against goals")]
    fn get_day(&self, Parameters(p): Parameters<DateParams>) -> Result<CallToolResult, McpError> {
        let result = days::get_day(&self.database, &p.date)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(day) => json_result(&day),
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                r#"{{"error": "Day not found", "date": "{}"}}"#,
                p.date
            ))])),
        }
    }

    #[tool(description = "List logged days with totals, newest first, with optional date range and pagination")]
    fn list_days(&self, Parameters(p): Parameters<ListDaysParams>) -> Result<CallToolResult, McpError> {
        let result = days::list_days(
            &self.database,
            p.start_date.as_deref(),
            p.end_date.as_deref(),
            p.limit,
            p.offset,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Rebuild a day's cached meal and day totals from its items")]
    fn recalculate_day_totals(&self, Parameters(p): Parameters<DateParams>) -> Result<CallToolResult, McpError> {
        let result = days::recalculate_day_totals(&self.database, &p.date)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete a day with all of its meals and items")]
    fn delete_day(&self, Parameters(p): Parameters<DateParams>) -> Result<CallToolResult, McpError> {
        let result = days::delete_day(&self.database, &p.date)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Menus ---

    #[tool(description = "Create an empty menu (a reusable list of items)")]
    fn create_menu(&self, Parameters(p): Parameters<CreateMenuParams>) -> Result<CallToolResult, McpError> {
        let result = menus::create_menu(&self.database, &p.name, p.notes.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Add a food to a menu. Takes the same food fields as log_food.")]
    async fn add_menu_item(&self, Parameters(p): Parameters<AddMenuItemParams>) -> Result<CallToolResult, McpError> {
        let data = foods::resolve_item(&self.sources, &p.food.into())
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        let result = menus::add_menu_item(&self.database, p.menu_id, &data)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Remove an item from a menu")]
    fn remove_menu_item(&self, Parameters(p): Parameters<RemoveMenuItemParams>) -> Result<CallToolResult, McpError> {
        let result = menus::remove_menu_item(&self.database, p.menu_id, p.item_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get a menu with its items and totals, by id or name")]
    fn get_menu(&self, Parameters(p): Parameters<GetMenuParams>) -> Result<CallToolResult, McpError> {
        let result = menus::get_menu(&self.database, p.menu_id, p.name.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(menu) => json_result(&menu),
            None => Ok(CallToolResult::success(vec![Content::text(
                r#"{"error": "Menu not found"}"#.to_string(),
            )])),
        }
    }

    #[tool(description = "List menus with optional name search and pagination")]
    fn list_menus(&self, Parameters(p): Parameters<ListMenusParams>) -> Result<CallToolResult, McpError> {
        let result = menus::list_menus(&self.database, p.search.as_deref(), p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Copy a menu's items into a new meal on a date. All items are copied or none are.")]
    fn apply_menu(&self, Parameters(p): Parameters<ApplyMenuParams>) -> Result<CallToolResult, McpError> {
        let meal_type = MealType::from_str(&p.meal_type);
        let result = menus::apply_menu(&self.database, p.menu_id, p.name.as_deref(), &p.date, meal_type)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete a menu and its items. Meals it was applied to are not changed.")]
    fn delete_menu(&self, Parameters(p): Parameters<MenuIdParams>) -> Result<CallToolResult, McpError> {
        let result = menus::delete_menu(&self.database, p.menu_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Goals ---

    #[tool(description = "Set daily calorie and macro goals. A goal of 0 means no target.")]
    fn set_goals(&self, Parameters(p): Parameters<SetGoalsParams>) -> Result<CallToolResult, McpError> {
        let targets = MacroGoals::new(p.calories, p.protein, p.carbs, p.fat);
        let result = goals::set_goals(&self.database, targets)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Get daily goals, with progress for a date when one is given")]
    fn get_goals(&self, Parameters(p): Parameters<GetGoalsParams>) -> Result<CallToolResult, McpError> {
        let result = goals::get_goals(&self.database, p.date.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Calculation ---

    #[tool(description = "Scale per-100g values to a serving without storing anything. Missing calories are derived as 4p + 4c + 9f.")]
    fn calculate_macros(&self, Parameters(p): Parameters<CalculateMacrosParams>) -> Result<CallToolResult, McpError> {
        let raw = RawMacros {
            calories: p.calories_per_100g,
            protein: p.protein_per_100g,
            carbs: p.carbs_per_100g,
            fat: p.fat_per_100g,
        };
        let result = calculate::calculate_macros(
            raw,
            p.serving_size_grams,
            p.serving_text.as_deref(),
            p.number_of_servings,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for MacroLogService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "macrolog".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("MacroLog".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "MacroLog - calorie and macro logging. \
                 IMPORTANT: Call logging_instructions before the first log of a session. \
                 Lookup: lookup_barcode, search_foods, calculate_macros. \
                 Logging: log_food, update_item_serving, remove_item, get_item_baseline. \
                 Days: get_day, list_days, recalculate_day_totals, delete_day. \
                 Menus: create_menu, add_menu_item, remove_menu_item, get_menu, list_menus, apply_menu, delete_menu. \
                 Goals: set_goals, get_goals. \
                 Totals are exact in `raw`; use `display` values when reporting to the user."
                    .into(),
            ),
        }
    }
}
