//! Meal logging tools
//!
//! Adding, editing and removing logged items. Each change is applied to an
//! in-memory view of the owning meal first and then written in a transaction;
//! a failed write rolls the view back and nothing is committed.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{Database, DbError, DbResult};
use crate::models::{
    validate_date, AggregateTotals, Day, ItemOwner, Meal, MealItem, MealItemCreate, MealType,
    NutrientProfile, ScaledMacros, ServingSpec,
};
use crate::nutrition::DisplayMacros;
use crate::sources::SourceKind;
use crate::sync::{apply_optimistic, LocalItem, MealState, Transition};
use super::TotalsView;

/// An item as returned by the tools
#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: i64,
    pub owner: ItemOwner,
    pub name: String,
    pub brand: Option<String>,
    pub source: SourceKind,
    pub source_ref: Option<String>,
    pub profile: NutrientProfile,
    pub serving: ServingSpec,
    pub total_grams: f64,
    pub macros: ScaledMacros,
    pub display: DisplayMacros,
}

impl From<&MealItem> for ItemView {
    fn from(item: &MealItem) -> Self {
        Self {
            id: item.id,
            owner: item.owner,
            name: item.name.clone(),
            brand: item.brand.clone(),
            source: item.source,
            source_ref: item.source_ref.clone(),
            profile: item.profile,
            serving: item.serving,
            total_grams: item.serving.total_grams(),
            macros: item.macros,
            display: DisplayMacros::from(&item.macros),
        }
    }
}

/// Response for log_food
#[derive(Debug, Serialize)]
pub struct LogFoodResponse {
    pub date: String,
    pub meal_id: i64,
    pub meal_type: MealType,
    pub item: ItemView,
    pub meal_totals: TotalsView,
    pub day_totals: TotalsView,
}

/// Response for update_item_serving
#[derive(Debug, Serialize)]
pub struct UpdateItemResponse {
    pub item: ItemView,
    pub owner_totals: TotalsView,
    pub day_totals: Option<TotalsView>,
}

/// Response for remove_item
#[derive(Debug, Serialize)]
pub struct RemoveItemResponse {
    pub item_id: i64,
    pub removed: bool,
    pub owner: Option<ItemOwner>,
    pub owner_totals: Option<TotalsView>,
    pub day_totals: Option<TotalsView>,
}

/// Response for get_item_baseline
#[derive(Debug, Serialize)]
pub struct ItemBaselineResponse {
    pub item_id: i64,
    pub name: String,
    pub serving: ServingSpec,
    pub macros: ScaledMacros,
    /// Snapshot stored when the item was added
    pub stored_profile: NutrientProfile,
    /// Per-100g values recovered from the stored totals and serving
    pub reopened_profile: NutrientProfile,
}

fn owner_items(conn: &Connection, owner: ItemOwner) -> DbResult<Vec<MealItem>> {
    match owner {
        ItemOwner::Meal(id) => MealItem::list_for_meal(conn, id),
        ItemOwner::Menu(id) => MealItem::list_for_menu(conn, id),
    }
}

/// Day totals above an item's meal; `None` for menu items
fn day_totals_for(conn: &Connection, owner: ItemOwner) -> DbResult<Option<AggregateTotals>> {
    let ItemOwner::Meal(meal_id) = owner else {
        return Ok(None);
    };
    let Some(meal) = Meal::get_by_id(conn, meal_id)? else {
        return Ok(None);
    };
    Ok(Day::get_by_id(conn, meal.day_id)?.map(|d| d.cached_totals))
}

// ============================================================================
// Logging Tools
// ============================================================================

/// Log an item into the day's meal of `meal_type`, creating both if needed
pub fn log_food(
    db: &Database,
    date: &str,
    meal_type: MealType,
    data: &MealItemCreate,
) -> Result<LogFoodResponse, String> {
    validate_date(date).map_err(|e| e.to_string())?;
    let pending = LocalItem::pending(&data.name, data.profile, data.serving)
        .map_err(|e| format!("Cannot log '{}': {}", data.name, e))?;

    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let tx = conn.transaction().map_err(|e| format!("Database error: {}", e))?;

    let day = Day::get_or_create(&tx, date).map_err(|e| format!("Failed to get day: {}", e))?;
    let meal = Meal::get_or_create_for_day(&tx, day.id, meal_type)
        .map_err(|e| format!("Failed to get meal: {}", e))?;
    let existing = MealItem::list_for_meal(&tx, meal.id)
        .map_err(|e| format!("Failed to load meal items: {}", e))?;

    let mut state = MealState::from_items(&existing);
    let owner = ItemOwner::Meal(meal.id);
    let item = apply_optimistic(&mut state, &Transition::AddItem(pending), |_, _| {
        MealItem::insert(&tx, owner, data)
    })
    .map_err(|e| format!("Failed to log food: {}", e))?;

    let day_totals = Day::get_by_id(&tx, day.id)
        .map_err(|e| format!("Failed to get day: {}", e))?
        .map(|d| d.cached_totals)
        .unwrap_or_default();

    tx.commit().map_err(|e| format!("Failed to commit: {}", e))?;

    tracing::info!(
        "Logged '{}' ({:.0} kcal) to {} {}",
        item.name,
        item.macros.calories,
        date,
        meal_type.as_str()
    );

    Ok(LogFoodResponse {
        date: date.to_string(),
        meal_id: meal.id,
        meal_type,
        item: ItemView::from(&item),
        meal_totals: state.totals().into(),
        day_totals: day_totals.into(),
    })
}

/// Change an item's serving; the frozen profile is rescaled, never re-fetched.
///
/// A field left as `None` keeps its current value.
pub fn update_item_serving(
    db: &Database,
    item_id: i64,
    serving_size_grams: Option<f64>,
    number_of_servings: Option<f64>,
) -> Result<UpdateItemResponse, String> {
    if serving_size_grams.is_none() && number_of_servings.is_none() {
        return Err("Give serving_size_grams and/or number_of_servings".to_string());
    }

    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let tx = conn.transaction().map_err(|e| format!("Database error: {}", e))?;

    let item = MealItem::get_by_id(&tx, item_id)
        .map_err(|e| format!("Failed to get item: {}", e))?
        .ok_or_else(|| format!("Item not found: {}", item_id))?;
    let serving = ServingSpec::new(
        serving_size_grams.unwrap_or(item.serving.serving_size_grams),
        number_of_servings.unwrap_or(item.serving.number_of_servings),
    );
    let siblings = owner_items(&tx, item.owner).map_err(|e| format!("Failed to load items: {}", e))?;

    let mut state = MealState::from_items(&siblings);
    let transition = Transition::UpdateServing { id: item_id, serving };
    let updated = apply_optimistic(&mut state, &transition, |_, _| {
        MealItem::update_serving(&tx, item_id, &serving)?
            .ok_or_else(|| DbError::NotFound(format!("Item {}", item_id)))
    })
    .map_err(|e| format!("Failed to update serving: {}", e))?;

    let day_totals = day_totals_for(&tx, updated.owner).map_err(|e| format!("Failed to get day: {}", e))?;
    tx.commit().map_err(|e| format!("Failed to commit: {}", e))?;

    Ok(UpdateItemResponse {
        item: ItemView::from(&updated),
        owner_totals: state.totals().into(),
        day_totals: day_totals.map(TotalsView::from),
    })
}

/// Remove an item from its meal or menu
pub fn remove_item(db: &Database, item_id: i64) -> Result<RemoveItemResponse, String> {
    let mut conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let tx = conn.transaction().map_err(|e| format!("Database error: {}", e))?;

    let Some(item) = MealItem::get_by_id(&tx, item_id).map_err(|e| format!("Failed to get item: {}", e))? else {
        return Ok(RemoveItemResponse {
            item_id,
            removed: false,
            owner: None,
            owner_totals: None,
            day_totals: None,
        });
    };
    let siblings = owner_items(&tx, item.owner).map_err(|e| format!("Failed to load items: {}", e))?;

    let mut state = MealState::from_items(&siblings);
    let removed = apply_optimistic(&mut state, &Transition::RemoveItem { id: item_id }, |_, _| {
        MealItem::delete(&tx, item_id)
    })
    .map_err(|e| format!("Failed to remove item: {}", e))?;

    let day_totals = day_totals_for(&tx, item.owner).map_err(|e| format!("Failed to get day: {}", e))?;
    tx.commit().map_err(|e| format!("Failed to commit: {}", e))?;

    Ok(RemoveItemResponse {
        item_id,
        removed,
        owner: Some(item.owner),
        owner_totals: Some(state.totals().into()),
        day_totals: day_totals.map(TotalsView::from),
    })
}

/// Recover an item's per-100g baseline from what was stored, for re-editing
pub fn get_item_baseline(db: &Database, item_id: i64) -> Result<ItemBaselineResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let item = MealItem::get_by_id(&conn, item_id)
        .map_err(|e| format!("Failed to get item: {}", e))?
        .ok_or_else(|| format!("Item not found: {}", item_id))?;

    let reopened_profile = item
        .reopen_profile()
        .map_err(|e| format!("Cannot reopen item {}: {}", item_id, e))?;

    Ok(ItemBaselineResponse {
        item_id,
        name: item.name,
        serving: item.serving,
        macros: item.macros,
        stored_profile: item.profile,
        reopened_profile,
    })
}
