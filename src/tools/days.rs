//! Day MCP Tools
//!
//! Viewing, listing, repairing and deleting day logs.

use serde::Serialize;

use crate::db::Database;
use crate::models::{
    recalculate_day_and_meals, validate_date, Day, MacroGoals, Meal, MealItem, MealType,
};
use crate::nutrition::{goal_progress, GoalProgress};
use super::meals::ItemView;
use super::TotalsView;

/// A meal with its items
#[derive(Debug, Serialize)]
pub struct MealDetail {
    pub id: i64,
    pub meal_type: MealType,
    pub name: Option<String>,
    pub items: Vec<ItemView>,
    pub totals: TotalsView,
}

/// Day with meals for detailed view
#[derive(Debug, Serialize)]
pub struct DayDetail {
    pub id: i64,
    pub date: String,
    pub meals: Vec<MealDetail>,
    pub totals: TotalsView,
    /// Present when goals are set
    pub progress: Option<GoalProgress>,
    pub notes: Option<String>,
}

/// Day summary for listing
#[derive(Debug, Serialize)]
pub struct DaySummary {
    pub id: i64,
    pub date: String,
    pub totals: TotalsView,
    pub meal_count: usize,
}

/// Response for list_days
#[derive(Debug, Serialize)]
pub struct ListDaysResponse {
    pub days: Vec<DaySummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Response for recalculate_day_totals
#[derive(Debug, Serialize)]
pub struct RecalculateDayResponse {
    pub day_id: i64,
    pub date: String,
    pub previous: TotalsView,
    pub totals: TotalsView,
    pub changed: bool,
}

/// Response for delete_day
#[derive(Debug, Serialize)]
pub struct DeleteDayResponse {
    pub date: String,
    pub deleted: bool,
}

// ============================================================================
// Day Tools
// ============================================================================

/// Get a day with its meals and items
pub fn get_day(db: &Database, date: &str) -> Result<Option<DayDetail>, String> {
    validate_date(date).map_err(|e| e.to_string())?;
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let Some(day) = Day::get_by_date(&conn, date).map_err(|e| format!("Failed to get day: {}", e))? else {
        return Ok(None);
    };

    let meals = Meal::list_for_day(&conn, day.id).map_err(|e| format!("Failed to get meals: {}", e))?;
    let mut details = Vec::with_capacity(meals.len());
    for meal in meals {
        let items = MealItem::list_for_meal(&conn, meal.id)
            .map_err(|e| format!("Failed to get meal items: {}", e))?;
        details.push(MealDetail {
            id: meal.id,
            meal_type: meal.meal_type,
            name: meal.name,
            items: items.iter().map(ItemView::from).collect(),
            totals: meal.cached_totals.into(),
        });
    }

    let goals = MacroGoals::get(&conn).map_err(|e| format!("Failed to get goals: {}", e))?;
    let progress = (goals != MacroGoals::default()).then(|| goal_progress(&day.cached_totals, &goals));

    Ok(Some(DayDetail {
        id: day.id,
        date: day.date,
        meals: details,
        totals: day.cached_totals.into(),
        progress,
        notes: day.notes,
    }))
}

/// List days with optional date range
pub fn list_days(
    db: &Database,
    start_date: Option<&str>,
    end_date: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ListDaysResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let days = Day::list(&conn, start_date, end_date, limit, offset)
        .map_err(|e| format!("Failed to list days: {}", e))?;

    let total = Day::count(&conn, start_date, end_date)
        .map_err(|e| format!("Failed to count days: {}", e))?;

    let mut summaries = Vec::with_capacity(days.len());
    for day in days {
        let meals = Meal::list_for_day(&conn, day.id)
            .map_err(|e| format!("Failed to get meals: {}", e))?;

        summaries.push(DaySummary {
            id: day.id,
            date: day.date,
            totals: day.cached_totals.into(),
            meal_count: meals.len(),
        });
    }

    Ok(ListDaysResponse {
        days: summaries,
        total,
        limit,
        offset,
    })
}

/// Rebuild the cached totals of a day and its meals from stored items
pub fn recalculate_day_totals(db: &Database, date: &str) -> Result<RecalculateDayResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let day = Day::get_by_date(&conn, date)
        .map_err(|e| format!("Failed to get day: {}", e))?
        .ok_or_else(|| format!("Day not found: {}", date))?;

    let totals = recalculate_day_and_meals(&conn, day.id)
        .map_err(|e| format!("Failed to recalculate day: {}", e))?;

    let changed = totals != day.cached_totals;
    if changed {
        tracing::info!("Corrected cached totals for {}", date);
    }

    Ok(RecalculateDayResponse {
        day_id: day.id,
        date: day.date,
        previous: day.cached_totals.into(),
        totals: totals.into(),
        changed,
    })
}

/// Delete a day and everything logged on it
pub fn delete_day(db: &Database, date: &str) -> Result<DeleteDayResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = match Day::get_by_date(&conn, date).map_err(|e| format!("Failed to get day: {}", e))? {
        Some(day) => Day::delete(&conn, day.id).map_err(|e| format!("Failed to delete day: {}", e))?,
        None => false,
    };

    Ok(DeleteDayResponse {
        date: date.to_string(),
        deleted,
    })
}
