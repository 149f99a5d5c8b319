//! Cached aggregate totals
//!
//! Meal, day and menu totals are a cache over their items. Every change to an
//! item collection goes through here, which re-reads the members and sums them
//! with the engine instead of patching the cache incrementally.

use rusqlite::{Connection, Row};

use crate::db::{DbError, DbResult};
use crate::nutrition::aggregate;
use super::{AggregateTotals, Day, ItemOwner, Meal, ScaledMacros};

fn scaled_from_row(row: &Row) -> rusqlite::Result<ScaledMacros> {
    Ok(ScaledMacros {
        calories: row.get(0)?,
        protein: row.get(1)?,
        carbs: row.get(2)?,
        fat: row.get(3)?,
    })
}

fn sum_items(conn: &Connection, sql: &str, id: i64) -> DbResult<AggregateTotals> {
    let mut stmt = conn.prepare(sql)?;
    let macros = stmt
        .query_map([id], scaled_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(aggregate(&macros))
}

/// Re-aggregate a meal's items into its cache
pub fn recalculate_meal_totals(conn: &Connection, meal_id: i64) -> DbResult<AggregateTotals> {
    let totals = sum_items(
        conn,
        "SELECT calories, protein, carbs, fat FROM items WHERE meal_id = ?1",
        meal_id,
    )?;
    Meal::update_cached_totals(conn, meal_id, &totals)?;
    Ok(totals)
}

/// Re-aggregate every item of every meal of a day into the day cache
pub fn recalculate_day_totals(conn: &Connection, day_id: i64) -> DbResult<AggregateTotals> {
    let totals = sum_items(
        conn,
        "SELECT i.calories, i.protein, i.carbs, i.fat
         FROM items i JOIN meals m ON i.meal_id = m.id
         WHERE m.day_id = ?1",
        day_id,
    )?;
    Day::update_cached_totals(conn, day_id, &totals)?;
    Ok(totals)
}

/// Re-aggregate a menu's items into its cache
pub fn recalculate_menu_totals(conn: &Connection, menu_id: i64) -> DbResult<AggregateTotals> {
    let totals = sum_items(
        conn,
        "SELECT calories, protein, carbs, fat FROM items WHERE menu_id = ?1",
        menu_id,
    )?;
    conn.execute(
        "UPDATE menus SET cached_calories = ?1, cached_protein = ?2, cached_carbs = ?3,
             cached_fat = ?4, updated_at = datetime('now')
         WHERE id = ?5",
        rusqlite::params![totals.calories, totals.protein, totals.carbs, totals.fat, menu_id],
    )?;
    Ok(totals)
}

/// Refresh every cache above an item: meal then day, or the menu
pub fn recalculate_owner_totals(conn: &Connection, owner: ItemOwner) -> DbResult<()> {
    match owner {
        ItemOwner::Meal(meal_id) => {
            let meal = Meal::get_by_id(conn, meal_id)?
                .ok_or_else(|| DbError::NotFound(format!("Meal {}", meal_id)))?;
            recalculate_meal_totals(conn, meal_id)?;
            recalculate_day_totals(conn, meal.day_id)?;
        }
        ItemOwner::Menu(menu_id) => {
            recalculate_menu_totals(conn, menu_id)?;
        }
    }
    Ok(())
}

/// Rebuild every meal cache of a day and then the day itself.
///
/// Used to repair caches written by older builds or edited by hand.
pub fn recalculate_day_and_meals(conn: &Connection, day_id: i64) -> DbResult<AggregateTotals> {
    for meal in Meal::list_for_day(conn, day_id)? {
        recalculate_meal_totals(conn, meal.id)?;
    }
    recalculate_day_totals(conn, day_id)
}
