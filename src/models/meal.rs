//! Meal model
//!
//! A meal belongs to one day and owns the items eaten in it.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::{totals, AggregateTotals};

/// Meal type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Unspecified,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
            MealType::Unspecified => "unspecified",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => MealType::Breakfast,
            "lunch" => MealType::Lunch,
            "dinner" => MealType::Dinner,
            "snack" | "snacks" => MealType::Snack,
            _ => MealType::Unspecified,
        }
    }
}

/// A meal within a day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    pub day_id: i64,
    pub meal_type: MealType,
    /// Set when the meal was created from a menu
    pub name: Option<String>,
    pub cached_totals: AggregateTotals,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a meal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealCreate {
    pub day_id: i64,
    pub meal_type: MealType,
    pub name: Option<String>,
}

impl Meal {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let meal_type: String = row.get("meal_type")?;
        Ok(Self {
            id: row.get("id")?,
            day_id: row.get("day_id")?,
            meal_type: MealType::from_str(&meal_type),
            name: row.get("name")?,
            cached_totals: AggregateTotals {
                calories: row.get("cached_calories")?,
                protein: row.get("cached_protein")?,
                carbs: row.get("cached_carbs")?,
                fat: row.get("cached_fat")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Create an empty meal
    pub fn create(conn: &Connection, data: &MealCreate) -> DbResult<Self> {
        conn.execute(
            "INSERT INTO meals (day_id, meal_type, name) VALUES (?1, ?2, ?3)",
            params![data.day_id, data.meal_type.as_str(), data.name],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::NotFound(format!("Meal {}", id)))
    }

    /// Get a meal by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meals WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(meal) => Ok(Some(meal)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All meals of a day in creation order
    pub fn list_for_day(conn: &Connection, day_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM meals WHERE day_id = ?1 ORDER BY id")?;

        let meals = stmt
            .query_map([day_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(meals)
    }

    /// The first unnamed meal of this type on a day, created if missing.
    ///
    /// Meals created from menus keep their own row and are never reused here.
    pub fn get_or_create_for_day(conn: &Connection, day_id: i64, meal_type: MealType) -> DbResult<Self> {
        let mut stmt = conn.prepare(
            "SELECT * FROM meals WHERE day_id = ?1 AND meal_type = ?2 AND name IS NULL
             ORDER BY id LIMIT 1",
        )?;

        match stmt.query_row(params![day_id, meal_type.as_str()], Self::from_row) {
            Ok(meal) => Ok(meal),
            Err(rusqlite::Error::QueryReturnedNoRows) => Self::create(
                conn,
                &MealCreate {
                    day_id,
                    meal_type,
                    name: None,
                },
            ),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_cached_totals(conn: &Connection, id: i64, totals: &AggregateTotals) -> DbResult<()> {
        conn.execute(
            r#"
            UPDATE meals SET
                cached_calories = ?1,
                cached_protein = ?2,
                cached_carbs = ?3,
                cached_fat = ?4,
                updated_at = datetime('now')
            WHERE id = ?5
            "#,
            params![totals.calories, totals.protein, totals.carbs, totals.fat, id],
        )?;
        Ok(())
    }

    /// Delete a meal and its items, then refresh the day totals
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let Some(meal) = Self::get_by_id(conn, id)? else {
            return Ok(false);
        };

        conn.execute("DELETE FROM meals WHERE id = ?1", [id])?;
        totals::recalculate_day_totals(conn, meal.day_id)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::Day;

    fn setup() -> (Connection, Day) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        let day = Day::get_or_create(&conn, "2025-03-01").unwrap();
        (conn, day)
    }

    #[test]
    fn test_meal_type_strings() {
        assert_eq!(MealType::from_str("Breakfast"), MealType::Breakfast);
        assert_eq!(MealType::from_str("snacks"), MealType::Snack);
        assert_eq!(MealType::from_str("brunch"), MealType::Unspecified);
        assert_eq!(MealType::Dinner.as_str(), "dinner");
    }

    #[test]
    fn test_get_or_create_reuses_unnamed_meal() {
        let (conn, day) = setup();
        let a = Meal::get_or_create_for_day(&conn, day.id, MealType::Lunch).unwrap();
        let b = Meal::get_or_create_for_day(&conn, day.id, MealType::Lunch).unwrap();
        assert_eq!(a.id, b.id);

        let named = Meal::create(
            &conn,
            &MealCreate {
                day_id: day.id,
                meal_type: MealType::Dinner,
                name: Some("Pasta night".to_string()),
            },
        )
        .unwrap();
        let dinner = Meal::get_or_create_for_day(&conn, day.id, MealType::Dinner).unwrap();
        assert_ne!(named.id, dinner.id);

        assert_eq!(Meal::list_for_day(&conn, day.id).unwrap().len(), 3);
    }

    #[test]
    fn test_delete_meal() {
        let (conn, day) = setup();
        let meal = Meal::get_or_create_for_day(&conn, day.id, MealType::Snack).unwrap();
        assert!(Meal::delete(&conn, meal.id).unwrap());
        assert!(!Meal::delete(&conn, meal.id).unwrap());
        assert!(Meal::list_for_day(&conn, day.id).unwrap().is_empty());
    }

    #[test]
    fn test_meals_cascade_with_day() {
        let (conn, day) = setup();
        let meal = Meal::get_or_create_for_day(&conn, day.id, MealType::Breakfast).unwrap();
        Day::delete(&conn, day.id).unwrap();
        assert!(Meal::get_by_id(&conn, meal.id).unwrap().is_none());
    }
}
