//! Meal item model
//!
//! A logged food: a frozen per-100g snapshot, the serving chosen for it, and
//! the macros the engine derived from both. Owned by exactly one meal or menu.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use crate::nutrition::{try_scale_to_serving, unscale_from_serving, NutritionError};
use crate::sources::{FoodCandidate, SourceKind};
use super::{totals, NutrientProfile, ScaledMacros, ServingSpec};

/// The aggregate an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ItemOwner {
    Meal(i64),
    Menu(i64),
}

/// A food attached to a meal or menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealItem {
    pub id: i64,
    pub owner: ItemOwner,
    pub name: String,
    pub brand: Option<String>,
    pub source: SourceKind,
    pub source_ref: Option<String>,
    /// Snapshot taken when the item was added; catalog edits never reach it
    pub profile: NutrientProfile,
    pub serving: ServingSpec,
    pub macros: ScaledMacros,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for adding an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealItemCreate {
    pub name: String,
    pub brand: Option<String>,
    pub source: SourceKind,
    pub source_ref: Option<String>,
    pub profile: NutrientProfile,
    pub serving: ServingSpec,
}

impl MealItemCreate {
    /// A candidate with its declared serving scaled by `number_of_servings`
    pub fn from_candidate(candidate: &FoodCandidate, number_of_servings: f64) -> Self {
        Self {
            name: candidate.name.clone(),
            brand: candidate.brand.clone(),
            source: candidate.source,
            source_ref: Some(candidate.source_ref.clone()).filter(|r| !r.is_empty()),
            profile: candidate.profile,
            serving: ServingSpec::new(
                candidate.default_serving.serving_size_grams,
                number_of_servings,
            ),
        }
    }
}

impl MealItem {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let meal_id: Option<i64> = row.get("meal_id")?;
        let menu_id: Option<i64> = row.get("menu_id")?;
        let owner = match (meal_id, menu_id) {
            (Some(id), _) => ItemOwner::Meal(id),
            (None, Some(id)) => ItemOwner::Menu(id),
            (None, None) => {
                return Err(rusqlite::Error::InvalidColumnType(
                    0,
                    "meal_id".to_string(),
                    rusqlite::types::Type::Null,
                ))
            }
        };
        let source: String = row.get("source")?;

        Ok(Self {
            id: row.get("id")?,
            owner,
            name: row.get("name")?,
            brand: row.get("brand")?,
            source: SourceKind::from_str(&source),
            source_ref: row.get("source_ref")?,
            profile: NutrientProfile {
                calories_per_100g: row.get("calories_per_100g")?,
                protein_per_100g: row.get("protein_per_100g")?,
                carbs_per_100g: row.get("carbs_per_100g")?,
                fat_per_100g: row.get("fat_per_100g")?,
            },
            serving: ServingSpec {
                serving_size_grams: row.get("serving_size_grams")?,
                number_of_servings: row.get("number_of_servings")?,
            },
            macros: ScaledMacros {
                calories: row.get("calories")?,
                protein: row.get("protein")?,
                carbs: row.get("carbs")?,
                fat: row.get("fat")?,
            },
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a row without touching the owner's cached totals.
    ///
    /// The serving is validated and scaled before anything is written.
    pub(crate) fn insert_row(conn: &Connection, owner: ItemOwner, data: &MealItemCreate) -> DbResult<Self> {
        if data.name.trim().is_empty() {
            return Err(DbError::Invalid("item name must not be empty".to_string()));
        }
        if !data.profile.is_valid() {
            return Err(DbError::Invalid(format!(
                "nutrient profile for '{}' has negative or non-numeric values",
                data.name
            )));
        }
        let macros = try_scale_to_serving(&data.profile, &data.serving)?;

        let (meal_id, menu_id) = match owner {
            ItemOwner::Meal(id) => (Some(id), None),
            ItemOwner::Menu(id) => (None, Some(id)),
        };

        conn.execute(
            r#"
            INSERT INTO items (
                meal_id, menu_id, name, brand, source, source_ref,
                calories_per_100g, protein_per_100g, carbs_per_100g, fat_per_100g,
                serving_size_grams, number_of_servings,
                calories, protein, carbs, fat
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
            params![
                meal_id,
                menu_id,
                data.name.trim(),
                data.brand,
                data.source.as_str(),
                data.source_ref,
                data.profile.calories_per_100g,
                data.profile.protein_per_100g,
                data.profile.carbs_per_100g,
                data.profile.fat_per_100g,
                data.serving.serving_size_grams,
                data.serving.number_of_servings,
                macros.calories,
                macros.protein,
                macros.carbs,
                macros.fat,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::NotFound(format!("Item {}", id)))
    }

    /// Add an item to a meal or menu and refresh the owner's totals
    pub fn insert(conn: &Connection, owner: ItemOwner, data: &MealItemCreate) -> DbResult<Self> {
        let item = Self::insert_row(conn, owner, data)?;
        totals::recalculate_owner_totals(conn, owner)?;
        Ok(item)
    }

    /// Get an item by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM items WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_for_meal(conn: &Connection, meal_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM items WHERE meal_id = ?1 ORDER BY id")?;
        let items = stmt
            .query_map([meal_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn list_for_menu(conn: &Connection, menu_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM items WHERE menu_id = ?1 ORDER BY id")?;
        let items = stmt
            .query_map([menu_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Change the serving and rescale from the frozen profile.
    ///
    /// Returns `Ok(None)` when the item does not exist.
    pub fn update_serving(conn: &Connection, id: i64, serving: &ServingSpec) -> DbResult<Option<Self>> {
        let Some(item) = Self::get_by_id(conn, id)? else {
            return Ok(None);
        };
        let macros = try_scale_to_serving(&item.profile, serving)?;

        conn.execute(
            r#"
            UPDATE items SET
                serving_size_grams = ?1,
                number_of_servings = ?2,
                calories = ?3,
                protein = ?4,
                carbs = ?5,
                fat = ?6,
                updated_at = datetime('now')
            WHERE id = ?7
            "#,
            params![
                serving.serving_size_grams,
                serving.number_of_servings,
                macros.calories,
                macros.protein,
                macros.carbs,
                macros.fat,
                id,
            ],
        )?;

        totals::recalculate_owner_totals(conn, item.owner)?;
        Self::get_by_id(conn, id)
    }

    /// Delete an item and refresh its owner's totals
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let Some(item) = Self::get_by_id(conn, id)? else {
            return Ok(false);
        };

        conn.execute("DELETE FROM items WHERE id = ?1", [id])?;
        totals::recalculate_owner_totals(conn, item.owner)?;
        Ok(true)
    }

    /// Rebuild the per-100g baseline from the stored totals and serving,
    /// for re-editing an item whose profile snapshot is not trusted.
    pub fn reopen_profile(&self) -> Result<NutrientProfile, NutritionError> {
        unscale_from_serving(&self.macros, &self.serving)
    }

    /// The data needed to add a copy of this item elsewhere
    pub fn to_create(&self) -> MealItemCreate {
        MealItemCreate {
            name: self.name.clone(),
            brand: self.brand.clone(),
            source: self.source,
            source_ref: self.source_ref.clone(),
            profile: self.profile,
            serving: self.serving,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{Day, Meal, MealType};

    fn setup() -> (Connection, Meal) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        let day = Day::get_or_create(&conn, "2025-03-01").unwrap();
        let meal = Meal::get_or_create_for_day(&conn, day.id, MealType::Lunch).unwrap();
        (conn, meal)
    }

    fn granola(serving: ServingSpec) -> MealItemCreate {
        MealItemCreate {
            name: "Granola".to_string(),
            brand: Some("Acme".to_string()),
            source: SourceKind::Manual,
            source_ref: None,
            profile: NutrientProfile::new(200.0, 10.0, 30.0, 5.0),
            serving,
        }
    }

    #[test]
    fn test_insert_scales_and_updates_totals() {
        let (conn, meal) = setup();
        let item = MealItem::insert(&conn, ItemOwner::Meal(meal.id), &granola(ServingSpec::new(50.0, 2.0))).unwrap();

        assert_eq!(item.owner, ItemOwner::Meal(meal.id));
        assert_eq!(item.macros, ScaledMacros::new(200.0, 10.0, 30.0, 5.0));

        let meal = Meal::get_by_id(&conn, meal.id).unwrap().unwrap();
        assert_eq!(meal.cached_totals, item.macros);
        let day = Day::get_by_id(&conn, meal.day_id).unwrap().unwrap();
        assert_eq!(day.cached_totals, item.macros);
    }

    #[test]
    fn test_insert_rejects_unspecified_serving() {
        let (conn, meal) = setup();
        let result = MealItem::insert(&conn, ItemOwner::Meal(meal.id), &granola(ServingSpec::new(50.0, 0.0)));
        assert!(matches!(
            result,
            Err(DbError::Nutrition(NutritionError::InvalidServing { .. }))
        ));
        assert!(MealItem::list_for_meal(&conn, meal.id).unwrap().is_empty());
    }

    #[test]
    fn test_insert_rejects_negative_profile() {
        let (conn, meal) = setup();
        let mut data = granola(ServingSpec::grams(100.0));
        data.profile.fat_per_100g = -1.0;
        assert!(matches!(
            MealItem::insert(&conn, ItemOwner::Meal(meal.id), &data),
            Err(DbError::Invalid(_))
        ));
    }

    #[test]
    fn test_update_serving_rescales_from_snapshot() {
        let (conn, meal) = setup();
        let item = MealItem::insert(&conn, ItemOwner::Meal(meal.id), &granola(ServingSpec::grams(100.0))).unwrap();

        let updated = MealItem::update_serving(&conn, item.id, &ServingSpec::new(25.0, 2.0))
            .unwrap()
            .unwrap();
        assert_eq!(updated.macros, ScaledMacros::new(100.0, 5.0, 15.0, 2.5));
        assert_eq!(updated.profile, item.profile);

        let meal = Meal::get_by_id(&conn, meal.id).unwrap().unwrap();
        assert_eq!(meal.cached_totals, updated.macros);

        assert!(MealItem::update_serving(&conn, item.id, &ServingSpec::new(0.0, 1.0)).is_err());
        assert!(MealItem::update_serving(&conn, 999, &ServingSpec::grams(10.0)).unwrap().is_none());
    }

    #[test]
    fn test_delete_recomputes_meal_and_day() {
        let (conn, meal) = setup();
        let owner = ItemOwner::Meal(meal.id);
        let first = MealItem::insert(&conn, owner, &granola(ServingSpec::new(50.0, 2.0))).unwrap();
        MealItem::insert(&conn, owner, &granola(ServingSpec::new(50.0, 2.0))).unwrap();

        let day = Day::get_by_id(&conn, meal.day_id).unwrap().unwrap();
        assert_eq!(day.cached_totals, ScaledMacros::new(400.0, 20.0, 60.0, 10.0));

        assert!(MealItem::delete(&conn, first.id).unwrap());
        assert!(!MealItem::delete(&conn, first.id).unwrap());

        let meal = Meal::get_by_id(&conn, meal.id).unwrap().unwrap();
        let day = Day::get_by_id(&conn, meal.day_id).unwrap().unwrap();
        assert_eq!(meal.cached_totals, ScaledMacros::new(200.0, 10.0, 30.0, 5.0));
        assert_eq!(day.cached_totals, meal.cached_totals);
    }

    #[test]
    fn test_reopen_profile() {
        let (conn, meal) = setup();
        let item = MealItem::insert(&conn, ItemOwner::Meal(meal.id), &granola(ServingSpec::new(40.0, 3.0))).unwrap();
        let profile = item.reopen_profile().unwrap();
        assert!((profile.calories_per_100g - 200.0).abs() < 1e-9);
        assert!((profile.fat_per_100g - 5.0).abs() < 1e-9);

        let mut broken = item.clone();
        broken.serving.number_of_servings = 0.0;
        assert_eq!(
            broken.reopen_profile(),
            Err(NutritionError::DegenerateServing { grams: 0.0 })
        );
    }

    #[test]
    fn test_items_removed_with_meal() {
        let (conn, meal) = setup();
        let item = MealItem::insert(&conn, ItemOwner::Meal(meal.id), &granola(ServingSpec::grams(30.0))).unwrap();
        Meal::delete(&conn, meal.id).unwrap();
        assert!(MealItem::get_by_id(&conn, item.id).unwrap().is_none());
    }
}
