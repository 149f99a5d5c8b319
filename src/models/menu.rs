//! Menu model
//!
//! A named, reusable set of items. Applying a menu to a day copies its items
//! into a fresh meal; the copies are independent of the menu afterwards.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::{totals, AggregateTotals, Day, ItemOwner, Meal, MealCreate, MealItem, MealItemCreate, MealType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Menu {
    pub id: i64,
    pub name: String,
    pub cached_totals: AggregateTotals,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Menu {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            cached_totals: AggregateTotals {
                calories: row.get("cached_calories")?,
                protein: row.get("cached_protein")?,
                carbs: row.get("cached_carbs")?,
                fat: row.get("cached_fat")?,
            },
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Create an empty menu. Names are unique.
    pub fn create(conn: &Connection, name: &str, notes: Option<&str>) -> DbResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DbError::Invalid("menu name must not be empty".to_string()));
        }
        if Self::get_by_name(conn, name)?.is_some() {
            return Err(DbError::Invalid(format!("a menu named '{}' already exists", name)));
        }

        conn.execute(
            "INSERT INTO menus (name, notes) VALUES (?1, ?2)",
            params![name, notes],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or_else(|| DbError::NotFound(format!("Menu {}", id)))
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM menus WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(menu) => Ok(Some(menu)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Case-insensitive lookup by name
    pub fn get_by_name(conn: &Connection, name: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM menus WHERE name = ?1 COLLATE NOCASE")?;

        match stmt.query_row([name.trim()], Self::from_row) {
            Ok(menu) => Ok(Some(menu)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List menus alphabetically, optionally filtered by a name fragment
    pub fn list(conn: &Connection, search: Option<&str>, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let mut sql = String::from("SELECT * FROM menus WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(term) = search {
            params_vec.push(Box::new(format!("%{}%", escape_like(term))));
            sql.push_str(&format!(" AND name LIKE ?{} ESCAPE '\\'", params_vec.len()));
        }

        sql.push_str(" ORDER BY name COLLATE NOCASE");

        params_vec.push(Box::new(limit));
        sql.push_str(&format!(" LIMIT ?{}", params_vec.len()));

        params_vec.push(Box::new(offset));
        sql.push_str(&format!(" OFFSET ?{}", params_vec.len()));

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

        let menus = stmt
            .query_map(params_refs.as_slice(), Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(menus)
    }

    pub fn count(conn: &Connection) -> DbResult<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM menus", [], |row| row.get(0))?)
    }

    /// Delete a menu and its items. Meals created from it are untouched.
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM menus WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    pub fn items(&self, conn: &Connection) -> DbResult<Vec<MealItem>> {
        MealItem::list_for_menu(conn, self.id)
    }

    /// Add an item to a menu and refresh the menu totals
    pub fn add_item(conn: &Connection, menu_id: i64, data: &MealItemCreate) -> DbResult<MealItem> {
        if Self::get_by_id(conn, menu_id)?.is_none() {
            return Err(DbError::NotFound(format!("Menu {}", menu_id)));
        }
        MealItem::insert(conn, ItemOwner::Menu(menu_id), data)
    }

    /// Remove an item that belongs to this menu. `Ok(false)` when it does not.
    pub fn remove_item(conn: &Connection, menu_id: i64, item_id: i64) -> DbResult<bool> {
        match MealItem::get_by_id(conn, item_id)? {
            Some(item) if item.owner == ItemOwner::Menu(menu_id) => MealItem::delete(conn, item_id),
            _ => Ok(false),
        }
    }

    /// Copy the menu's items into a new meal on `date`.
    ///
    /// The day is created if needed. Meal and day totals are recomputed once
    /// after all copies are written.
    pub fn apply_to_day(conn: &Connection, menu_id: i64, date: &str, meal_type: MealType) -> DbResult<Meal> {
        let menu = Self::get_by_id(conn, menu_id)?
            .ok_or_else(|| DbError::NotFound(format!("Menu {}", menu_id)))?;
        let items = menu.items(conn)?;
        if items.is_empty() {
            return Err(DbError::Invalid(format!("menu '{}' has no items", menu.name)));
        }

        let day = Day::get_or_create(conn, date)?;
        let meal = Meal::create(
            conn,
            &MealCreate {
                day_id: day.id,
                meal_type,
                name: Some(menu.name.clone()),
            },
        )?;

        let owner = ItemOwner::Meal(meal.id);
        for item in &items {
            MealItem::insert_row(conn, owner, &item.to_create())?;
        }
        totals::recalculate_owner_totals(conn, owner)?;

        tracing::debug!("Applied menu '{}' ({} items) to {}", menu.name, items.len(), date);

        Meal::get_by_id(conn, meal.id)?.ok_or_else(|| DbError::NotFound(format!("Meal {}", meal.id)))
    }
}

/// Escape LIKE wildcards so user text matches literally
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
