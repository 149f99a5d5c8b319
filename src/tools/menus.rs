//! Menu MCP Tools
//!
//! Reusable item templates and applying them to a day.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{Database, DbError, DbResult};
use crate::models::{validate_date, Day, MealItem, MealItemCreate, MealType, Menu};
use super::meals::ItemView;
use super::TotalsView;

/// Menu with its items
#[derive(Debug, Serialize)]
pub struct MenuDetail {
    pub id: i64,
    pub name: String,
    pub notes: Option<String>,
    pub items: Vec<ItemView>,
    pub totals: TotalsView,
}

/// Menu summary for listing
#[derive(Debug, Serialize)]
pub struct MenuSummary {
    pub id: i64,
    pub name: String,
    pub totals: TotalsView,
}

#[derive(Debug, Serialize)]
pub struct ListMenusResponse {
    pub menus: Vec<MenuSummary>,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct AddMenuItemResponse {
    pub menu_id: i64,
    pub item: ItemView,
    pub menu_totals: TotalsView,
}

#[derive(Debug, Serialize)]
pub struct RemoveMenuItemResponse {
    pub menu_id: i64,
    pub item_id: i64,
    pub removed: bool,
    pub menu_totals: TotalsView,
}

/// Response for apply_menu
#[derive(Debug, Serialize)]
pub struct ApplyMenuResponse {
    pub menu_id: i64,
    pub menu_name: String,
    pub date: String,
    pub meal_id: i64,
    pub meal_type: MealType,
    pub items_copied: usize,
    pub meal_totals: TotalsView,
    pub day_totals: TotalsView,
}

#[derive(Debug, Serialize)]
pub struct DeleteMenuResponse {
    pub menu_id: i64,
    pub deleted: bool,
}

/// Find a menu by id, falling back to its name
fn find_menu(conn: &Connection, id: Option<i64>, name: Option<&str>) -> DbResult<Option<Menu>> {
    if let Some(id) = id {
        return Menu::get_by_id(conn, id);
    }
    match name {
        Some(name) => Menu::get_by_name(conn, name),
        None => Ok(None),
    }
}

fn detail(conn: &Connection, menu: Menu) -> DbResult<MenuDetail> {
    let items = menu.items(conn)?;
    Ok(MenuDetail {
        id: menu.id,
        name: menu.name,
        notes: menu.notes,
        items: items.iter().map(ItemView::from).collect(),
        totals: menu.cached_totals.into(),
    })
}

// ============================================================================
// Menu Tools
// ============================================================================

pub fn create_menu(db: &Database, name: &str, notes: Option<&str>) -> Result<MenuDetail, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let menu = Menu::create(&conn, name, notes).map_err(|e| format!("Failed to create menu: {}", e))?;
    tracing::info!("Created menu '{}' ({})", menu.name, menu.id);

    detail(&conn, menu).map_err(|e| format!("Failed to load menu: {}", e))
}

/// Add an item and refresh the menu totals in one transaction
pub fn add_menu_item(db: &Database, menu_id: i64, data: &MealItemCreate) -> Result<AddMenuItemResponse, String> {
    db.with_transaction(|tx| {
        let item = Menu::add_item(tx, menu_id, data)?;
        let menu = Menu::get_by_id(tx, menu_id)?
            .ok_or_else(|| DbError::NotFound(format!("Menu {}", menu_id)))?;

        Ok(AddMenuItemResponse {
            menu_id,
            item: ItemView::from(&item),
            menu_totals: menu.cached_totals.into(),
        })
    })
    .map_err(|e| format!("Failed to add menu item: {}", e))
}

pub fn remove_menu_item(db: &Database, menu_id: i64, item_id: i64) -> Result<RemoveMenuItemResponse, String> {
    db.with_transaction(|tx| {
        let removed = Menu::remove_item(tx, menu_id, item_id)?;
        let menu = Menu::get_by_id(tx, menu_id)?
            .ok_or_else(|| DbError::NotFound(format!("Menu {}", menu_id)))?;

        Ok(RemoveMenuItemResponse {
            menu_id,
            item_id,
            removed,
            menu_totals: menu.cached_totals.into(),
        })
    })
    .map_err(|e| format!("Failed to remove menu item: {}", e))
}

pub fn get_menu(db: &Database, id: Option<i64>, name: Option<&str>) -> Result<Option<MenuDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    match find_menu(&conn, id, name).map_err(|e| format!("Failed to get menu: {}", e))? {
        Some(menu) => detail(&conn, menu)
            .map(Some)
            .map_err(|e| format!("Failed to load menu: {}", e)),
        None => Ok(None),
    }
}

pub fn list_menus(db: &Database, search: Option<&str>, limit: i64, offset: i64) -> Result<ListMenusResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let menus = Menu::list(&conn, search, limit.clamp(1, 200), offset.max(0))
        .map_err(|e| format!("Failed to list menus: {}", e))?;
    let total = Menu::count(&conn).map_err(|e| format!("Failed to count menus: {}", e))?;

    Ok(ListMenusResponse {
        menus: menus
            .into_iter()
            .map(|m| MenuSummary {
                id: m.id,
                name: m.name,
                totals: m.cached_totals.into(),
            })
            .collect(),
        total,
    })
}

/// Copy a menu's items into a new meal on `date`, all or nothing
pub fn apply_menu(
    db: &Database,
    id: Option<i64>,
    name: Option<&str>,
    date: &str,
    meal_type: MealType,
) -> Result<ApplyMenuResponse, String> {
    validate_date(date).map_err(|e| e.to_string())?;

    db.with_transaction(|tx| {
        let menu = find_menu(tx, id, name)?.ok_or_else(|| DbError::NotFound("Menu".to_string()))?;
        let meal = Menu::apply_to_day(tx, menu.id, date, meal_type)?;
        let items_copied = MealItem::list_for_meal(tx, meal.id)?.len();
        let day = Day::get_or_create(tx, date)?;

        tracing::info!("Applied menu '{}' to {} {}", menu.name, date, meal_type.as_str());

        Ok(ApplyMenuResponse {
            menu_id: menu.id,
            menu_name: menu.name,
            date: date.to_string(),
            meal_id: meal.id,
            meal_type,
            items_copied,
            meal_totals: meal.cached_totals.into(),
            day_totals: day.cached_totals.into(),
        })
    })
    .map_err(|e| format!("Failed to apply menu: {}", e))
}

pub fn delete_menu(db: &Database, menu_id: i64) -> Result<DeleteMenuResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let deleted = Menu::delete(&conn, menu_id).map_err(|e| format!("Failed to delete menu: {}", e))?;
    Ok(DeleteMenuResponse { menu_id, deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NutrientProfile, ServingSpec};
    use crate::sources::SourceKind;
    use crate::tools::meals::log_food;

    fn oats() -> MealItemCreate {
        MealItemCreate {
            name: "Oats".to_string(),
            brand: None,
            source: SourceKind::Manual,
            source_ref: None,
            profile: NutrientProfile::new(380.0, 13.0, 60.0, 7.0),
            serving: ServingSpec::grams(50.0),
        }
    }

    #[test]
    fn test_menu_lifecycle() {
        let db = Database::in_memory().unwrap();
        let menu = create_menu(&db, "Weekday breakfast", Some("before gym")).unwrap();
        assert!(menu.items.is_empty());

        let added = add_menu_item(&db, menu.id, &oats()).unwrap();
        assert_eq!(added.menu_totals.raw.calories, 190.0);
        add_menu_item(&db, menu.id, &oats()).unwrap();

        let by_name = get_menu(&db, None, Some("weekday breakfast")).unwrap().unwrap();
        assert_eq!(by_name.items.len(), 2);
        assert_eq!(by_name.totals.raw.calories, 380.0);

        let removed = remove_menu_item(&db, menu.id, added.item.id).unwrap();
        assert!(removed.removed);
        assert_eq!(removed.menu_totals.raw.calories, 190.0);

        assert_eq!(list_menus(&db, Some("breakfast"), 10, 0).unwrap().menus.len(), 1);
        assert!(delete_menu(&db, menu.id).unwrap().deleted);
        assert!(get_menu(&db, Some(menu.id), None).unwrap().is_none());
    }

    #[test]
    fn test_failed_total_refresh_leaves_menu_unchanged() {
        let db = Database::in_memory().unwrap();
        let menu = create_menu(&db, "Snack box", None).unwrap();
        let kept = add_menu_item(&db, menu.id, &oats()).unwrap();

        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER block_menu_totals BEFORE UPDATE OF cached_calories ON menus
                 BEGIN SELECT RAISE(ABORT, 'totals locked'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        assert!(add_menu_item(&db, menu.id, &oats()).is_err());
        assert!(remove_menu_item(&db, menu.id, kept.item.id).is_err());

        let detail = get_menu(&db, Some(menu.id), None).unwrap().unwrap();
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].id, kept.item.id);
        assert_eq!(detail.totals.raw.calories, 190.0);
    }

    #[test]
    fn test_apply_menu_adds_to_existing_day() {
        let db = Database::in_memory().unwrap();
        let menu = create_menu(&db, "Oats", None).unwrap();
        add_menu_item(&db, menu.id, &oats()).unwrap();
        log_food(&db, "2025-08-01", MealType::Breakfast, &oats()).unwrap();

        let applied = apply_menu(&db, None, Some("oats"), "2025-08-01", MealType::Breakfast).unwrap();
        assert_eq!(applied.items_copied, 1);
        assert_eq!(applied.meal_totals.raw.calories, 190.0);
        assert_eq!(applied.day_totals.raw.calories, 380.0);

        assert!(apply_menu(&db, Some(999), None, "2025-08-01", MealType::Lunch).is_err());
        assert!(apply_menu(&db, Some(menu.id), None, "not-a-date", MealType::Lunch).is_err());
    }
}
