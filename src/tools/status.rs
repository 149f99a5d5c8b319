//! MacroLog Status Tool
//!
//! Runtime status and the logging guide served to assistants.

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;

use crate::build_info::BuildInfo;
use crate::db::migrations::get_schema_version;
use crate::db::Database;
use crate::models::{Day, Menu};
use crate::sources::SourceKind;

/// Meal logging instructions for AI assistants
pub const LOGGING_INSTRUCTIONS: &str = r#"
# MacroLog Logging Instructions

MacroLog stores what was eaten as items inside meals inside days. Every item
keeps a per-100g snapshot of the food, the serving that was eaten, and the
calories and macros computed from the two. Meal and day totals are sums over
items and are recomputed on every change.

---

## Finding a Food

1. **Barcode on hand?** Call `lookup_barcode` with the digits (8 to 14).
   Open Food Facts is tried first, then USDA FoodData Central if configured.
2. **Otherwise** call `search_foods` with a short query ("greek yogurt plain").
3. Each result carries `source`, `source_ref`, `profile` (per 100 g),
   `default_serving` and `per_serving` macros for one declared serving.

If `serving_approximate` is true the serving grams were estimated from a volume
at 1 g/ml. Ask for the weight when precision matters (oils, syrups, flours).

---

## Logging

Call `log_food` with:
- `date`: `YYYY-MM-DD`
- `meal_type`: breakfast, lunch, dinner, snack or unspecified
- **either** `source` + `source_ref` from a lookup result
- **or** a manual entry: `name` plus any of `calories_per_100g`,
  `protein_per_100g`, `carbs_per_100g`, `fat_per_100g`
- `number_of_servings` (default 1)
- optionally `serving_size_grams`, or `serving_text` such as "2 tbsp (32 g)"

### Calories

When calories are given they are kept as labelled, even if they disagree with
the macros. When they are missing or zero they are derived as
`4 x protein + 4 x carbs + 9 x fat`.

### Converting label values

Labels usually give values per serving. Per-100g is
`value / serving_grams * 100`:
- 190 kcal per 2 tbsp (32 g) -> 190 / 32 * 100 = 594 kcal per 100 g

---

## Editing

- `update_item_serving`: change grams per serving or the count. The stored
  per-100g snapshot is rescaled; the food is not looked up again.
- `remove_item`: removes the item and recomputes meal and day totals.
- `get_item_baseline`: shows the per-100g values recovered from the stored
  totals, useful before re-entering an item by hand.

---

## Menus

A menu is a saved list of items ("weekday breakfast"). Build one with
`create_menu` and `add_menu_item` (same food fields as `log_food`), then
`apply_menu` copies the items into a new meal on a date. Later edits to the
menu do not change meals it was applied to.

---

## Goals and Totals

- `set_goals` stores daily calorie and macro targets.
- `get_day` returns meals, items, totals and progress against goals.
- Totals come as `raw` (exact), `display` (calories whole, macros to 0.1 g)
  and `calories_nearest_50`. Use `display` when talking to the user.
- `recalculate_day_totals` rebuilds a day's cached totals from its items.
- `calculate_macros` scales a profile to a serving without storing anything.
"#;

#[derive(Debug, Serialize)]
pub struct MacroLogStatus {
    /// Build information
    pub name: &'static str,
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Database information
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: i32,
    pub day_count: i64,
    pub menu_count: i64,

    /// Food sources in lookup order
    pub food_sources: Vec<SourceKind>,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    food_sources: Vec<SourceKind>,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, food_sources: Vec<SourceKind>) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            food_sources,
        }
    }

    pub fn get_status(&self, db: &Database) -> Result<MacroLogStatus, String> {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        let schema_version = get_schema_version(&conn).map_err(|e| format!("Failed to read schema version: {}", e))?;
        let day_count = Day::count(&conn, None, None).map_err(|e| format!("Failed to count days: {}", e))?;
        let menu_count = Menu::count(&conn).map_err(|e| format!("Failed to count menus: {}", e))?;

        Ok(MacroLogStatus {
            name: build_info.name,
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version,
            day_count,
            menu_count,
            food_sources: self.food_sources.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: std::process::id(),
        })
    }
}
