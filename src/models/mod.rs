//! Data models
//!
//! Rust structs representing database entities.

mod day;
mod goals;
mod meal;
mod meal_item;
mod menu;
mod nutrition;
pub mod totals;

pub use day::{validate_date, Day};
pub use meal::{Meal, MealCreate, MealType};
pub use meal_item::{ItemOwner, MealItem, MealItemCreate};
pub use menu::Menu;
pub use nutrition::{AggregateTotals, MacroGoals, NutrientProfile, ScaledMacros, ServingSpec};
pub use totals::{
    recalculate_day_and_meals, recalculate_day_totals, recalculate_meal_totals,
    recalculate_menu_totals,
};
