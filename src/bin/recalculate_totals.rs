//! Rebuild cached meal and day totals for one date from the stored items
//! Usage: cargo run --bin recalculate_totals -- <YYYY-MM-DD>

use macrolog::config::Config;
use macrolog::db::Database;
use macrolog::models::{recalculate_day_and_meals, validate_date, Day, Meal};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let Some(date) = args.get(1) else {
        eprintln!("Usage: recalculate_totals <YYYY-MM-DD>");
        std::process::exit(2);
    };
    validate_date(date)?;

    let config = Config::from_env();
    println!("Database: {}", config.database_path.display());

    let database = Database::new(&config.database_path)?;

    database.with_transaction(|tx| {
        let day = match Day::get_by_date(tx, date)? {
            Some(d) => d,
            None => {
                println!("No data found for date: {}", date);
                return Ok(());
            }
        };

        let before = Meal::list_for_day(tx, day.id)?;
        let totals = recalculate_day_and_meals(tx, day.id)?;
        let after = Meal::list_for_day(tx, day.id)?;

        for (old, new) in before.iter().zip(after.iter()) {
            println!(
                "Meal {} ({}): {:.1} -> {:.1} kcal",
                new.id,
                new.meal_type.as_str(),
                old.cached_totals.calories,
                new.cached_totals.calories
            );
        }

        println!("\nDay {}:", date);
        println!("  Calories: {:.1} -> {:.1}", day.cached_totals.calories, totals.calories);
        println!("  Protein:  {:.1} -> {:.1} g", day.cached_totals.protein, totals.protein);
        println!("  Carbs:    {:.1} -> {:.1} g", day.cached_totals.carbs, totals.carbs);
        println!("  Fat:      {:.1} -> {:.1} g", day.cached_totals.fat, totals.fat);
        Ok(())
    })?;

    Ok(())
}
