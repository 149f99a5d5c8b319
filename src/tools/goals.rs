//! Goal MCP Tools

use serde::Serialize;

use crate::db::Database;
use crate::models::{validate_date, Day, MacroGoals};
use crate::nutrition::{goal_progress, GoalProgress};

/// Response for get_goals / set_goals
#[derive(Debug, Serialize)]
pub struct GoalsResponse {
    pub goals: MacroGoals,
    /// Progress for the requested date, when one was given and has a log
    pub date: Option<String>,
    pub progress: Option<GoalProgress>,
}

pub fn set_goals(db: &Database, goals: MacroGoals) -> Result<GoalsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let goals = MacroGoals::set(&conn, &goals).map_err(|e| format!("Failed to set goals: {}", e))?;
    tracing::info!(
        "Goals set: {:.0} kcal, {:.0} g protein, {:.0} g carbs, {:.0} g fat",
        goals.calories,
        goals.protein,
        goals.carbs,
        goals.fat
    );

    Ok(GoalsResponse {
        goals,
        date: None,
        progress: None,
    })
}

pub fn get_goals(db: &Database, date: Option<&str>) -> Result<GoalsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let goals = MacroGoals::get(&conn).map_err(|e| format!("Failed to get goals: {}", e))?;

    let progress = match date {
        Some(date) => {
            validate_date(date).map_err(|e| e.to_string())?;
            Day::get_by_date(&conn, date)
                .map_err(|e| format!("Failed to get day: {}", e))?
                .map(|day| goal_progress(&day.cached_totals, &goals))
        }
        None => None,
    };

    Ok(GoalsResponse {
        goals,
        date: date.map(str::to_string),
        progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let db = Database::in_memory().unwrap();
        assert_eq!(get_goals(&db, None).unwrap().goals, MacroGoals::default());

        set_goals(&db, MacroGoals::new(2100.0, 140.0, 230.0, 70.0)).unwrap();
        let response = get_goals(&db, Some("2025-09-01")).unwrap();
        assert_eq!(response.goals.calories, 2100.0);
        assert!(response.progress.is_none());

        assert!(set_goals(&db, MacroGoals::new(f64::NAN, 0.0, 0.0, 0.0)).is_err());
        assert!(get_goals(&db, Some("someday")).is_err());
    }
}
