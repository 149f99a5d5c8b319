//! Daily macro goals, stored as a single row

use rusqlite::{params, Connection};

use crate::db::{DbError, DbResult};
use super::MacroGoals;

impl MacroGoals {
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }

    /// Stored goals, or all zeros when none were set
    pub fn get(conn: &Connection) -> DbResult<Self> {
        let result = conn.query_row(
            "SELECT calories, protein, carbs, fat FROM goals WHERE id = 1",
            [],
            |row| {
                Ok(Self {
                    calories: row.get(0)?,
                    protein: row.get(1)?,
                    carbs: row.get(2)?,
                    fat: row.get(3)?,
                })
            },
        );

        match result {
            Ok(goals) => Ok(goals),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the stored goals. Every field must be finite and non-negative.
    pub fn set(conn: &Connection, goals: &Self) -> DbResult<Self> {
        let fields = [
            ("calories", goals.calories),
            ("protein", goals.protein),
            ("carbs", goals.carbs),
            ("fat", goals.fat),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(DbError::Invalid(format!("{} goal must be >= 0, got {}", name, value)));
        }

        conn.execute(
            r#"
            INSERT INTO goals (id, calories, protein, carbs, fat) VALUES (1, ?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                calories = excluded.calories,
                protein = excluded.protein,
                carbs = excluded.carbs,
                fat = excluded.fat,
                updated_at = datetime('now')
            "#,
            params![goals.calories, goals.protein, goals.carbs, goals.fat],
        )?;

        Self::get(conn)
    }
}
