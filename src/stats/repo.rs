use sqlx::{FromRow, SqliteConnection};

use super::dto::{CategoryCount, MostCooked, RecentLog};
use crate::error::AppResult;
use crate::meals::repo::with_id_list;

/// Raw aggregate over one meal's log entries. Only meals with at least one
/// entry produce a row.
#[derive(Debug, FromRow)]
pub struct MealStatsRow {
    pub meal_id: i64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub meal_count: i64,
    pub avg_rating: Option<f64>,
}

#[derive(Debug, FromRow)]
pub struct TotalsRow {
    pub total_meals: i64,
    pub total_log_entries: i64,
    pub meals_logged: i64,
    pub avg_rating: Option<f64>,
    pub first_log_date: Option<String>,
    pub latest_log_date: Option<String>,
}

/// Meal columns that get a per-value breakdown on the dashboard.
#[derive(Debug, Clone, Copy)]
pub enum Category {
    CuisineType,
    CookingMode,
    CookingEase,
}

impl Category {
    fn column(self) -> &'static str {
        match self {
            Category::CuisineType => "cuisine_type",
            Category::CookingMode => "cooking_mode",
            Category::CookingEase => "cooking_ease",
        }
    }
}

pub async fn per_meal(conn: &mut SqliteConnection, meal_ids: &[i64]) -> AppResult<Vec<MealStatsRow>> {
    if meal_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = with_id_list(
        "SELECT meal_id, MIN(date) AS first_date, MAX(date) AS last_date, \
                COUNT(*) AS meal_count, AVG(rating) AS avg_rating \
           FROM log_entries \
          WHERE meal_id IN",
        meal_ids,
        "GROUP BY meal_id",
    )
    .build_query_as::<MealStatsRow>()
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn totals(conn: &mut SqliteConnection) -> AppResult<TotalsRow> {
    let row = sqlx::query_as::<_, TotalsRow>(
        r#"
        SELECT (SELECT COUNT(*) FROM meals) AS total_meals,
               COUNT(*)                    AS total_log_entries,
               COUNT(DISTINCT meal_id)     AS meals_logged,
               AVG(rating)                 AS avg_rating,
               MIN(date)                   AS first_log_date,
               MAX(date)                   AS latest_log_date
          FROM log_entries
        "#,
    )
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn breakdown(conn: &mut SqliteConnection, category: Category) -> AppResult<Vec<CategoryCount>> {
    let col = category.column();
    let rows = sqlx::query_as::<_, CategoryCount>(&format!(
        "SELECT {col} AS value, COUNT(*) AS count \
           FROM meals \
          WHERE {col} IS NOT NULL AND TRIM({col}) <> '' \
          GROUP BY {col} \
          ORDER BY count DESC, value ASC"
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn most_cooked(conn: &mut SqliteConnection, limit: i64) -> AppResult<Vec<MostCooked>> {
    let rows = sqlx::query_as::<_, MostCooked>(
        r#"
        SELECT m.meal_id, m.name, COUNT(l.log_entry_id) AS times_cooked
          FROM meals m
          JOIN log_entries l ON l.meal_id = m.meal_id
         GROUP BY m.meal_id, m.name
         ORDER BY times_cooked DESC, m.meal_id ASC
         LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn recent_logs(conn: &mut SqliteConnection, limit: i64) -> AppResult<Vec<RecentLog>> {
    let rows = sqlx::query_as::<_, RecentLog>(
        r#"
        SELECT l.log_entry_id, l.meal_id, m.name AS meal_name, l.date, l.rating, l.notes
          FROM log_entries l
          JOIN meals m ON m.meal_id = l.meal_id
         ORDER BY l.date DESC, l.log_entry_id DESC
         LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
