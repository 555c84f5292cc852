use serde::Serialize;
use sqlx::FromRow;

/// Date shown for a meal that has never been logged.
pub const NEVER_LOGGED: &str = "never";

/// Derived metrics over one meal's log entries.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MealStats {
    pub meal_id: i64,
    pub first_meal_date: String,
    pub recent_meal_date: String,
    pub meal_count: i64,
    pub avg_rating: f64, // non-null ratings only; 0.0 when there are none
}

impl MealStats {
    pub fn never_logged(meal_id: i64) -> Self {
        Self {
            meal_id,
            first_meal_date: NEVER_LOGGED.to_string(),
            recent_meal_date: NEVER_LOGGED.to_string(),
            meal_count: 0,
            avg_rating: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct CategoryCount {
    pub value: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct MostCooked {
    pub meal_id: i64,
    pub name: String,
    pub times_cooked: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct RecentLog {
    pub log_entry_id: i64,
    pub meal_id: i64,
    pub meal_name: String,
    pub date: String,
    pub rating: Option<i64>,
    pub notes: Option<String>,
}

/// Dashboard view across every meal.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GlobalSummary {
    pub total_meals: i64,
    pub total_log_entries: i64,
    pub meals_logged: i64,
    pub avg_rating: f64,
    pub first_log_date: String,
    pub latest_log_date: String,
    pub by_cuisine_type: Vec<CategoryCount>,
    pub by_cooking_mode: Vec<CategoryCount>,
    pub by_cooking_ease: Vec<CategoryCount>,
    pub most_cooked: Vec<MostCooked>,
    pub recent_logs: Vec<RecentLog>,
}
