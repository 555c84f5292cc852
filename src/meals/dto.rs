use serde::{Deserialize, Serialize};

use crate::meals::repo_types::{DirectionRow, IngredientRow, LogEntryRow, MealRow, RatingRow};
use crate::stats::dto::MealStats;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct IngredientInput {
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DirectionInput {
    pub step_number: i64,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LogEntryInput {
    pub date: String,
    pub rating: Option<i64>, // 1..=5 when present
    pub notes: Option<String>,
    pub user_id: Option<String>,
}

/// What to do with one nested collection on write. An absent or `null` key
/// leaves the collection alone; a list replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Option<Vec<T>>")]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub enum CollectionUpdate<T> {
    Unchanged,
    ReplaceWith(Vec<T>),
}

impl<T> Default for CollectionUpdate<T> {
    fn default() -> Self {
        CollectionUpdate::Unchanged
    }
}

impl<T> From<Option<Vec<T>>> for CollectionUpdate<T> {
    fn from(v: Option<Vec<T>>) -> Self {
        match v {
            Some(items) => CollectionUpdate::ReplaceWith(items),
            None => CollectionUpdate::Unchanged,
        }
    }
}

impl<T> CollectionUpdate<T> {
    /// Items to write when building a meal from scratch.
    pub fn items(&self) -> &[T] {
        match self {
            CollectionUpdate::Unchanged => &[],
            CollectionUpdate::ReplaceWith(items) => items.as_slice(),
        }
    }
}

/// Body of create and of update. Update is a full replace of the scalar
/// fields: an omitted optional field is written as null.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MealInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cuisine_type: Option<String>,
    pub cooking_mode: Option<String>,
    pub cooking_ease: Option<String>,
    pub cooking_time: Option<i64>,
    pub image_path: Option<String>,
    pub source_url: Option<String>,
    #[serde(default)]
    pub ingredients: CollectionUpdate<IngredientInput>,
    #[serde(default)]
    pub directions: CollectionUpdate<DirectionInput>,
    #[serde(default)]
    pub log_entries: CollectionUpdate<LogEntryInput>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DirectionView {
    pub step_number: i64,
    pub description: String,
}

impl From<DirectionRow> for DirectionView {
    fn from(r: DirectionRow) -> Self {
        Self {
            step_number: r.step_number,
            description: r.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LogEntryView {
    pub log_entry_id: i64,
    pub date: String,
    pub rating: Option<i64>,
    pub notes: Option<String>,
    pub user_id: Option<String>,
}

impl From<LogEntryRow> for LogEntryView {
    fn from(r: LogEntryRow) -> Self {
        Self {
            log_entry_id: r.log_entry_id,
            date: r.date,
            rating: r.rating,
            notes: r.notes,
            user_id: r.user_id,
        }
    }
}

/// A meal with every collection resolved, as returned by the API.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MealAggregate {
    pub meal_id: i64,
    pub name: String,
    pub description: String,
    pub cuisine_type: Option<String>,
    pub cooking_mode: Option<String>,
    pub cooking_ease: Option<String>,
    pub cooking_time: Option<i64>,
    pub image_path: Option<String>,
    pub source_url: Option<String>,
    pub ingredients: Vec<IngredientRow>,
    pub directions: Vec<DirectionView>,
    pub log_entries: Vec<LogEntryView>,
    pub meal_stats: MealStats,
}

impl MealAggregate {
    pub fn assemble(
        meal: MealRow,
        ingredients: Vec<IngredientRow>,
        directions: Vec<DirectionRow>,
        log_entries: Vec<LogEntryRow>,
        meal_stats: MealStats,
    ) -> Self {
        Self {
            meal_id: meal.meal_id,
            name: meal.name,
            description: meal.description,
            cuisine_type: meal.cuisine_type,
            cooking_mode: meal.cooking_mode,
            cooking_ease: meal.cooking_ease,
            cooking_time: meal.cooking_time,
            image_path: meal.image_path,
            source_url: meal.source_url,
            ingredients,
            directions: directions.into_iter().map(Into::into).collect(),
            log_entries: log_entries.into_iter().map(Into::into).collect(),
            meal_stats,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 { 100 }

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub detail: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RatingInput {
    pub user_id: Option<String>,
    pub rating_score: i64,
}

pub type RatingResponse = RatingRow;
