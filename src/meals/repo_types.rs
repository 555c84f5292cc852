use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Meal record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct MealRow {
    pub meal_id: i64,
    pub name: String,
    pub description: String,
    pub cuisine_type: Option<String>,
    pub cooking_mode: Option<String>,
    pub cooking_ease: Option<String>,
    pub cooking_time: Option<i64>, // minutes
    pub image_path: Option<String>,
    pub source_url: Option<String>,
}

/// Scalar columns of a meal, as written by insert and update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealFields {
    pub name: String,
    pub description: String,
    pub cuisine_type: Option<String>,
    pub cooking_mode: Option<String>,
    pub cooking_ease: Option<String>,
    pub cooking_time: Option<i64>,
    pub image_path: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct IngredientRow {
    pub ingredient_id: i64,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

/// Ingredient joined through `meal_ingredients`, tagged with the owning meal.
#[derive(Debug, Clone, FromRow)]
pub struct MealIngredientRow {
    pub meal_id: i64,
    #[sqlx(flatten)]
    pub ingredient: IngredientRow,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct DirectionRow {
    pub meal_id: i64,
    pub step_number: i64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct LogEntryRow {
    pub log_entry_id: i64,
    pub meal_id: i64,
    pub date: String,
    pub rating: Option<i64>,
    pub notes: Option<String>,
    pub user_id: Option<String>,
}

/// Quick score left for a meal outside the cooking log.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RatingRow {
    pub rating_id: i64,
    pub meal_id: i64,
    pub user_id: Option<String>, // free-form, not a managed identity
    pub rating_score: i64,
}

/// How a meal holds the rows of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Rows belong to the meal and go away with it.
    Owned,
    /// Rows outlive the meal; only the association is removed.
    Shared,
}

/// Every collection hanging off a meal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Ingredients,
    Directions,
    LogEntries,
    Images,
    Ratings,
}

impl Relation {
    pub const ALL: [Relation; 5] = [
        Relation::Ingredients,
        Relation::Directions,
        Relation::LogEntries,
        Relation::Images,
        Relation::Ratings,
    ];

    pub fn ownership(self) -> Ownership {
        match self {
            Relation::Ingredients => Ownership::Shared,
            Relation::Directions
            | Relation::LogEntries
            | Relation::Images
            | Relation::Ratings => Ownership::Owned,
        }
    }

    /// Table holding the meal-scoped rows: the owned rows themselves, or the
    /// association rows for a shared relation.
    pub(crate) fn table(self) -> &'static str {
        match self {
            Relation::Ingredients => "meal_ingredients",
            Relation::Directions => "directions",
            Relation::LogEntries => "log_entries",
            Relation::Images => "images",
            Relation::Ratings => "ratings",
        }
    }
}
