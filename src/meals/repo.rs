//! Entity store for meals and the rows they own or reference.
//!
//! Every function takes a bare connection so callers decide the commit
//! boundary: pass `&mut *tx` inside a transaction, or a pooled connection for
//! plain reads.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::repo_types::{
    DirectionRow, IngredientRow, LogEntryRow, MealFields, MealIngredientRow, MealRow, Ownership,
    RatingRow, Relation,
};
use crate::error::AppResult;

const MEAL_COLUMNS: &str = "meal_id, name, description, cuisine_type, cooking_mode, \
                            cooking_ease, cooking_time, image_path, source_url";

/// `<prefix> (?, ?, ...) <suffix>` with one bind per id.
pub(crate) fn with_id_list<'a>(prefix: &str, ids: &[i64], suffix: &str) -> QueryBuilder<'a, Sqlite> {
    let mut qb = QueryBuilder::new(prefix);
    qb.push(" (");
    let mut sep = qb.separated(", ");
    for id in ids {
        sep.push_bind(*id);
    }
    qb.push(") ");
    qb.push(suffix);
    qb
}

pub async fn insert_meal(conn: &mut SqliteConnection, m: &MealFields) -> AppResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO meals (name, description, cuisine_type, cooking_mode,
                           cooking_ease, cooking_time, image_path, source_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING meal_id
        "#,
    )
    .bind(&m.name)
    .bind(&m.description)
    .bind(&m.cuisine_type)
    .bind(&m.cooking_mode)
    .bind(&m.cooking_ease)
    .bind(m.cooking_time)
    .bind(&m.image_path)
    .bind(&m.source_url)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Overwrites every scalar column. Returns false when the meal does not exist.
pub async fn update_meal(conn: &mut SqliteConnection, meal_id: i64, m: &MealFields) -> AppResult<bool> {
    let res = sqlx::query(
        r#"
        UPDATE meals
           SET name = $1, description = $2, cuisine_type = $3, cooking_mode = $4,
               cooking_ease = $5, cooking_time = $6, image_path = $7, source_url = $8
         WHERE meal_id = $9
        "#,
    )
    .bind(&m.name)
    .bind(&m.description)
    .bind(&m.cuisine_type)
    .bind(&m.cooking_mode)
    .bind(&m.cooking_ease)
    .bind(m.cooking_time)
    .bind(&m.image_path)
    .bind(&m.source_url)
    .bind(meal_id)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn get_meal(conn: &mut SqliteConnection, meal_id: i64) -> AppResult<Option<MealRow>> {
    let row = sqlx::query_as::<_, MealRow>(&format!(
        "SELECT {MEAL_COLUMNS} FROM meals WHERE meal_id = $1"
    ))
    .bind(meal_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn meal_exists(conn: &mut SqliteConnection, meal_id: i64) -> AppResult<bool> {
    let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM meals WHERE meal_id = $1")
        .bind(meal_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Page of meals in id order.
pub async fn list_meals(conn: &mut SqliteConnection, skip: i64, limit: i64) -> AppResult<Vec<MealRow>> {
    let rows = sqlx::query_as::<_, MealRow>(&format!(
        "SELECT {MEAL_COLUMNS} FROM meals ORDER BY meal_id ASC LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(skip)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// Links an ingredient to a meal. Returns false if the link already existed.
pub async fn attach_ingredient(
    conn: &mut SqliteConnection,
    meal_id: i64,
    ingredient_id: i64,
) -> AppResult<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO meal_ingredients (meal_id, ingredient_id)
        VALUES ($1, $2)
        ON CONFLICT (meal_id, ingredient_id) DO NOTHING
        "#,
    )
    .bind(meal_id)
    .bind(ingredient_id)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() > 0)
}

/// Inserts a step unless the meal already has one with that number.
pub async fn insert_direction_if_absent(
    conn: &mut SqliteConnection,
    meal_id: i64,
    step_number: i64,
    description: &str,
) -> AppResult<bool> {
    let res = sqlx::query(
        r#"
        INSERT INTO directions (meal_id, step_number, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (meal_id, step_number) DO NOTHING
        "#,
    )
    .bind(meal_id)
    .bind(step_number)
    .bind(description)
    .execute(&mut *conn)
    .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn insert_log_entry(
    conn: &mut SqliteConnection,
    meal_id: i64,
    date: &str,
    rating: Option<i64>,
    notes: Option<&str>,
    user_id: Option<&str>,
) -> AppResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO log_entries (meal_id, date, rating, notes, user_id)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING log_entry_id
        "#,
    )
    .bind(meal_id)
    .bind(date)
    .bind(rating)
    .bind(notes)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

pub async fn insert_rating(
    conn: &mut SqliteConnection,
    meal_id: i64,
    user_id: Option<&str>,
    rating_score: i64,
) -> AppResult<RatingRow> {
    let row = sqlx::query_as::<_, RatingRow>(
        r#"
        INSERT INTO ratings (meal_id, user_id, rating_score)
        VALUES ($1, $2, $3)
        RETURNING rating_id, meal_id, user_id, rating_score
        "#,
    )
    .bind(meal_id)
    .bind(user_id)
    .bind(rating_score)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// Removes the meal-scoped rows of one relation. For an owned relation the
/// rows themselves are deleted; for a shared one only the association rows,
/// the shared entities are left in place.
pub async fn clear_relation(
    conn: &mut SqliteConnection,
    meal_id: i64,
    relation: Relation,
) -> AppResult<u64> {
    let res = sqlx::query(&format!("DELETE FROM {} WHERE meal_id = $1", relation.table()))
        .bind(meal_id)
        .execute(&mut *conn)
        .await?;
    let removed = res.rows_affected();
    match relation.ownership() {
        Ownership::Owned => tracing::debug!(meal_id, ?relation, removed, "deleted owned rows"),
        Ownership::Shared => tracing::debug!(meal_id, ?relation, removed, "detached shared rows"),
    }
    Ok(removed)
}

/// Deletes a meal after cascading through every relation. Returns false when
/// there was no such meal.
pub async fn delete_meal(conn: &mut SqliteConnection, meal_id: i64) -> AppResult<bool> {
    for relation in Relation::ALL {
        clear_relation(conn, meal_id, relation).await?;
    }
    let res = sqlx::query("DELETE FROM meals WHERE meal_id = $1")
        .bind(meal_id)
        .execute(&mut *conn)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Eagerly loaded collections for a set of meals, keyed by meal id.
#[derive(Debug, Default)]
pub struct LoadedRelations {
    pub ingredients: HashMap<i64, Vec<IngredientRow>>,
    pub directions: HashMap<i64, Vec<DirectionRow>>,
    pub log_entries: HashMap<i64, Vec<LogEntryRow>>,
}

/// Fetches the requested collections for all `meal_ids` with one query per
/// relation, whatever the number of meals. Images and ratings are not part of
/// the aggregate view and are ignored here.
pub async fn load_relations(
    conn: &mut SqliteConnection,
    meal_ids: &[i64],
    relations: &[Relation],
) -> AppResult<LoadedRelations> {
    let mut out = LoadedRelations::default();
    if meal_ids.is_empty() {
        return Ok(out);
    }

    if relations.contains(&Relation::Ingredients) {
        let rows = with_id_list(
            "SELECT mi.meal_id, i.ingredient_id, i.name, i.quantity, i.unit \
             FROM meal_ingredients mi \
             JOIN ingredients i ON i.ingredient_id = mi.ingredient_id \
             WHERE mi.meal_id IN",
            meal_ids,
            "ORDER BY mi.meal_id, i.ingredient_id",
        )
        .build_query_as::<MealIngredientRow>()
        .fetch_all(&mut *conn)
        .await?;
        for r in rows {
            out.ingredients.entry(r.meal_id).or_default().push(r.ingredient);
        }
    }

    if relations.contains(&Relation::Directions) {
        let rows = with_id_list(
            "SELECT meal_id, step_number, description FROM directions WHERE meal_id IN",
            meal_ids,
            "ORDER BY meal_id, step_number",
        )
        .build_query_as::<DirectionRow>()
        .fetch_all(&mut *conn)
        .await?;
        for r in rows {
            out.directions.entry(r.meal_id).or_default().push(r);
        }
    }

    if relations.contains(&Relation::LogEntries) {
        let rows = with_id_list(
            "SELECT log_entry_id, meal_id, date, rating, notes, user_id \
             FROM log_entries WHERE meal_id IN",
            meal_ids,
            "ORDER BY meal_id, date, log_entry_id",
        )
        .build_query_as::<LogEntryRow>()
        .fetch_all(&mut *conn)
        .await?;
        for r in rows {
            out.log_entries.entry(r.meal_id).or_default().push(r);
        }
    }

    Ok(out)
}

#[cfg(test)]
pub async fn count_rows(conn: &mut SqliteConnection, relation: Relation, meal_id: i64) -> AppResult<i64> {
    let n = sqlx::query_scalar::<_, i64>(&format!(
        "SELECT COUNT(*) FROM {} WHERE meal_id = $1",
        relation.table()
    ))
    .bind(meal_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(n)
}
