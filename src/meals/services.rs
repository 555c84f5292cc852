//! The meal aggregate: the only place that writes a meal together with its
//! ingredients, directions and log entries. Each operation runs in one
//! transaction, so a failure part way leaves the previous state untouched.

use sqlx::SqliteConnection;
use tracing::{info, instrument, warn};

use super::dto::{
    CollectionUpdate, DirectionInput, IngredientInput, LogEntryInput, MealAggregate, MealInput,
    RatingInput,
};
use super::repo;
use super::repo_types::{MealFields, MealRow, RatingRow, Relation};
use crate::error::{AppError, AppResult};
use crate::images::repo as images_repo;
use crate::ingredients::services::resolve_or_create;
use crate::state::AppState;
use crate::stats::{dto::MealStats, services::per_meal_stats};

/// Largest page `read_many` serves. Page ids are bound one per variable in
/// the batched relation and stats queries.
pub const MAX_PAGE_LIMIT: i64 = 500;

const AGGREGATE_RELATIONS: [Relation; 3] = [
    Relation::Ingredients,
    Relation::Directions,
    Relation::LogEntries,
];

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn validate_rating(rating: i64) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::validation(format!(
            "rating must be between 1 and 5, got {rating}"
        )));
    }
    Ok(())
}

/// Checks the whole payload before anything is written and returns the
/// scalar columns.
fn validate(input: &MealInput) -> AppResult<MealFields> {
    if is_blank(&input.name) {
        return Err(AppError::validation("name is required"));
    }
    if is_blank(&input.description) {
        return Err(AppError::validation("description is required"));
    }
    if input.ingredients.items().iter().any(|i| is_blank(&i.name)) {
        return Err(AppError::validation("ingredient name is required"));
    }
    if input.directions.items().iter().any(|d| is_blank(&d.description)) {
        return Err(AppError::validation("direction description is required"));
    }
    for entry in input.log_entries.items() {
        if is_blank(&entry.date) {
            return Err(AppError::validation("log entry date is required"));
        }
        if let Some(r) = entry.rating {
            validate_rating(r)?;
        }
    }

    Ok(MealFields {
        name: input.name.clone(),
        description: input.description.clone(),
        cuisine_type: input.cuisine_type.clone(),
        cooking_mode: input.cooking_mode.clone(),
        cooking_ease: input.cooking_ease.clone(),
        cooking_time: input.cooking_time,
        image_path: input.image_path.clone(),
        source_url: input.source_url.clone(),
    })
}

async fn attach_ingredients(
    conn: &mut SqliteConnection,
    meal_id: i64,
    items: &[IngredientInput],
) -> AppResult<()> {
    for item in items {
        let ingredient =
            resolve_or_create(conn, &item.name, item.quantity, item.unit.as_deref()).await?;
        repo::attach_ingredient(conn, meal_id, ingredient.ingredient_id).await?;
    }
    Ok(())
}

async fn insert_directions(
    conn: &mut SqliteConnection,
    meal_id: i64,
    items: &[DirectionInput],
) -> AppResult<()> {
    for d in items {
        if !repo::insert_direction_if_absent(conn, meal_id, d.step_number, &d.description).await? {
            warn!(meal_id, step_number = d.step_number, "duplicate step skipped");
        }
    }
    Ok(())
}

async fn insert_log_entries(
    conn: &mut SqliteConnection,
    meal_id: i64,
    items: &[LogEntryInput],
) -> AppResult<()> {
    for e in items {
        repo::insert_log_entry(
            conn,
            meal_id,
            &e.date,
            e.rating,
            e.notes.as_deref(),
            e.user_id.as_deref(),
        )
        .await?;
    }
    Ok(())
}

/// Resolves collections and stats for a batch of meals with a fixed number of
/// queries, independent of the batch size. Output keeps the input order.
async fn load_aggregates(
    conn: &mut SqliteConnection,
    meals: Vec<MealRow>,
) -> AppResult<Vec<MealAggregate>> {
    let ids: Vec<i64> = meals.iter().map(|m| m.meal_id).collect();
    let mut rel = repo::load_relations(conn, &ids, &AGGREGATE_RELATIONS).await?;
    let mut stats = per_meal_stats(conn, &ids).await?;

    Ok(meals
        .into_iter()
        .map(|m| {
            let id = m.meal_id;
            MealAggregate::assemble(
                m,
                rel.ingredients.remove(&id).unwrap_or_default(),
                rel.directions.remove(&id).unwrap_or_default(),
                rel.log_entries.remove(&id).unwrap_or_default(),
                stats
                    .remove(&id)
                    .unwrap_or_else(|| MealStats::never_logged(id)),
            )
        })
        .collect())
}

async fn load_one(conn: &mut SqliteConnection, meal_id: i64) -> AppResult<MealAggregate> {
    let meal = repo::get_meal(conn, meal_id)
        .await?
        .ok_or_else(|| AppError::meal_not_found(meal_id))?;
    load_aggregates(conn, vec![meal])
        .await?
        .pop()
        .ok_or_else(|| AppError::meal_not_found(meal_id))
}

#[instrument(skip(st, input), fields(name = %input.name))]
pub async fn create(st: &AppState, input: MealInput) -> AppResult<MealAggregate> {
    let fields = validate(&input)?;

    let mut tx = st.db.begin().await?;
    let meal_id = repo::insert_meal(&mut tx, &fields).await?;
    attach_ingredients(&mut tx, meal_id, input.ingredients.items()).await?;
    insert_directions(&mut tx, meal_id, input.directions.items()).await?;
    insert_log_entries(&mut tx, meal_id, input.log_entries.items()).await?;
    let aggregate = load_one(&mut tx, meal_id).await?;
    tx.commit().await?;

    info!(meal_id, "meal created");
    Ok(aggregate)
}

#[instrument(skip(st))]
pub async fn read_one(st: &AppState, meal_id: i64) -> AppResult<MealAggregate> {
    let mut conn = st.db.acquire().await?;
    load_one(&mut conn, meal_id).await
}

/// One page of meals in id order, each with its collections and stats.
#[instrument(skip(st))]
pub async fn read_many(st: &AppState, skip: i64, limit: i64) -> AppResult<Vec<MealAggregate>> {
    if skip < 0 || limit < 0 {
        return Err(AppError::validation("skip and limit must not be negative"));
    }
    if limit > MAX_PAGE_LIMIT {
        return Err(AppError::validation(format!(
            "limit must be at most {MAX_PAGE_LIMIT}, got {limit}"
        )));
    }
    let mut conn = st.db.acquire().await?;
    let meals = repo::list_meals(&mut conn, skip, limit).await?;
    load_aggregates(&mut conn, meals).await
}

/// Full replace of the scalar fields. Each collection is replaced wholesale
/// when the payload carries it and left alone otherwise. Shared ingredients
/// are only detached, never deleted.
#[instrument(skip(st, input))]
pub async fn update(st: &AppState, meal_id: i64, input: MealInput) -> AppResult<MealAggregate> {
    let fields = validate(&input)?;

    let mut tx = st.db.begin().await?;
    if !repo::update_meal(&mut tx, meal_id, &fields).await? {
        warn!(meal_id, "update of unknown meal");
        return Err(AppError::meal_not_found(meal_id));
    }

    if let CollectionUpdate::ReplaceWith(items) = &input.ingredients {
        repo::clear_relation(&mut tx, meal_id, Relation::Ingredients).await?;
        attach_ingredients(&mut tx, meal_id, items).await?;
    }
    if let CollectionUpdate::ReplaceWith(items) = &input.directions {
        repo::clear_relation(&mut tx, meal_id, Relation::Directions).await?;
        insert_directions(&mut tx, meal_id, items).await?;
    }
    if let CollectionUpdate::ReplaceWith(items) = &input.log_entries {
        repo::clear_relation(&mut tx, meal_id, Relation::LogEntries).await?;
        insert_log_entries(&mut tx, meal_id, items).await?;
    }

    let aggregate = load_one(&mut tx, meal_id).await?;
    tx.commit().await?;

    info!(meal_id, "meal updated");
    Ok(aggregate)
}

/// Deletes the meal and everything it owns. Stored image objects are removed
/// after the commit; a failure there is logged and does not undo the delete.
#[instrument(skip(st))]
pub async fn delete(st: &AppState, meal_id: i64) -> AppResult<()> {
    let mut tx = st.db.begin().await?;
    let images = images_repo::list_by_meal(&mut tx, meal_id).await?;
    if !repo::delete_meal(&mut tx, meal_id).await? {
        warn!(meal_id, "delete of unknown meal");
        return Err(AppError::meal_not_found(meal_id));
    }
    tx.commit().await?;
    info!(meal_id, images = images.len(), "meal deleted");

    for img in images {
        if let Err(e) = st.storage.delete_object(&img.path).await {
            warn!(error = %e, meal_id, path = %img.path, "stored image not removed");
        }
    }
    Ok(())
}

#[instrument(skip(st, input))]
pub async fn rate(st: &AppState, meal_id: i64, input: RatingInput) -> AppResult<RatingRow> {
    validate_rating(input.rating_score)?;

    let mut tx = st.db.begin().await?;
    if !repo::meal_exists(&mut tx, meal_id).await? {
        return Err(AppError::meal_not_found(meal_id));
    }
    let row = repo::insert_rating(&mut tx, meal_id, input.user_id.as_deref(), input.rating_score)
        .await?;
    tx.commit().await?;

    info!(meal_id, rating_id = row.rating_id, "meal rated");
    Ok(row)
}
