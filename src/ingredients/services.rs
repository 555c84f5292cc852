use sqlx::SqliteConnection;
use tracing::debug;

use super::repo;
use crate::error::{AppError, AppResult};
use crate::meals::repo_types::IngredientRow;

/// Returns the ingredient stored under `name`, creating it if there is none.
///
/// A match is returned as stored: `quantity` and `unit` only matter when the
/// row is created. Identity is the exact name, and it is kept by looking up
/// before inserting, not by a constraint. Two transactions creating the same
/// new name race; under SQLite the loser fails on the write lock and surfaces
/// as [`AppError::Conflict`].
pub async fn resolve_or_create(
    conn: &mut SqliteConnection,
    name: &str,
    quantity: Option<f64>,
    unit: Option<&str>,
) -> AppResult<IngredientRow> {
    if name.trim().is_empty() {
        return Err(AppError::validation("ingredient name is required"));
    }
    if let Some(existing) = repo::find_by_name(conn, name).await? {
        debug!(ingredient_id = existing.ingredient_id, name, "ingredient reused");
        return Ok(existing);
    }
    let created = repo::insert_ingredient(conn, name, quantity, unit).await?;
    debug!(ingredient_id = created.ingredient_id, name, "ingredient created");
    Ok(created)
}
