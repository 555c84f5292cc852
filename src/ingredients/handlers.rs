use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::repo;
use crate::{error::AppError, meals::repo_types::IngredientRow, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/ingredients", get(list_ingredients))
}

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
) -> Result<Json<Vec<IngredientRow>>, AppError> {
    let mut conn = state.db.acquire().await?;
    let rows = repo::list_all(&mut conn).await?;
    Ok(Json(rows))
}
