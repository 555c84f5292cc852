use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{GlobalSummary, MealStats};
use super::services;
use crate::{error::AppError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/stats/summary", get(dashboard_summary))
        .route("/meals/:id/stats", get(meal_stats))
}

#[instrument(skip(state))]
pub async fn meal_stats(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MealStats>, AppError> {
    Ok(Json(services::stats_for(&state, id).await?))
}

#[instrument(skip(state))]
pub async fn dashboard_summary(
    State(state): State<AppState>,
) -> Result<Json<GlobalSummary>, AppError> {
    Ok(Json(services::global_summary(&state).await?))
}
