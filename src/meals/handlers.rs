use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{DeletedResponse, MealAggregate, MealInput, Pagination, RatingInput, RatingResponse};
use super::services;
use crate::{error::AppError, state::AppState};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/:id", get(get_meal))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal))
        .route("/meals/:id", axum::routing::put(update_meal).delete(delete_meal))
        .route("/meals/:id/ratings", post(rate_meal))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<MealAggregate>>, AppError> {
    let meals = services::read_many(&state, p.skip, p.limit).await?;
    Ok(Json(meals))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MealAggregate>, AppError> {
    Ok(Json(services::read_one(&state, id).await?))
}

#[instrument(skip(state, body))]
pub async fn create_meal(
    State(state): State<AppState>,
    Json(body): Json<MealInput>,
) -> Result<impl IntoResponse, AppError> {
    let meal = services::create(&state, body).await?;
    let location = format!("/api/v1/meals/{}", meal.meal_id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(meal)))
}

#[instrument(skip(state, body))]
pub async fn update_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<MealInput>,
) -> Result<Json<MealAggregate>, AppError> {
    Ok(Json(services::update(&state, id, body).await?))
}

#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeletedResponse>, AppError> {
    services::delete(&state, id).await?;
    Ok(Json(DeletedResponse {
        detail: "Meal deleted",
    }))
}

#[instrument(skip(state, body))]
pub async fn rate_meal(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<RatingInput>,
) -> Result<(StatusCode, Json<RatingResponse>), AppError> {
    let row = services::rate(&state, id, body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[cfg(test)]
mod handler_tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    async fn call(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn app() -> Router {
        let state = AppState::fake().await.unwrap();
        crate::app::build_app(state)
    }

    #[tokio::test]
    async fn crud_over_http() {
        let app = app().await;

        let (status, created) = call(
            app.clone(),
            Method::POST,
            "/api/v1/meals",
            Some(json!({
                "name": "Beef Tacos",
                "description": "Seasoned beef in crispy shells.",
                "cuisine_type": "Mexican",
                "ingredients": [{"name": "beef", "quantity": 500.0, "unit": "g"}],
                "directions": [{"step_number": 1, "description": "Brown the beef."}],
                "log_entries": [{"date": "2024-01-05", "rating": 4, "notes": "good"}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["meal_id"].as_i64().unwrap();
        assert_eq!(created["meal_stats"]["meal_count"], 1);

        let (status, fetched) = call(app.clone(), Method::GET, &format!("/api/v1/meals/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, updated) = call(
            app.clone(),
            Method::PUT,
            &format!("/api/v1/meals/{id}"),
            Some(json!({"name": "Beef Tacos", "description": "Now with salsa.", "directions": []})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["description"], "Now with salsa.");
        assert_eq!(updated["directions"], json!([]));
        assert_eq!(updated["ingredients"].as_array().unwrap().len(), 1);
        assert_eq!(updated["cuisine_type"], Value::Null);

        let (status, listed) = call(app.clone(), Method::GET, "/api/v1/meals?skip=0&limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, body) = call(app.clone(), Method::DELETE, &format!("/api/v1/meals/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["detail"], "Meal deleted");

        let (status, body) = call(app, Method::GET, &format!("/api/v1/meals/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], format!("meal {id} not found"));
    }

    #[tokio::test]
    async fn missing_name_is_unprocessable() {
        let app = app().await;
        let (status, body) = call(
            app,
            Method::POST,
            "/api/v1/meals",
            Some(json!({"description": "no name"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "name is required");
    }

    #[tokio::test]
    async fn delete_unknown_is_404() {
        let app = app().await;
        let (status, _) = call(app, Method::DELETE, "/api/v1/meals/12345", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn negative_paging_is_rejected() {
        let app = app().await;
        let (status, _) = call(app, Method::GET, "/api/v1/meals?skip=-1", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn oversized_page_is_rejected() {
        let app = app().await;
        let (status, body) = call(app, Method::GET, "/api/v1/meals?limit=40000", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "limit must be at most 500, got 40000");
    }

    #[tokio::test]
    async fn rating_route_creates_row() {
        let app = app().await;
        let (_, created) = call(
            app.clone(),
            Method::POST,
            "/api/v1/meals",
            Some(json!({"name": "Soup", "description": "Hot."})),
        )
        .await;
        let id = created["meal_id"].as_i64().unwrap();

        let (status, rating) = call(
            app,
            Method::POST,
            &format!("/api/v1/meals/{id}/ratings"),
            Some(json!({"user_id": "sam", "rating_score": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(rating["rating_score"], 5);
        assert_eq!(rating["meal_id"], id);
    }
}
