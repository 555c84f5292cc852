use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{instrument, warn};

use super::repo::ImageRow;
use super::services::{list_images, upload_image, UploadItem};
use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals/:id/images", post(upload_meal_image).get(list_meal_images))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

/// POST /meals/:id/images (multipart, field `image`)
#[instrument(skip(state, mp))]
pub async fn upload_meal_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<ImageRow>), AppError> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(e.to_string()))?;

        let row = upload_image(
            &state,
            id,
            UploadItem {
                file_name: file_name.as_deref(),
                body,
                content_type: &content_type,
            },
        )
        .await?;
        return Ok((StatusCode::CREATED, Json(row)));
    }

    warn!(meal_id = id, "upload without image field");
    Err(AppError::validation("image field is required"))
}

#[instrument(skip(state))]
pub async fn list_meal_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ImageRow>>, AppError> {
    Ok(Json(list_images(&state, id).await?))
}

#[cfg(test)]
mod upload_tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::meals::{dto::MealInput, services as meals};

    const BOUNDARY: &str = "meal-tracker-boundary";

    fn multipart_body(field: &str, file_name: &str, bytes: &str) -> String {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: image/png\r\n\r\n\
             {bytes}\r\n\
             --{BOUNDARY}--\r\n"
        )
    }

    async fn post(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
        let req = Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn upload_and_list_over_http() {
        let state = AppState::fake().await.unwrap();
        let meal_id = meals::create(
            &state,
            MealInput {
                name: "Ramen".into(),
                description: "Broth and noodles.".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .meal_id;
        let app = crate::app::build_app(state);

        let uri = format!("/api/v1/meals/{meal_id}/images");
        let (status, image) = post(app.clone(), &uri, multipart_body("image", "ramen.png", "PNGDATA")).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(image["meal_id"], meal_id);
        assert!(image["path"].as_str().unwrap().ends_with("-ramen.png"));

        let res = app
            .oneshot(Request::get(&uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let listed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_field_name_is_rejected() {
        let state = AppState::fake().await.unwrap();
        let app = crate::app::build_app(state);
        let (status, body) = post(
            app,
            "/api/v1/meals/1/images",
            multipart_body("file", "x.png", "PNGDATA"),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "image field is required");
    }
}
