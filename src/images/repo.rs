use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};
use time::OffsetDateTime;

use crate::error::AppResult;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct ImageRow {
    pub image_id: i64,
    pub meal_id: i64,
    pub path: String, // reference returned by the storage client
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
}

pub async fn insert_image(
    conn: &mut SqliteConnection,
    meal_id: i64,
    path: &str,
    uploaded_at: OffsetDateTime,
) -> AppResult<ImageRow> {
    let row = sqlx::query_as::<_, ImageRow>(
        r#"
        INSERT INTO images (meal_id, path, uploaded_at)
        VALUES ($1, $2, $3)
        RETURNING image_id, meal_id, path, uploaded_at
        "#,
    )
    .bind(meal_id)
    .bind(path)
    .bind(uploaded_at)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

/// All images of a meal, oldest first.
pub async fn list_by_meal(conn: &mut SqliteConnection, meal_id: i64) -> AppResult<Vec<ImageRow>> {
    let rows = sqlx::query_as::<_, ImageRow>(
        r#"
        SELECT image_id, meal_id, path, uploaded_at
          FROM images
         WHERE meal_id = $1
         ORDER BY image_id ASC
        "#,
    )
    .bind(meal_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
