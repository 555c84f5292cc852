use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo::{self, ImageRow};
use crate::error::{AppError, AppResult};
use crate::meals::repo as meals_repo;
use crate::state::AppState;

pub struct UploadItem<'a> {
    pub file_name: Option<&'a str>,
    pub body: Bytes,
    pub content_type: &'a str,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Client file name reduced to `[A-Za-z0-9._-]`, without leading dots or
/// directories. Falls back to `upload.<ext>` when nothing usable is left.
pub(crate) fn safe_file_name(name: Option<&str>, content_type: &str) -> String {
    lazy_static! {
        static ref UNSAFE: Regex = Regex::new(r"[^A-Za-z0-9._-]+").unwrap();
    }
    let base = name
        .and_then(|n| n.rsplit(|c: char| c == '/' || c == '\\').next())
        .unwrap_or_default();
    let cleaned = UNSAFE.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        format!("upload.{}", ext_from_mime(content_type).unwrap_or("bin"))
    } else {
        cleaned.to_string()
    }
}

async fn ensure_meal(st: &AppState, meal_id: i64) -> AppResult<()> {
    let mut conn = st.db.acquire().await?;
    if !meals_repo::meal_exists(&mut conn, meal_id).await? {
        return Err(AppError::meal_not_found(meal_id));
    }
    Ok(())
}

/// Stores the bytes, then records them against the meal. The key is unique
/// per upload, so equal client file names never overwrite each other.
#[instrument(skip(st, item), fields(size = item.body.len()))]
pub async fn upload_image(st: &AppState, meal_id: i64, item: UploadItem<'_>) -> AppResult<ImageRow> {
    if item.body.is_empty() {
        return Err(AppError::validation("image is empty"));
    }
    ensure_meal(st, meal_id).await?;

    let key = format!(
        "meals/{}/{}-{}",
        meal_id,
        Uuid::new_v4(),
        safe_file_name(item.file_name, item.content_type)
    );
    let reference = st
        .storage
        .put_object(&key, item.body, item.content_type)
        .await
        .map_err(AppError::ObjectStore)?;

    let recorded = async {
        let mut tx = st.db.begin().await?;
        let row = repo::insert_image(&mut tx, meal_id, &reference, OffsetDateTime::now_utc()).await?;
        tx.commit().await?;
        Ok::<_, AppError>(row)
    }
    .await;

    match recorded {
        Ok(row) => {
            info!(meal_id, image_id = row.image_id, path = %row.path, "image uploaded");
            Ok(row)
        }
        Err(e) => {
            if let Err(cleanup) = st.storage.delete_object(&reference).await {
                warn!(error = %cleanup, %reference, "orphaned image object");
            }
            Err(e)
        }
    }
}

#[instrument(skip(st))]
pub async fn list_images(st: &AppState, meal_id: i64) -> AppResult<Vec<ImageRow>> {
    let mut conn = st.db.acquire().await?;
    if !meals_repo::meal_exists(&mut conn, meal_id).await? {
        return Err(AppError::meal_not_found(meal_id));
    }
    repo::list_by_meal(&mut conn, meal_id).await
}
