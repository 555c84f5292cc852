use sqlx::SqliteConnection;

use crate::error::AppResult;
use crate::meals::repo_types::IngredientRow;

/// Oldest ingredient with exactly this name (case-sensitive).
pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> AppResult<Option<IngredientRow>> {
    let row = sqlx::query_as::<_, IngredientRow>(
        r#"
        SELECT ingredient_id, name, quantity, unit
          FROM ingredients
         WHERE name = $1
         ORDER BY ingredient_id ASC
         LIMIT 1
        "#,
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn insert_ingredient(
    conn: &mut SqliteConnection,
    name: &str,
    quantity: Option<f64>,
    unit: Option<&str>,
) -> AppResult<IngredientRow> {
    let row = sqlx::query_as::<_, IngredientRow>(
        r#"
        INSERT INTO ingredients (name, quantity, unit)
        VALUES ($1, $2, $3)
        RETURNING ingredient_id, name, quantity, unit
        "#,
    )
    .bind(name)
    .bind(quantity)
    .bind(unit)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}

pub async fn list_all(conn: &mut SqliteConnection) -> AppResult<Vec<IngredientRow>> {
    let rows = sqlx::query_as::<_, IngredientRow>(
        r#"
        SELECT ingredient_id, name, quantity, unit
          FROM ingredients
         ORDER BY name ASC, ingredient_id ASC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

#[cfg(test)]
pub async fn count_named(conn: &mut SqliteConnection, name: &str) -> AppResult<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ingredients WHERE name = $1")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(n)
}

#[cfg(test)]
pub async fn count_all(conn: &mut SqliteConnection) -> AppResult<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ingredients")
        .fetch_one(&mut *conn)
        .await?;
    Ok(n)
}
