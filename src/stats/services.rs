use std::collections::HashMap;

use sqlx::SqliteConnection;
use tracing::instrument;

use super::dto::{GlobalSummary, MealStats, NEVER_LOGGED};
use super::repo::{self, Category, MealStatsRow};
use crate::error::{AppError, AppResult};
use crate::meals::repo as meals_repo;
use crate::state::AppState;

const MOST_COOKED_LIMIT: i64 = 5;
const RECENT_LOG_LIMIT: i64 = 10;

impl From<MealStatsRow> for MealStats {
    fn from(r: MealStatsRow) -> Self {
        Self {
            meal_id: r.meal_id,
            first_meal_date: r.first_date.unwrap_or_else(|| NEVER_LOGGED.to_string()),
            recent_meal_date: r.last_date.unwrap_or_else(|| NEVER_LOGGED.to_string()),
            meal_count: r.meal_count,
            avg_rating: r.avg_rating.unwrap_or(0.0),
        }
    }
}

/// Stats for every id in `meal_ids`, computed with a single grouped query.
/// Ids without log entries map to [`MealStats::never_logged`]. Runs on the
/// caller's connection so meal reads and writes can include it in their
/// transaction.
pub async fn per_meal_stats(
    conn: &mut SqliteConnection,
    meal_ids: &[i64],
) -> AppResult<HashMap<i64, MealStats>> {
    let mut out: HashMap<i64, MealStats> = repo::per_meal(conn, meal_ids)
        .await?
        .into_iter()
        .map(|r| (r.meal_id, MealStats::from(r)))
        .collect();
    for id in meal_ids {
        out.entry(*id).or_insert_with(|| MealStats::never_logged(*id));
    }
    Ok(out)
}

#[instrument(skip(st))]
pub async fn stats_for(st: &AppState, meal_id: i64) -> AppResult<MealStats> {
    let mut conn = st.db.acquire().await?;
    if !meals_repo::meal_exists(&mut conn, meal_id).await? {
        return Err(AppError::meal_not_found(meal_id));
    }
    let mut all = per_meal_stats(&mut conn, &[meal_id]).await?;
    Ok(all
        .remove(&meal_id)
        .unwrap_or_else(|| MealStats::never_logged(meal_id)))
}

/// Dashboard figures, all read inside one transaction so totals, breakdowns
/// and rankings describe the same snapshot.
#[instrument(skip(st))]
pub async fn global_summary(st: &AppState) -> AppResult<GlobalSummary> {
    let mut tx = st.db.begin().await?;
    let totals = repo::totals(&mut tx).await?;
    let summary = GlobalSummary {
        total_meals: totals.total_meals,
        total_log_entries: totals.total_log_entries,
        meals_logged: totals.meals_logged,
        avg_rating: totals.avg_rating.unwrap_or(0.0),
        first_log_date: totals
            .first_log_date
            .unwrap_or_else(|| NEVER_LOGGED.to_string()),
        latest_log_date: totals
            .latest_log_date
            .unwrap_or_else(|| NEVER_LOGGED.to_string()),
        by_cuisine_type: repo::breakdown(&mut tx, Category::CuisineType).await?,
        by_cooking_mode: repo::breakdown(&mut tx, Category::CookingMode).await?,
        by_cooking_ease: repo::breakdown(&mut tx, Category::CookingEase).await?,
        most_cooked: repo::most_cooked(&mut tx, MOST_COOKED_LIMIT).await?,
        recent_logs: repo::recent_logs(&mut tx, RECENT_LOG_LIMIT).await?,
    };
    tx.commit().await?;
    Ok(summary)
}

#[cfg(test)]
mod stats_tests {
    use super::*;
    use crate::meals::dto::{CollectionUpdate, LogEntryInput, MealInput};
    use crate::meals::services as meals;
    use crate::state::AppState;

    fn log(date: &str, rating: Option<i64>) -> LogEntryInput {
        LogEntryInput {
            date: date.into(),
            rating,
            ..Default::default()
        }
    }

    fn meal(name: &str, cuisine: Option<&str>, logs: Vec<LogEntryInput>) -> MealInput {
        MealInput {
            name: name.into(),
            description: format!("{name} for tests"),
            cuisine_type: cuisine.map(Into::into),
            log_entries: CollectionUpdate::ReplaceWith(logs),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn meal_without_logs_gets_sentinels() {
        let state = AppState::fake().await.unwrap();
        let created = meals::create(&state, meal("Plain rice", None, vec![])).await.unwrap();

        let stats = stats_for(&state, created.meal_id).await.unwrap();

        assert_eq!(stats.meal_count, 0);
        assert_eq!(stats.avg_rating, 0.0);
        assert_eq!(stats.first_meal_date, NEVER_LOGGED);
        assert_eq!(stats.recent_meal_date, NEVER_LOGGED);
    }

    #[tokio::test]
    async fn null_ratings_are_excluded_from_average() {
        let state = AppState::fake().await.unwrap();
        let created = meals::create(
            &state,
            meal(
                "Curry",
                Some("Indian"),
                vec![log("2024-03-01", None), log("2024-01-01", Some(4))],
            ),
        )
        .await
        .unwrap();

        let stats = stats_for(&state, created.meal_id).await.unwrap();

        assert_eq!(stats.first_meal_date, "2024-01-01");
        assert_eq!(stats.recent_meal_date, "2024-03-01");
        assert_eq!(stats.meal_count, 2);
        assert_eq!(stats.avg_rating, 4.0);
    }

    #[tokio::test]
    async fn only_null_ratings_average_to_zero() {
        let state = AppState::fake().await.unwrap();
        let created = meals::create(&state, meal("Toast", None, vec![log("2024-05-05", None)]))
            .await
            .unwrap();

        let stats = stats_for(&state, created.meal_id).await.unwrap();
        assert_eq!(stats.meal_count, 1);
        assert_eq!(stats.avg_rating, 0.0);
    }

    #[tokio::test]
    async fn stats_for_unknown_meal_is_not_found() {
        let state = AppState::fake().await.unwrap();
        let err = stats_for(&state, 999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { id: 999, .. }));
    }

    #[tokio::test]
    async fn per_meal_stats_covers_every_requested_id() {
        let state = AppState::fake().await.unwrap();
        let a = meals::create(&state, meal("A", None, vec![log("2024-01-02", Some(5))]))
            .await
            .unwrap();
        let b = meals::create(&state, meal("B", None, vec![])).await.unwrap();

        let mut conn = state.db.acquire().await.unwrap();
        let stats = per_meal_stats(&mut conn, &[a.meal_id, b.meal_id]).await.unwrap();

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[&a.meal_id].meal_count, 1);
        assert_eq!(stats[&a.meal_id].avg_rating, 5.0);
        assert_eq!(stats[&b.meal_id], MealStats::never_logged(b.meal_id));
    }

    #[tokio::test]
    async fn empty_store_summary() {
        let state = AppState::fake().await.unwrap();
        let summary = global_summary(&state).await.unwrap();

        assert_eq!(summary.total_meals, 0);
        assert_eq!(summary.total_log_entries, 0);
        assert_eq!(summary.avg_rating, 0.0);
        assert_eq!(summary.first_log_date, NEVER_LOGGED);
        assert!(summary.most_cooked.is_empty());
        assert!(summary.recent_logs.is_empty());
    }

    #[tokio::test]
    async fn summary_releases_its_snapshot() {
        let state = AppState::fake().await.unwrap();
        meals::create(&state, meal("Oats", Some("Scottish"), vec![log("2024-02-01", Some(3))]))
            .await
            .unwrap();
        let first = global_summary(&state).await.unwrap();

        // A write after the summary commits and the next summary sees it.
        meals::create(&state, meal("Bannock", Some("Scottish"), vec![]))
            .await
            .unwrap();
        let second = global_summary(&state).await.unwrap();

        assert_eq!(first.total_meals, 1);
        assert_eq!(second.total_meals, 2);
        let scottish: i64 = second.by_cuisine_type.iter().map(|c| c.count).sum();
        assert_eq!(scottish, second.total_meals);
        assert_eq!(second.total_log_entries, first.total_log_entries);
    }

    #[tokio::test]
    async fn summary_aggregates_across_meals() {
        let state = AppState::fake().await.unwrap();
        let pasta = meals::create(
            &state,
            meal(
                "Pasta",
                Some("Italian"),
                vec![log("2024-01-10", Some(5)), log("2024-02-10", Some(3))],
            ),
        )
        .await
        .unwrap();
        let pizza = meals::create(
            &state,
            meal("Pizza", Some("Italian"), vec![log("2024-03-01", None)]),
        )
        .await
        .unwrap();
        let tacos = meals::create(
            &state,
            meal(
                "Tacos",
                Some("Mexican"),
                vec![log("2023-12-31", Some(4)), log("2024-01-15", Some(4))],
            ),
        )
        .await
        .unwrap();
        meals::create(&state, meal("Water", Some(""), vec![])).await.unwrap();

        let s = global_summary(&state).await.unwrap();

        assert_eq!(s.total_meals, 4);
        assert_eq!(s.total_log_entries, 5);
        assert_eq!(s.meals_logged, 3);
        assert_eq!(s.avg_rating, 4.0);
        assert_eq!(s.first_log_date, "2023-12-31");
        assert_eq!(s.latest_log_date, "2024-03-01");

        let cuisines: Vec<(&str, i64)> = s
            .by_cuisine_type
            .iter()
            .map(|c| (c.value.as_str(), c.count))
            .collect();
        assert_eq!(cuisines, vec![("Italian", 2), ("Mexican", 1)]);
        assert!(s.by_cooking_mode.is_empty());

        // Pasta and Tacos tie on two entries; lower id ranks first.
        let ranking: Vec<i64> = s.most_cooked.iter().map(|m| m.meal_id).collect();
        assert_eq!(ranking, vec![pasta.meal_id, tacos.meal_id, pizza.meal_id]);

        assert_eq!(s.recent_logs.len(), 5);
        assert_eq!(s.recent_logs[0].meal_name, "Pizza");
        assert_eq!(s.recent_logs[4].date, "2023-12-31");
    }
}
