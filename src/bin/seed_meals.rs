//! Loads the sample meals in `seeds/sample_meals.json` through the meal
//! service, so seeding follows the same ingredient dedup and validation as
//! the API.

use anyhow::Context;
use meal_tracker::{
    meals::{dto::MealInput, services},
    state::AppState,
};

const SAMPLE_MEALS: &str = include_str!("../../seeds/sample_meals.json");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "meal_tracker=info".to_string()),
        )
        .init();

    let meals: Vec<MealInput> =
        serde_json::from_str(SAMPLE_MEALS).context("parse seeds/sample_meals.json")?;
    let state = AppState::init().await?;

    for input in meals {
        let name = input.name.clone();
        let meal = services::create(&state, input)
            .await
            .with_context(|| format!("seed meal {name}"))?;
        tracing::info!(meal_id = meal.meal_id, name = %meal.name, "seeded");
    }

    state.db.close().await;
    Ok(())
}
