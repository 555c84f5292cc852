//! Personal meal tracker: recipes with their ingredients, steps and cooking
//! log, exposed as a JSON API over SQLite.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod ingredients;
pub mod meals;
pub mod state;
pub mod stats;
pub mod storage;
