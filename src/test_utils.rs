//! Shared test utilities for habit-wrap.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        habit::{self, NewHabit},
        time_block::{self, TimeBlockInput},
        user,
    },
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, EntityTrait};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test user with no reminders, no timezone and no work schedule.
pub async fn create_test_user(
    db: &DatabaseConnection,
    email_address: &str,
) -> Result<entities::user::Model> {
    user::create_user(db, email_address).await
}

/// Creates an active habit with the next free color token.
pub async fn create_test_habit(
    db: &DatabaseConnection,
    user_id: i64,
    name: &str,
) -> Result<entities::habit::Model> {
    habit::create_habit(db, user_id, NewHabit::named(name)).await
}

/// Logs a block for `habit_id` on `date`, owned by the habit's user.
pub async fn create_test_block(
    db: &DatabaseConnection,
    habit_id: i64,
    date: NaiveDate,
    start_hour: f64,
    end_hour: f64,
) -> Result<entities::time_block::Model> {
    let owner = entities::Habit::find_by_id(habit_id)
        .one(db)
        .await?
        .map_or(0, |h| h.user_id);

    time_block::create_time_block(
        db,
        owner,
        habit_id,
        TimeBlockInput::new(date, start_hour, end_hour),
    )
    .await
}
