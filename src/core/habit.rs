//! Habit business logic - Creating, looking up, updating and removing habits.
//!
//! Every lookup is scoped to the owning user; a habit id that belongs to
//! someone else is reported as not found. New habits get the lowest palette
//! color the user is not already using.

use crate::{
    entities::{Habit, Tag, Tagging, TimeBlock, habit, tag, tagging, time_block},
    errors::{Error, Result, ValidationErrors},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{JoinType, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use tracing::{debug, info};

/// Palette tokens available to habits.
pub const COLOR_TOKENS: std::ops::RangeInclusive<i32> = 1..=8;

/// Fields for a new habit.
#[derive(Debug, Clone, Default)]
pub struct NewHabit {
    /// Display name; required
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Explicit palette token; the lowest unused one is picked when `None`
    pub color_token: Option<i32>,
}

impl NewHabit {
    /// A habit with just a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update for a habit; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct HabitUpdate {
    /// New name
    pub name: Option<String>,
    /// New description (`Some(None)` clears it)
    pub description: Option<Option<String>>,
    /// New palette token
    pub color_token: Option<i32>,
    /// New active flag
    pub active: Option<bool>,
}

/// CSS variable for a palette token, shared by habit chips and charts.
#[must_use]
pub fn color_css_var(color_token: i32) -> String {
    format!("var(--habit-color-{color_token})")
}

/// Picks the smallest palette token not in `used`, wrapping to the full
/// palette once every token is taken.
#[must_use]
pub fn next_unused_color_token(used: &[i32]) -> i32 {
    COLOR_TOKENS
        .clone()
        .find(|token| !used.contains(token))
        .unwrap_or(*COLOR_TOKENS.start())
}

fn validate_habit(name: &str, color_token: i32) -> Result<()> {
    let mut errors = ValidationErrors::new();
    if name.trim().is_empty() {
        errors.add("name", "can't be blank");
    }
    if !COLOR_TOKENS.contains(&color_token) {
        errors.add("color_token", "is not included in the list");
    }
    errors.into_result()
}

/// Looks up a habit owned by `user_id`.
pub async fn get_habit<C>(db: &C, user_id: i64, habit_id: i64) -> Result<habit::Model>
where
    C: ConnectionTrait,
{
    Habit::find_by_id(habit_id)
        .filter(habit::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Habit", habit_id))
}

/// All of a user's habits, oldest first.
pub async fn habits_for_user<C>(db: &C, user_id: i64) -> Result<Vec<habit::Model>>
where
    C: ConnectionTrait,
{
    Habit::find()
        .filter(habit::Column::UserId.eq(user_id))
        .order_by_asc(habit::Column::CreatedAt)
        .order_by_asc(habit::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active habits for a user, oldest first, optionally restricted to one tag.
pub async fn active_habits_for_user<C>(
    db: &C,
    user_id: i64,
    tag_filter: Option<&str>,
) -> Result<Vec<habit::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Habit::find()
        .filter(habit::Column::UserId.eq(user_id))
        .filter(habit::Column::Active.eq(true));

    if let Some(tag_name) = tag_filter.map(crate::core::tag::normalize_tag_name) {
        if !tag_name.is_empty() {
            query = query
                .join(JoinType::InnerJoin, habit::Relation::Taggings.def())
                .join(JoinType::InnerJoin, tagging::Relation::Tag.def())
                .filter(tag::Column::Name.eq(tag_name))
                .distinct();
        }
    }

    query
        .order_by_asc(habit::Column::CreatedAt)
        .order_by_asc(habit::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a habit for `user_id`, assigning the next free palette token when none is given.
pub async fn create_habit<C>(db: &C, user_id: i64, new_habit: NewHabit) -> Result<habit::Model>
where
    C: ConnectionTrait,
{
    let color_token = match new_habit.color_token {
        Some(token) => token,
        None => {
            let used: Vec<i32> = Habit::find()
                .select_only()
                .column(habit::Column::ColorToken)
                .filter(habit::Column::UserId.eq(user_id))
                .into_tuple()
                .all(db)
                .await?;
            next_unused_color_token(&used)
        }
    };

    validate_habit(&new_habit.name, color_token)?;

    let model = habit::ActiveModel {
        user_id: Set(user_id),
        name: Set(new_habit.name.trim().to_string()),
        description: Set(new_habit.description),
        color_token: Set(color_token),
        active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let habit = model.insert(db).await?;
    info!(user_id, habit_id = habit.id, color_token, "Created habit");
    Ok(habit)
}

/// Returns the user's habit with this exact name, creating it when missing.
pub async fn find_or_create_habit_by_name<C>(
    db: &C,
    user_id: i64,
    name: &str,
) -> Result<habit::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    let existing = Habit::find()
        .filter(habit::Column::UserId.eq(user_id))
        .filter(habit::Column::Name.eq(name))
        .one(db)
        .await?;

    match existing {
        Some(habit) => Ok(habit),
        None => create_habit(db, user_id, NewHabit::named(name)).await,
    }
}

/// Applies a partial update to a habit owned by `user_id`.
pub async fn update_habit<C>(
    db: &C,
    user_id: i64,
    habit_id: i64,
    update: HabitUpdate,
) -> Result<habit::Model>
where
    C: ConnectionTrait,
{
    let existing = get_habit(db, user_id, habit_id).await?;

    let name = update.name.unwrap_or_else(|| existing.name.clone());
    let color_token = update.color_token.unwrap_or(existing.color_token);
    validate_habit(&name, color_token)?;

    let mut active_model: habit::ActiveModel = existing.into();
    active_model.name = Set(name.trim().to_string());
    active_model.color_token = Set(color_token);
    if let Some(description) = update.description {
        active_model.description = Set(description);
    }
    if let Some(active) = update.active {
        active_model.active = Set(active);
    }

    active_model.update(db).await.map_err(Into::into)
}

/// Deletes a habit with its time blocks and taggings, keeping tag counters in step.
pub async fn delete_habit(db: &DatabaseConnection, user_id: i64, habit_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let habit = get_habit(&txn, user_id, habit_id).await?;

    let removed_blocks = TimeBlock::delete_many()
        .filter(time_block::Column::HabitId.eq(habit.id))
        .exec(&txn)
        .await?
        .rows_affected;

    let tag_ids: Vec<i64> = Tagging::find()
        .select_only()
        .column(tagging::Column::TagId)
        .filter(tagging::Column::HabitId.eq(habit.id))
        .into_tuple()
        .all(&txn)
        .await?;

    Tagging::delete_many()
        .filter(tagging::Column::HabitId.eq(habit.id))
        .exec(&txn)
        .await?;

    for tag_id in tag_ids {
        crate::core::tag::adjust_taggings_count(&txn, tag_id, -1).await?;
    }

    Habit::delete_by_id(habit.id).exec(&txn).await?;
    txn.commit().await?;

    info!(user_id, habit_id, removed_blocks, "Deleted habit");
    Ok(())
}

/// Total hours logged against a habit on one date.
pub async fn habit_hours_on<C>(db: &C, habit_id: i64, date: NaiveDate) -> Result<f64>
where
    C: ConnectionTrait,
{
    let blocks = TimeBlock::find()
        .filter(time_block::Column::HabitId.eq(habit_id))
        .filter(time_block::Column::LoggedOn.eq(date))
        .all(db)
        .await?;

    let hours = blocks.iter().map(time_block::Model::duration_hours).sum();
    debug!(habit_id, %date, hours, "Summed habit hours");
    Ok(hours)
}

/// Tags currently applied to a habit, alphabetically.
pub async fn tags_for_habit<C>(db: &C, habit_id: i64) -> Result<Vec<tag::Model>>
where
    C: ConnectionTrait,
{
    Tag::find()
        .join(JoinType::InnerJoin, tag::Relation::Taggings.def())
        .filter(tagging::Column::HabitId.eq(habit_id))
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}
