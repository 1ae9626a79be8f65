//! Time block business logic - Logging, editing and clearing blocks of time.
//!
//! A block is valid when it has a date, a start hour in [0, 23.5], an end hour
//! in [0.5, 24] and ends after it starts. Overlapping blocks are allowed, even
//! for the same habit. Ownership runs through the habit: a block is visible
//! to a user only when its habit belongs to that user.

use crate::{
    core::time_format,
    entities::{Habit, TimeBlock, habit, time_block},
    errors::{Error, Result, ValidationErrors},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Lowest allowed start hour.
pub const MIN_START_HOUR: f64 = 0.0;
/// Highest allowed start hour.
pub const MAX_START_HOUR: f64 = 23.5;
/// Lowest allowed end hour.
pub const MIN_END_HOUR: f64 = 0.5;
/// Highest allowed end hour.
pub const MAX_END_HOUR: f64 = 24.0;

/// Raw fields for a block, as received from a form or API call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeBlockInput {
    /// Date the time was spent on
    pub logged_on: Option<NaiveDate>,
    /// Start of the block in fractional hours
    pub start_hour: Option<f64>,
    /// End of the block in fractional hours
    pub end_hour: Option<f64>,
    /// Optional notes
    pub notes: Option<String>,
}

impl TimeBlockInput {
    /// Input for a block spanning `start_hour..end_hour` on `logged_on`.
    #[must_use]
    pub const fn new(logged_on: NaiveDate, start_hour: f64, end_hour: f64) -> Self {
        Self {
            logged_on: Some(logged_on),
            start_hour: Some(start_hour),
            end_hour: Some(end_hour),
            notes: None,
        }
    }
}

/// Partial update for a block; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TimeBlockUpdate {
    /// Move the block to another of the user's habits
    pub habit_id: Option<i64>,
    /// New date
    pub logged_on: Option<NaiveDate>,
    /// New start hour
    pub start_hour: Option<f64>,
    /// New end hour
    pub end_hour: Option<f64>,
    /// New notes (`Some(None)` clears them)
    pub notes: Option<Option<String>>,
}

/// Checks every block rule and reports all violations together.
pub fn validate_time_block(
    logged_on: Option<NaiveDate>,
    start_hour: Option<f64>,
    end_hour: Option<f64>,
) -> Result<(NaiveDate, f64, f64)> {
    let mut errors = ValidationErrors::new();

    if logged_on.is_none() {
        errors.add("logged_on", "can't be blank");
    }

    match start_hour {
        None => errors.add("start_hour", "can't be blank"),
        Some(h) if h.is_nan() => errors.add("start_hour", "is not a number"),
        Some(h) if h < MIN_START_HOUR => {
            errors.add("start_hour", "must be greater than or equal to 0");
        }
        Some(h) if h > MAX_START_HOUR => {
            errors.add("start_hour", "must be less than or equal to 23.5");
        }
        Some(_) => {}
    }

    match end_hour {
        None => errors.add("end_hour", "can't be blank"),
        Some(h) if h.is_nan() => errors.add("end_hour", "is not a number"),
        Some(h) if h < MIN_END_HOUR => {
            errors.add("end_hour", "must be greater than or equal to 0.5");
        }
        Some(h) if h > MAX_END_HOUR => {
            errors.add("end_hour", "must be less than or equal to 24");
        }
        Some(_) => {}
    }

    if let (Some(start), Some(end)) = (start_hour, end_hour) {
        if end <= start {
            errors.add("end_hour", "must be after start hour");
        }
    }

    match (logged_on, start_hour, end_hour) {
        (Some(date), Some(start), Some(end)) if errors.is_empty() => Ok((date, start, end)),
        _ => Err(Error::Validation { errors }),
    }
}

/// Block length in whole minutes, truncated.
#[must_use]
pub fn duration_minutes(block: &time_block::Model) -> i64 {
    // Cast safety: durations are at most 24h, i.e. 1440 minutes.
    #[allow(clippy::cast_possible_truncation)]
    let minutes = (block.duration_hours() * 60.0) as i64;
    minutes
}

/// Display label for a block's range, e.g. `"9am - 11:30am"`.
#[must_use]
pub fn time_range_display(block: &time_block::Model) -> String {
    time_format::time_range_display(block.start_hour, block.end_hour)
}

/// Logs a new block against one of the user's habits.
pub async fn create_time_block<C>(
    db: &C,
    user_id: i64,
    habit_id: i64,
    input: TimeBlockInput,
) -> Result<time_block::Model>
where
    C: ConnectionTrait,
{
    let (logged_on, start_hour, end_hour) =
        validate_time_block(input.logged_on, input.start_hour, input.end_hour)?;
    let habit = crate::core::habit::get_habit(db, user_id, habit_id).await?;

    let model = time_block::ActiveModel {
        habit_id: Set(habit.id),
        logged_on: Set(logged_on),
        start_hour: Set(start_hour),
        end_hour: Set(end_hour),
        notes: Set(input.notes),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let block = model.insert(db).await?;
    info!(
        user_id,
        habit_id,
        block_id = block.id,
        %logged_on,
        start_hour,
        end_hour,
        "Logged time block"
    );
    Ok(block)
}

/// Looks up a block whose habit belongs to `user_id`.
pub async fn get_time_block<C>(db: &C, user_id: i64, block_id: i64) -> Result<time_block::Model>
where
    C: ConnectionTrait,
{
    TimeBlock::find_by_id(block_id)
        .inner_join(Habit)
        .filter(habit::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("TimeBlock", block_id))
}

/// Applies a partial update, re-validating the merged block.
pub async fn update_time_block<C>(
    db: &C,
    user_id: i64,
    block_id: i64,
    update: TimeBlockUpdate,
) -> Result<time_block::Model>
where
    C: ConnectionTrait,
{
    let existing = get_time_block(db, user_id, block_id).await?;

    let (logged_on, start_hour, end_hour) = validate_time_block(
        Some(update.logged_on.unwrap_or(existing.logged_on)),
        Some(update.start_hour.unwrap_or(existing.start_hour)),
        Some(update.end_hour.unwrap_or(existing.end_hour)),
    )?;

    let habit_id = match update.habit_id {
        Some(habit_id) => crate::core::habit::get_habit(db, user_id, habit_id).await?.id,
        None => existing.habit_id,
    };

    let mut active_model: time_block::ActiveModel = existing.into();
    active_model.habit_id = Set(habit_id);
    active_model.logged_on = Set(logged_on);
    active_model.start_hour = Set(start_hour);
    active_model.end_hour = Set(end_hour);
    if let Some(notes) = update.notes {
        active_model.notes = Set(notes);
    }

    let block = active_model.update(db).await?;
    debug!(user_id, block_id, "Updated time block");
    Ok(block)
}

/// Deletes one of the user's blocks.
pub async fn delete_time_block<C>(db: &C, user_id: i64, block_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let block = get_time_block(db, user_id, block_id).await?;
    TimeBlock::delete_by_id(block.id).exec(db).await?;
    debug!(user_id, block_id, "Deleted time block");
    Ok(())
}

/// Removes every block the user logged on `date`, returning how many were removed.
pub async fn clear_day<C>(db: &C, user_id: i64, date: NaiveDate) -> Result<u64>
where
    C: ConnectionTrait,
{
    let ids: Vec<i64> = time_blocks_for_date(db, user_id, date)
        .await?
        .into_iter()
        .map(|block| block.id)
        .collect();

    if ids.is_empty() {
        return Ok(0);
    }

    let removed = TimeBlock::delete_many()
        .filter(time_block::Column::Id.is_in(ids))
        .exec(db)
        .await?
        .rows_affected;

    info!(user_id, %date, removed, "Cleared day");
    Ok(removed)
}

/// The user's blocks on one date, earliest start first.
pub async fn time_blocks_for_date<C>(
    db: &C,
    user_id: i64,
    date: NaiveDate,
) -> Result<Vec<time_block::Model>>
where
    C: ConnectionTrait,
{
    TimeBlock::find()
        .inner_join(Habit)
        .filter(habit::Column::UserId.eq(user_id))
        .filter(time_block::Column::LoggedOn.eq(date))
        .order_by_asc(time_block::Column::StartHour)
        .order_by_asc(time_block::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The user's blocks in `[start, end]` together with their habits.
pub async fn time_blocks_for_range<C>(
    db: &C,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<(time_block::Model, habit::Model)>>
where
    C: ConnectionTrait,
{
    let rows = TimeBlock::find()
        .find_also_related(Habit)
        .filter(habit::Column::UserId.eq(user_id))
        .filter(time_block::Column::LoggedOn.between(start, end))
        .order_by_asc(time_block::Column::LoggedOn)
        .order_by_asc(time_block::Column::StartHour)
        .order_by_asc(time_block::Column::Id)
        .all(db)
        .await?;

    let blocks: Vec<(time_block::Model, habit::Model)> = rows
        .into_iter()
        .filter_map(|(block, habit)| habit.map(|habit| (block, habit)))
        .collect();

    debug!(user_id, %start, %end, count = blocks.len(), "Loaded time blocks");
    Ok(blocks)
}

/// Most recent blocks for a habit, newest date and latest start first.
pub async fn recent_blocks_for_habit<C>(
    db: &C,
    user_id: i64,
    habit_id: i64,
    limit: u64,
) -> Result<Vec<time_block::Model>>
where
    C: ConnectionTrait,
{
    use sea_orm::QuerySelect;

    let habit = crate::core::habit::get_habit(db, user_id, habit_id).await?;
    TimeBlock::find()
        .filter(time_block::Column::HabitId.eq(habit.id))
        .order_by_desc(time_block::Column::LoggedOn)
        .order_by_desc(time_block::Column::StartHour)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn validation_errors(result: Result<(NaiveDate, f64, f64)>) -> ValidationErrors {
        match result {
            Err(Error::Validation { errors }) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_accepts_full_range() {
        let day = date(2025, 1, 15);
        assert!(validate_time_block(Some(day), Some(0.0), Some(0.5)).is_ok());
        assert!(validate_time_block(Some(day), Some(23.5), Some(24.0)).is_ok());
    }

    #[test]
    fn test_validate_reports_every_missing_field() {
        let errors = validation_errors(validate_time_block(None, None, None));
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.on("logged_on"), vec!["can't be blank"]);
        assert_eq!(errors.on("start_hour"), vec!["can't be blank"]);
        assert_eq!(errors.on("end_hour"), vec!["can't be blank"]);
    }

    #[test]
    fn test_validate_ranges() {
        let day = Some(date(2025, 1, 15));
        let errors = validation_errors(validate_time_block(day, Some(23.75), Some(24.5)));
        assert_eq!(errors.on("start_hour"), vec!["must be less than or equal to 23.5"]);
        assert!(errors.on("end_hour").contains(&"must be less than or equal to 24"));

        let errors = validation_errors(validate_time_block(day, Some(-1.0), Some(0.0)));
        assert_eq!(errors.on("start_hour"), vec!["must be greater than or equal to 0"]);
        assert!(errors.on("end_hour").contains(&"must be greater than or equal to 0.5"));
    }

    #[test]
    fn test_validate_end_after_start() {
        let day = Some(date(2025, 1, 15));
        let errors = validation_errors(validate_time_block(day, Some(10.0), Some(10.0)));
        assert_eq!(errors.on("end_hour"), vec!["must be after start hour"]);

        let errors = validation_errors(validate_time_block(day, Some(11.0), Some(9.0)));
        assert_eq!(errors.on("end_hour"), vec!["must be after start hour"]);
    }

    #[test]
    fn test_validate_rejects_nan() {
        let errors =
            validation_errors(validate_time_block(Some(date(2025, 1, 15)), Some(f64::NAN), Some(2.0)));
        assert_eq!(errors.on("start_hour"), vec!["is not a number"]);
    }

    proptest! {
        #[test]
        fn prop_validated_blocks_have_positive_duration(start in -2.0f64..26.0, end in -2.0f64..26.0) {
            let day = Some(date(2025, 1, 15));
            match validate_time_block(day, Some(start), Some(end)) {
                Ok((_, s, e)) => {
                    prop_assert!((MIN_START_HOUR..=MAX_START_HOUR).contains(&s));
                    prop_assert!((MIN_END_HOUR..=MAX_END_HOUR).contains(&e));
                    prop_assert!(e - s > 0.0);
                }
                Err(Error::Validation { errors }) => prop_assert!(!errors.is_empty()),
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_create_time_block_and_duration() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "log@example.com").await?;
        let habit = create_test_habit(&db, user.id, "Reading").await?;

        let mut input = TimeBlockInput::new(date(2025, 1, 15), 9.0, 11.5);
        input.notes = Some("Chapter 3".to_string());
        let block = create_time_block(&db, user.id, habit.id, input).await?;

        assert_eq!(block.duration_hours(), 2.5);
        assert_eq!(duration_minutes(&block), 150);
        assert_eq!(time_range_display(&block), "9am - 11:30am");
        assert_eq!(block.notes.as_deref(), Some("Chapter 3"));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_time_block_for_foreign_habit_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "owner@example.com").await?;
        let other = create_test_user(&db, "other@example.com").await?;
        let habit = create_test_habit(&db, owner.id, "Private").await?;

        let result = create_time_block(
            &db,
            other.id,
            habit.id,
            TimeBlockInput::new(date(2025, 1, 15), 9.0, 10.0),
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_overlapping_blocks_are_allowed() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "overlap@example.com").await?;
        let a = create_test_habit(&db, user.id, "A").await?;
        let b = create_test_habit(&db, user.id, "B").await?;

        create_test_block(&db, a.id, date(2025, 1, 15), 9.0, 11.0).await?;
        create_test_block(&db, b.id, date(2025, 1, 15), 10.0, 12.0).await?;
        create_test_block(&db, a.id, date(2025, 1, 15), 10.5, 11.5).await?;

        assert_eq!(time_blocks_for_date(&db, user.id, date(2025, 1, 15)).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_time_block_revalidates_merged_fields() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "edit@example.com").await?;
        let habit = create_test_habit(&db, user.id, "Reading").await?;
        let other_habit = create_test_habit(&db, user.id, "Writing").await?;
        let block = create_test_block(&db, habit.id, date(2025, 1, 15), 9.0, 10.0).await?;

        let result = update_time_block(
            &db,
            user.id,
            block.id,
            TimeBlockUpdate {
                start_hour: Some(12.0),
                ..TimeBlockUpdate::default()
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let updated = update_time_block(
            &db,
            user.id,
            block.id,
            TimeBlockUpdate {
                habit_id: Some(other_habit.id),
                end_hour: Some(12.5),
                notes: Some(Some("moved".to_string())),
                ..TimeBlockUpdate::default()
            },
        )
        .await?;
        assert_eq!(updated.habit_id, other_habit.id);
        assert_eq!(updated.start_hour, 9.0);
        assert_eq!(updated.end_hour, 12.5);
        assert_eq!(updated.notes.as_deref(), Some("moved"));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_time_block_scoped_to_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "owner@example.com").await?;
        let other = create_test_user(&db, "other@example.com").await?;
        let habit = create_test_habit(&db, owner.id, "Reading").await?;
        let block = create_test_block(&db, habit.id, date(2025, 1, 15), 9.0, 10.0).await?;

        assert!(matches!(
            delete_time_block(&db, other.id, block.id).await,
            Err(Error::NotFound { .. })
        ));
        delete_time_block(&db, owner.id, block.id).await?;
        assert_eq!(TimeBlock::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_clear_day_only_touches_that_user_and_date() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "clear@example.com").await?;
        let other = create_test_user(&db, "keep@example.com").await?;
        let habit = create_test_habit(&db, user.id, "Reading").await?;
        let other_habit = create_test_habit(&db, other.id, "Reading").await?;

        create_test_block(&db, habit.id, date(2025, 1, 15), 9.0, 10.0).await?;
        create_test_block(&db, habit.id, date(2025, 1, 15), 13.0, 14.0).await?;
        create_test_block(&db, habit.id, date(2025, 1, 16), 9.0, 10.0).await?;
        create_test_block(&db, other_habit.id, date(2025, 1, 15), 9.0, 10.0).await?;

        assert_eq!(clear_day(&db, user.id, date(2025, 1, 15)).await?, 2);
        assert_eq!(clear_day(&db, user.id, date(2025, 1, 15)).await?, 0);
        assert_eq!(TimeBlock::find().count(&db).await?, 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_time_blocks_for_range_is_inclusive() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "range@example.com").await?;
        let habit = create_test_habit(&db, user.id, "Reading").await?;

        create_test_block(&db, habit.id, date(2025, 1, 12), 9.0, 10.0).await?;
        create_test_block(&db, habit.id, date(2025, 1, 13), 9.0, 10.0).await?;
        create_test_block(&db, habit.id, date(2025, 1, 19), 9.0, 10.0).await?;
        create_test_block(&db, habit.id, date(2025, 1, 20), 9.0, 10.0).await?;

        let blocks = time_blocks_for_range(&db, user.id, date(2025, 1, 13), date(2025, 1, 19)).await?;
        let dates: Vec<NaiveDate> = blocks.iter().map(|(b, _)| b.logged_on).collect();
        assert_eq!(dates, vec![date(2025, 1, 13), date(2025, 1, 19)]);
        assert!(blocks.iter().all(|(_, h)| h.id == habit.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_recent_blocks_for_habit() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "recent@example.com").await?;
        let habit = create_test_habit(&db, user.id, "Reading").await?;
        create_test_block(&db, habit.id, date(2025, 1, 14), 9.0, 10.0).await?;
        create_test_block(&db, habit.id, date(2025, 1, 15), 8.0, 9.0).await?;
        create_test_block(&db, habit.id, date(2025, 1, 15), 18.0, 19.0).await?;

        let recent = recent_blocks_for_habit(&db, user.id, habit.id, 2).await?;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].start_hour, 18.0);
        assert_eq!(recent[1].start_hour, 8.0);

        Ok(())
    }
}
