//! Logging streaks.
//!
//! A streak counts consecutive calendar days with at least one time block.
//! Streaks are always computed over the user's trailing year of history, no
//! matter which period is on screen, so every summary shares these functions.

use crate::{
    entities::{Habit, TimeBlock, habit, time_block},
    errors::Result,
};
use chrono::{Days, NaiveDate};
use sea_orm::{QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

/// How far back logged dates are considered.
pub const STREAK_WINDOW_DAYS: u64 = 365;

/// Upper bound on the current streak walk.
pub const MAX_CURRENT_STREAK: u32 = 366;

/// Current and longest streak for a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Streaks {
    /// Run of consecutive days ending today, or yesterday when today is not logged yet
    pub current: u32,
    /// Longest run of consecutive days in the window
    pub longest: u32,
}

impl Streaks {
    /// Computes both streaks from a set of logged dates.
    #[must_use]
    pub fn from_dates(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> Self {
        Self {
            current: current_streak(dates, today),
            longest: longest_streak(dates),
        }
    }
}

/// Counts consecutive logged days walking back from today (or yesterday when
/// today has nothing yet), stopping after [`MAX_CURRENT_STREAK`] days.
#[must_use]
pub fn current_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let start = if dates.contains(&today) {
        Some(today)
    } else {
        today.pred_opt()
    };

    let mut streak = 0;
    let mut cursor = start;
    while let Some(day) = cursor.filter(|d| dates.contains(d)) {
        streak += 1;
        if streak >= MAX_CURRENT_STREAK {
            break;
        }
        cursor = day.pred_opt();
    }
    streak
}

/// Length of the longest run of consecutive days. A lone date is a run of one.
#[must_use]
pub fn longest_streak(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &date in dates {
        run = match previous {
            Some(prev) if prev.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }

    longest
}

/// Distinct dates in the trailing window on which `user_id` logged any block.
pub async fn logged_dates<C>(db: &C, user_id: i64, today: NaiveDate) -> Result<BTreeSet<NaiveDate>>
where
    C: ConnectionTrait,
{
    let window_start = today
        .checked_sub_days(Days::new(STREAK_WINDOW_DAYS))
        .unwrap_or(NaiveDate::MIN);

    let dates: Vec<NaiveDate> = TimeBlock::find()
        .select_only()
        .column(time_block::Column::LoggedOn)
        .distinct()
        .inner_join(Habit)
        .filter(habit::Column::UserId.eq(user_id))
        .filter(time_block::Column::LoggedOn.between(window_start, today))
        .into_tuple()
        .all(db)
        .await?;

    debug!(user_id, count = dates.len(), "Loaded logged dates for streaks");
    Ok(dates.into_iter().collect())
}

/// Loads the user's logged dates and computes their streaks.
pub async fn streaks_for_user<C>(db: &C, user_id: i64, today: NaiveDate) -> Result<Streaks>
where
    C: ConnectionTrait,
{
    let dates = logged_dates(db, user_id, today).await?;
    Ok(Streaks::from_dates(&dates, today))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn set(dates: &[NaiveDate]) -> BTreeSet<NaiveDate> {
        dates.iter().copied().collect()
    }

    #[test]
    fn test_current_streak_counts_through_today() {
        let dates = set(&[date(2025, 1, 13), date(2025, 1, 14), date(2025, 1, 15)]);
        assert_eq!(current_streak(&dates, date(2025, 1, 15)), 3);
    }

    #[test]
    fn test_current_streak_starts_yesterday_when_today_empty() {
        let dates = set(&[date(2025, 1, 13), date(2025, 1, 14)]);
        assert_eq!(current_streak(&dates, date(2025, 1, 15)), 2);
    }

    #[test]
    fn test_current_streak_zero_when_gap_before_yesterday() {
        let dates = set(&[date(2025, 1, 12), date(2025, 1, 13)]);
        assert_eq!(current_streak(&dates, date(2025, 1, 15)), 0);
    }

    #[test]
    fn test_current_streak_empty() {
        assert_eq!(current_streak(&BTreeSet::new(), date(2025, 1, 15)), 0);
    }

    #[test]
    fn test_current_streak_is_capped() {
        let today = date(2025, 6, 1);
        let dates: BTreeSet<NaiveDate> = (0..500)
            .map(|i| today.checked_sub_days(Days::new(i)).unwrap())
            .collect();
        assert_eq!(current_streak(&dates, today), MAX_CURRENT_STREAK);
    }

    #[test]
    fn test_longest_streak_finds_best_run() {
        let dates = set(&[
            date(2025, 1, 1),
            date(2025, 1, 2),
            date(2025, 1, 5),
            date(2025, 1, 6),
            date(2025, 1, 7),
            date(2025, 1, 9),
        ]);
        assert_eq!(longest_streak(&dates), 3);
    }

    #[test]
    fn test_longest_streak_across_month_boundary() {
        let dates = set(&[date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]);
        assert_eq!(longest_streak(&dates), 3);
    }

    #[test]
    fn test_longest_streak_single_and_empty() {
        assert_eq!(longest_streak(&set(&[date(2025, 1, 1)])), 1);
        assert_eq!(longest_streak(&BTreeSet::new()), 0);
    }

    proptest! {
        #[test]
        fn prop_current_never_exceeds_longest_plus_cap(offsets in proptest::collection::btree_set(0u64..400, 0..120)) {
            let today = date(2025, 6, 1);
            let dates: BTreeSet<NaiveDate> = offsets
                .iter()
                .map(|o| today.checked_sub_days(Days::new(*o)).unwrap())
                .collect();
            let streaks = Streaks::from_dates(&dates, today);
            prop_assert!(streaks.current <= MAX_CURRENT_STREAK);
            prop_assert!(streaks.current <= streaks.longest);
            prop_assert!(streaks.longest as usize <= dates.len());
        }
    }

    #[tokio::test]
    async fn test_streaks_for_user_ignores_other_users_and_old_dates() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "streak@example.com").await?;
        let other = create_test_user(&db, "other@example.com").await?;
        let habit = create_test_habit(&db, user.id, "Reading").await?;
        let other_habit = create_test_habit(&db, other.id, "Running").await?;

        let today = date(2025, 1, 15);
        create_test_block(&db, habit.id, date(2025, 1, 14), 9.0, 10.0).await?;
        create_test_block(&db, habit.id, date(2025, 1, 15), 9.0, 10.0).await?;
        create_test_block(&db, habit.id, date(2025, 1, 15), 14.0, 15.0).await?;
        create_test_block(&db, habit.id, date(2023, 1, 1), 9.0, 10.0).await?;
        create_test_block(&db, other_habit.id, date(2025, 1, 13), 9.0, 10.0).await?;

        let dates = logged_dates(&db, user.id, today).await?;
        assert_eq!(dates, set(&[date(2025, 1, 14), date(2025, 1, 15)]));

        let streaks = streaks_for_user(&db, user.id, today).await?;
        assert_eq!(streaks, Streaks { current: 2, longest: 2 });

        Ok(())
    }
}
