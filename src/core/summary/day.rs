//! Single-day period and the timeline view of one day.
//!
//! The timeline runs from 6am to midnight and is split into three fixed
//! sections. Only active habits appear on it, optionally narrowed to one tag.

use super::{ChartBucket, ChartData, HabitHours, Period, doughnut_chart, habit_breakdown, round1};
use crate::{
    core::{
        habit::active_habits_for_user,
        streak::{self, Streaks},
        time_block::time_blocks_for_date,
        user::{get_user, work_schedule_for},
        work_schedule::{WorkOverlay, WorkSchedule},
    },
    entities::{habit, time_block},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::ConnectionTrait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// First hour shown on the timeline.
pub const TIMELINE_START_HOUR: u32 = 6;
/// Hour the timeline ends at.
pub const TIMELINE_END_HOUR: u32 = 24;

const DEFAULT_BACKGROUND: &str = "bg-white";

/// A single calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Day {
    date: NaiveDate,
}

impl Day {
    /// The day's date.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Period for Day {
    fn containing(date: NaiveDate) -> Self {
        Self { date }
    }

    fn start(&self) -> NaiveDate {
        self.date
    }

    fn end(&self) -> NaiveDate {
        self.date
    }

    fn previous_date(&self) -> NaiveDate {
        self.date.pred_opt().unwrap_or(self.date)
    }

    fn next_date(&self) -> NaiveDate {
        self.date.succ_opt().unwrap_or(self.date)
    }

    fn label(&self) -> String {
        self.date.format("%A, %B %-d, %Y").to_string()
    }

    fn chart_title(&self) -> &'static str {
        "Hours Today"
    }

    fn chart_buckets(&self, hours_by_day: &BTreeMap<NaiveDate, f64>) -> Vec<ChartBucket> {
        let hours = hours_by_day.get(&self.date).copied().unwrap_or(0.0);
        vec![ChartBucket::new(self.date.format("%a").to_string(), hours)]
    }
}

/// Fixed bands of the day timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeSection {
    /// 6am to noon
    Morning,
    /// Noon to 6pm
    Afternoon,
    /// 6pm to midnight
    Evening,
}

impl TimeSection {
    /// All sections in timeline order.
    pub const ALL: [Self; 3] = [Self::Morning, Self::Afternoon, Self::Evening];

    /// First hour of the section.
    #[must_use]
    pub const fn start_hour(self) -> u32 {
        match self {
            Self::Morning => 6,
            Self::Afternoon => 12,
            Self::Evening => 18,
        }
    }

    /// Hour the section ends at (exclusive).
    #[must_use]
    pub const fn end_hour(self) -> u32 {
        self.start_hour() + 6
    }

    /// Heading shown above the section.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Morning => "Your Morning",
            Self::Afternoon => "Your Afternoon",
            Self::Evening => "Your Evening",
        }
    }

    /// CSS background class.
    #[must_use]
    pub const fn background(self) -> &'static str {
        match self {
            Self::Morning => "bg-morning",
            Self::Afternoon => "bg-afternoon",
            Self::Evening => "bg-evening",
        }
    }

    /// The section that begins exactly at `hour`.
    #[must_use]
    pub fn starting_at(hour: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.start_hour() == hour)
    }

    /// The section whose band contains `hour`.
    #[must_use]
    pub fn containing(hour: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.start_hour() <= hour && hour < s.end_hour())
    }
}

/// The timeline view of one day for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    day: Day,
    today: NaiveDate,
    tag_filter: Option<String>,
    habits: Vec<habit::Model>,
    time_blocks: Vec<(time_block::Model, habit::Model)>,
    total_hours: f64,
    activity_breakdown: Vec<HabitHours>,
    work_schedule: WorkSchedule,
    streaks: Streaks,
}

impl DaySummary {
    /// Builds the view from the day's visible habits and the user's blocks.
    /// Blocks on other dates or for habits not in `habits` are dropped.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        date: NaiveDate,
        today: NaiveDate,
        habits: Vec<habit::Model>,
        blocks: Vec<time_block::Model>,
        work_schedule: WorkSchedule,
        tag_filter: Option<String>,
        streaks: Streaks,
    ) -> Self {
        let visible: HashMap<i64, &habit::Model> = habits.iter().map(|h| (h.id, h)).collect();

        let mut time_blocks: Vec<(time_block::Model, habit::Model)> = blocks
            .into_iter()
            .filter(|b| b.logged_on == date)
            .filter_map(|b| visible.get(&b.habit_id).map(|h| (b, (*h).clone())))
            .collect();
        time_blocks.sort_by(|(a, _), (b, _)| a.start_hour.total_cmp(&b.start_hour));

        let total_hours = round1(time_blocks.iter().map(|(b, _)| b.duration_hours()).sum());
        let activity_breakdown = habit_breakdown(time_blocks.iter().map(|(b, h)| (b, h)));

        Self {
            day: Day::containing(date),
            today,
            tag_filter: tag_filter.filter(|t| !t.trim().is_empty()),
            habits,
            time_blocks,
            total_hours,
            activity_breakdown,
            work_schedule,
            streaks,
        }
    }

    /// The summarised day.
    pub const fn day(&self) -> Day {
        self.day
    }

    /// The day's date.
    pub const fn date(&self) -> NaiveDate {
        self.day.date
    }

    /// Tag the view is narrowed to, if any.
    pub fn tag_filter(&self) -> Option<&str> {
        self.tag_filter.as_deref()
    }

    /// Active habits shown on the timeline, oldest first.
    pub fn habits(&self) -> &[habit::Model] {
        &self.habits
    }

    /// The day's blocks with their habits, earliest start first.
    pub fn time_blocks(&self) -> &[(time_block::Model, habit::Model)] {
        &self.time_blocks
    }

    /// Total logged hours, rounded to one decimal.
    pub const fn total_hours(&self) -> f64 {
        self.total_hours
    }

    /// Hours per habit, most first.
    pub fn activity_breakdown(&self) -> &[HabitHours] {
        &self.activity_breakdown
    }

    /// Doughnut chart of the breakdown.
    pub fn doughnut_chart_data(&self) -> ChartData {
        doughnut_chart(&self.activity_breakdown)
    }

    /// Hours spanned by the timeline.
    pub const fn total_day_hours(&self) -> u32 {
        TIMELINE_END_HOUR - TIMELINE_START_HOUR
    }

    /// True when nothing visible was logged.
    pub fn is_empty(&self) -> bool {
        self.time_blocks.is_empty()
    }

    /// Blocks that start within `hour` (e.g. 9.0 and 9.5 for hour 9).
    pub fn time_blocks_for_hour(&self, hour: u32) -> Vec<&time_block::Model> {
        self.time_blocks
            .iter()
            .map(|(b, _)| b)
            .filter(|b| {
                // Cast safety: start hours are validated to [0, 23.5].
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let whole = b.start_hour.trunc() as u32;
                whole == hour
            })
            .collect()
    }

    /// The section beginning at `hour`, used to place section headings.
    pub fn section_for_hour(&self, hour: u32) -> Option<TimeSection> {
        TimeSection::starting_at(hour)
    }

    /// Background class for the row at `hour`.
    pub fn section_background_for_hour(&self, hour: u32) -> &'static str {
        TimeSection::ALL
            .into_iter()
            .filter(|s| s.start_hour() <= hour)
            .last()
            .map_or(DEFAULT_BACKGROUND, TimeSection::background)
    }

    /// Whether the work band is drawn on this day.
    pub fn work_hours_visible(&self) -> bool {
        self.work_schedule.is_work_day(self.date())
    }

    /// Whether `hour` falls inside the drawn work band.
    pub fn is_work_hour(&self, hour: f64) -> bool {
        self.work_hours_visible() && self.work_schedule.covers_hour(hour)
    }

    /// Part of `section` covered by the work band, in hours from the section start.
    pub fn work_overlay(&self, section: TimeSection) -> Option<WorkOverlay> {
        self.work_schedule.overlay_for(
            self.date(),
            f64::from(section.start_hour()),
            f64::from(section.end_hour()),
        )
    }

    /// Current and longest streaks for the user.
    pub const fn streaks(&self) -> Streaks {
        self.streaks
    }

    /// Reference date of the previous day.
    pub fn previous_period_date(&self) -> NaiveDate {
        self.day.previous_date()
    }

    /// Reference date of the next day.
    pub fn next_period_date(&self) -> NaiveDate {
        self.day.next_date()
    }

    /// False when the view already shows today.
    pub fn can_navigate_next(&self) -> bool {
        self.day.can_navigate_next(self.today)
    }
}

/// Loads the timeline view of `date` (or `today`) for a user.
pub async fn load_day_summary<C>(
    db: &C,
    user_id: i64,
    date: Option<NaiveDate>,
    today: NaiveDate,
    tag_filter: Option<&str>,
) -> Result<DaySummary>
where
    C: ConnectionTrait,
{
    let date = date.unwrap_or(today);
    let user = get_user(db, user_id).await?;
    let work_schedule = work_schedule_for(&user);
    let habits = active_habits_for_user(db, user_id, tag_filter).await?;
    let blocks = time_blocks_for_date(db, user_id, date).await?;
    let streaks = streak::streaks_for_user(db, user_id, today).await?;

    let summary = DaySummary::build(
        date,
        today,
        habits,
        blocks,
        work_schedule,
        tag_filter.map(str::to_string),
        streaks,
    );
    debug!(user_id, %date, blocks = summary.time_blocks().len(), "Built day summary");
    Ok(summary)
}
