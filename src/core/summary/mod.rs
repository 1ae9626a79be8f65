//! Period summaries - Aggregating time blocks over a day, week, month or year.
//!
//! Each period kind is a small `Copy` value implementing [`Period`], which
//! owns the calendar rules: how a reference date normalises to the period
//! start, where the period ends, how to step back and forth, and how the
//! per-day histogram folds into chart buckets.
//!
//! [`PeriodSummary`] is computed eagerly in one pass over a snapshot of the
//! user's blocks, so every derived figure comes from the same data and no
//! lazy caching is involved. Empty input produces zeroes, never errors.

/// Single-day period and the timeline view built on it
pub mod day;
/// Calendar month period
pub mod month;
/// Monday-to-Sunday week period
pub mod week;
/// Calendar year period
pub mod year;

pub use day::{Day, DaySummary, TimeSection};
pub use month::Month;
pub use week::Week;
pub use year::Year;

use crate::{
    core::{
        habit::{COLOR_TOKENS, color_css_var},
        streak::{self, Streaks},
        time_block::time_blocks_for_range,
    },
    entities::{habit, time_block},
    errors::Result,
};
use chrono::{Datelike, NaiveDate};
use sea_orm::ConnectionTrait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::debug;

const BORDER_COLOR: &str = "var(--ink-color)";
const BORDER_WIDTH: u32 = 2;

/// Rounds to one decimal place.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One labelled bar in a histogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBucket {
    /// Axis label
    pub label: String,
    /// Hours in the bucket, rounded to one decimal
    pub hours: f64,
}

impl ChartBucket {
    /// A bucket whose hours are rounded for display.
    #[must_use]
    pub fn new(label: impl Into<String>, hours: f64) -> Self {
        Self {
            label: label.into(),
            hours: round1(hours),
        }
    }
}

/// Calendar rules for one kind of aggregation period.
pub trait Period: Copy + Debug + PartialEq {
    /// The period that contains `date`.
    fn containing(date: NaiveDate) -> Self;

    /// First day of the period (inclusive).
    fn start(&self) -> NaiveDate;

    /// Last day of the period (inclusive).
    fn end(&self) -> NaiveDate;

    /// Reference date one period earlier.
    fn previous_date(&self) -> NaiveDate;

    /// Reference date one period later.
    fn next_date(&self) -> NaiveDate;

    /// Heading for the period, e.g. `"January 2025"`.
    fn label(&self) -> String;

    /// Title for the histogram chart.
    fn chart_title(&self) -> &'static str;

    /// Fixed-length histogram; buckets with nothing logged are `0.0`.
    fn chart_buckets(&self, hours_by_day: &BTreeMap<NaiveDate, f64>) -> Vec<ChartBucket>;

    /// The period one step earlier.
    fn previous(&self) -> Self {
        Self::containing(self.previous_date())
    }

    /// The period one step later.
    fn next(&self) -> Self {
        Self::containing(self.next_date())
    }

    /// True when `date` falls inside the period.
    fn contains(&self, date: NaiveDate) -> bool {
        self.start() <= date && date <= self.end()
    }

    /// True unless stepping forward would move past the period containing `today`.
    fn can_navigate_next(&self, today: NaiveDate) -> bool {
        Self::containing(self.next_date()).start() <= Self::containing(today).start()
    }

    /// Every day in the period, in order.
    fn days(&self) -> Vec<NaiveDate> {
        self.start()
            .iter_days()
            .take_while(|d| *d <= self.end())
            .collect()
    }
}

/// Hours spent on one habit within a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitHours {
    /// Habit identifier
    pub habit_id: i64,
    /// Habit display name
    pub name: String,
    /// Palette token of the habit
    pub color_token: i32,
    /// Hours, rounded to one decimal
    pub hours: f64,
}

/// One series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDataset {
    /// Series name, omitted for doughnut charts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Values, one per label
    pub data: Vec<f64>,
    /// Fill color per value
    pub background_color: Vec<String>,
    /// Outline color
    pub border_color: String,
    /// Outline width in pixels
    pub border_width: u32,
}

/// Chart-ready labels and series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    /// Axis or slice labels
    pub labels: Vec<String>,
    /// Data series
    pub datasets: Vec<ChartDataset>,
}

/// Fill color for the `index`th bar, cycling through the palette.
#[must_use]
pub fn bar_color(index: usize) -> String {
    let palette: Vec<i32> = COLOR_TOKENS.collect();
    color_css_var(palette[index % palette.len()])
}

/// Bar chart for a histogram, coloring bars by position.
#[must_use]
pub fn bar_chart(buckets: &[ChartBucket]) -> ChartData {
    ChartData {
        labels: buckets.iter().map(|b| b.label.clone()).collect(),
        datasets: vec![ChartDataset {
            label: Some("Hours".to_string()),
            data: buckets.iter().map(|b| b.hours).collect(),
            background_color: (0..buckets.len()).map(bar_color).collect(),
            border_color: BORDER_COLOR.to_string(),
            border_width: BORDER_WIDTH,
        }],
    }
}

/// Doughnut chart for a habit breakdown, coloring slices by each habit's token.
#[must_use]
pub fn doughnut_chart(habits: &[HabitHours]) -> ChartData {
    ChartData {
        labels: habits.iter().map(|h| h.name.clone()).collect(),
        datasets: vec![ChartDataset {
            label: None,
            data: habits.iter().map(|h| h.hours).collect(),
            background_color: habits.iter().map(|h| color_css_var(h.color_token)).collect(),
            border_color: BORDER_COLOR.to_string(),
            border_width: BORDER_WIDTH,
        }],
    }
}

/// Sums hours per habit, keeping only active habits with a non-zero rounded
/// total, most hours first. Ties keep habit id order.
#[must_use]
pub fn habit_breakdown<'a, I>(blocks: I) -> Vec<HabitHours>
where
    I: IntoIterator<Item = (&'a time_block::Model, &'a habit::Model)>,
{
    let mut totals: BTreeMap<i64, HabitHours> = BTreeMap::new();
    for (block, habit) in blocks {
        if !habit.active {
            continue;
        }
        totals
            .entry(habit.id)
            .or_insert_with(|| HabitHours {
                habit_id: habit.id,
                name: habit.name.clone(),
                color_token: habit.color_token,
                hours: 0.0,
            })
            .hours += block.duration_hours();
    }

    let mut breakdown: Vec<HabitHours> = totals
        .into_values()
        .map(|mut h| {
            h.hours = round1(h.hours);
            h
        })
        .filter(|h| h.hours > 0.0)
        .collect();
    breakdown.sort_by(|a, b| b.hours.total_cmp(&a.hours));
    breakdown
}

/// Aggregates for one period, computed once from a snapshot of blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary<P: Period> {
    period: P,
    today: NaiveDate,
    total_hours: f64,
    active_days_count: usize,
    hours_by_day: BTreeMap<NaiveDate, f64>,
    hours_by_habit: Vec<HabitHours>,
    streaks: Streaks,
}

impl<P: Period> PeriodSummary<P> {
    /// Builds the summary from `blocks`. Blocks outside the period are ignored.
    #[must_use]
    pub fn build(
        period: P,
        today: NaiveDate,
        blocks: &[(time_block::Model, habit::Model)],
        streaks: Streaks,
    ) -> Self {
        let in_period: Vec<(&time_block::Model, &habit::Model)> = blocks
            .iter()
            .filter(|(block, _)| period.contains(block.logged_on))
            .map(|(block, habit)| (block, habit))
            .collect();

        let mut hours_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut raw_total = 0.0;
        for (block, _) in &in_period {
            let hours = block.duration_hours();
            raw_total += hours;
            *hours_by_day.entry(block.logged_on).or_insert(0.0) += hours;
        }

        Self {
            period,
            today,
            total_hours: round1(raw_total),
            active_days_count: hours_by_day.len(),
            hours_by_habit: habit_breakdown(in_period.iter().copied()),
            hours_by_day,
            streaks,
        }
    }

    /// The summarised period.
    pub const fn period(&self) -> P {
        self.period
    }

    /// First day of the period.
    pub fn period_start(&self) -> NaiveDate {
        self.period.start()
    }

    /// Last day of the period.
    pub fn period_end(&self) -> NaiveDate {
        self.period.end()
    }

    /// Total logged hours, rounded to one decimal.
    pub const fn total_hours(&self) -> f64 {
        self.total_hours
    }

    /// Number of distinct days with at least one block.
    pub const fn active_days_count(&self) -> usize {
        self.active_days_count
    }

    /// Average hours per active day, rounded; `0.0` when nothing was logged.
    pub fn daily_average(&self) -> f64 {
        if self.active_days_count == 0 {
            return 0.0;
        }
        // Cast safety: at most 366 active days.
        #[allow(clippy::cast_precision_loss)]
        let days = self.active_days_count as f64;
        round1(self.total_hours / days)
    }

    /// Raw hours per logged day; days without blocks are absent.
    pub const fn hours_by_day(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.hours_by_day
    }

    /// Raw hours per `YYYY-MM` month key; months without blocks are absent.
    pub fn hours_by_month(&self) -> BTreeMap<String, f64> {
        let mut months = BTreeMap::new();
        for (date, hours) in &self.hours_by_day {
            *months.entry(month_key(*date)).or_insert(0.0) += hours;
        }
        months
    }

    /// Per-habit hours, most first, zero entries and inactive habits removed.
    pub fn hours_by_habit(&self) -> &[HabitHours] {
        &self.hours_by_habit
    }

    /// True when nothing was logged in the period.
    pub fn is_empty(&self) -> bool {
        self.total_hours == 0.0
    }

    /// Current and longest streaks over the user's whole history.
    pub const fn streaks(&self) -> Streaks {
        self.streaks
    }

    /// Fixed-length histogram for the period.
    pub fn chart_buckets(&self) -> Vec<ChartBucket> {
        self.period.chart_buckets(&self.hours_by_day)
    }

    /// Bar chart of the histogram.
    pub fn chart_data(&self) -> ChartData {
        bar_chart(&self.chart_buckets())
    }

    /// Doughnut chart of the habit breakdown.
    pub fn doughnut_chart_data(&self) -> ChartData {
        doughnut_chart(&self.hours_by_habit)
    }

    /// Reference date of the previous period.
    pub fn previous_period_date(&self) -> NaiveDate {
        self.period.previous_date()
    }

    /// Reference date of the next period.
    pub fn next_period_date(&self) -> NaiveDate {
        self.period.next_date()
    }

    /// Whether the next period is not in the future relative to today.
    pub fn can_navigate_next(&self) -> bool {
        self.period.can_navigate_next(self.today)
    }

    /// JSON-ready view of every figure in the summary.
    pub fn to_payload(&self) -> SummaryPayload {
        SummaryPayload {
            period_start: self.period_start(),
            period_end: self.period_end(),
            period_label: self.period.label(),
            chart_title: self.period.chart_title(),
            total_hours: self.total_hours,
            daily_average: self.daily_average(),
            active_days_count: self.active_days_count,
            hours_by_day: self
                .hours_by_day
                .iter()
                .map(|(date, hours)| (*date, round1(*hours)))
                .collect(),
            hours_by_month: self
                .hours_by_month()
                .into_iter()
                .map(|(key, hours)| (key, round1(hours)))
                .collect(),
            hours_by_habit: self.hours_by_habit.clone(),
            chart_data: self.chart_data(),
            doughnut_chart_data: self.doughnut_chart_data(),
            current_streak: self.streaks.current,
            longest_streak: self.streaks.longest,
            is_empty: self.is_empty(),
            previous_period_date: self.previous_period_date(),
            next_period_date: self.next_period_date(),
            can_navigate_next: self.can_navigate_next(),
        }
    }
}

/// Serialised form of a [`PeriodSummary`] for the API and views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryPayload {
    /// First day of the period
    pub period_start: NaiveDate,
    /// Last day of the period
    pub period_end: NaiveDate,
    /// Period heading
    pub period_label: String,
    /// Histogram title
    pub chart_title: &'static str,
    /// Total hours
    pub total_hours: f64,
    /// Average per active day
    pub daily_average: f64,
    /// Days with any block
    pub active_days_count: usize,
    /// Hours per logged day
    pub hours_by_day: BTreeMap<NaiveDate, f64>,
    /// Hours per `YYYY-MM`
    pub hours_by_month: BTreeMap<String, f64>,
    /// Per-habit breakdown
    pub hours_by_habit: Vec<HabitHours>,
    /// Histogram chart
    pub chart_data: ChartData,
    /// Habit doughnut chart
    pub doughnut_chart_data: ChartData,
    /// Current streak in days
    pub current_streak: u32,
    /// Longest streak in days
    pub longest_streak: u32,
    /// Whether nothing was logged
    pub is_empty: bool,
    /// Reference date for the previous period
    pub previous_period_date: NaiveDate,
    /// Reference date for the next period
    pub next_period_date: NaiveDate,
    /// Whether the next period may be shown
    pub can_navigate_next: bool,
}

/// `YYYY-MM` key for the month containing `date`.
#[must_use]
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Loads the user's blocks and streaks and builds the summary for the period
/// containing `reference` (or `today` when `None`).
pub async fn load_summary<P, C>(
    db: &C,
    user_id: i64,
    reference: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<PeriodSummary<P>>
where
    P: Period,
    C: ConnectionTrait,
{
    let period = P::containing(reference.unwrap_or(today));
    let blocks = time_blocks_for_range(db, user_id, period.start(), period.end()).await?;
    let streaks = streak::streaks_for_user(db, user_id, today).await?;

    let summary = PeriodSummary::build(period, today, &blocks, streaks);
    debug!(
        user_id,
        start = %summary.period_start(),
        end = %summary.period_end(),
        total_hours = summary.total_hours(),
        "Built period summary"
    );
    Ok(summary)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::{TimeZone, Utc};

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
    }

    pub fn habit(id: i64, name: &str, color_token: i32, active: bool) -> habit::Model {
        habit::Model {
            id,
            user_id: 1,
            name: name.to_string(),
            description: None,
            color_token,
            active,
            created_at: Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
        }
    }

    pub fn block(
        id: i64,
        habit: &habit::Model,
        logged_on: NaiveDate,
        start_hour: f64,
        end_hour: f64,
    ) -> (time_block::Model, habit::Model) {
        (
            time_block::Model {
                id,
                habit_id: habit.id,
                logged_on,
                start_hour,
                end_hour,
                notes: None,
                created_at: Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
            },
            habit.clone(),
        )
    }
}
