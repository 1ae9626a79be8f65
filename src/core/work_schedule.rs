//! Recurring work-hours window for a user.
//!
//! Persisted as a JSON object with exactly four keys (`work_hours_enabled`,
//! `work_start_hour`, `work_end_hour`, `work_days`). Unknown keys in stored
//! data are dropped on decode and therefore never written back.

use crate::errors::{Error, Result, ValidationErrors};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Default start of the work day.
pub const DEFAULT_START_HOUR: f64 = 9.0;
/// Default end of the work day.
pub const DEFAULT_END_HOUR: f64 = 17.0;
/// Monday through Friday, with 0 = Sunday.
pub const DEFAULT_WORK_DAYS: [i64; 5] = [1, 2, 3, 4, 5];

/// A user's optional work-hours window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkSchedule {
    /// Whether the window is shown at all
    #[serde(rename = "work_hours_enabled")]
    pub enabled: bool,
    /// Start of the window in fractional hours
    #[serde(rename = "work_start_hour")]
    pub start_hour: f64,
    /// End of the window in fractional hours
    #[serde(rename = "work_end_hour")]
    pub end_hour: f64,
    /// Weekday indices, 0 = Sunday through 6 = Saturday
    pub work_days: Vec<i64>,
}

impl Default for WorkSchedule {
    fn default() -> Self {
        Self {
            enabled: false,
            start_hour: DEFAULT_START_HOUR,
            end_hour: DEFAULT_END_HOUR,
            work_days: DEFAULT_WORK_DAYS.to_vec(),
        }
    }
}

/// Portion of a timeline band covered by the work window, in hours from the band start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorkOverlay {
    /// Hours between the band start and the start of the overlay
    pub offset: f64,
    /// Length of the overlay in hours
    pub length: f64,
}

impl WorkSchedule {
    /// Decodes a stored schedule. `None` or blank text yields the defaults.
    pub fn from_json(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("" | "null") => Ok(Self::default()),
            Some(text) => serde_json::from_str(text).map_err(Error::from),
        }
    }

    /// Encodes the schedule with only its canonical keys.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }

    /// Replaces the work days, dropping duplicates and keeping them sorted.
    pub fn set_work_days(&mut self, days: impl IntoIterator<Item = i64>) {
        let mut days: Vec<i64> = days.into_iter().collect();
        days.sort_unstable();
        days.dedup();
        self.work_days = days;
    }

    /// True when the schedule is enabled and `date` falls on a configured weekday.
    #[must_use]
    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        let weekday = i64::from(date.weekday().num_days_from_sunday());
        self.enabled && self.work_days.contains(&weekday)
    }

    /// True when `hour` lies inside `[start_hour, end_hour)`.
    #[must_use]
    pub fn covers_hour(&self, hour: f64) -> bool {
        hour >= self.start_hour && hour < self.end_hour
    }

    /// Computes the part of the `[band_start, band_end)` band that falls inside
    /// the work window on `date`. `None` when the schedule is disabled, `date`
    /// is not a work day, or the window misses the band entirely.
    #[must_use]
    pub fn overlay_for(&self, date: NaiveDate, band_start: f64, band_end: f64) -> Option<WorkOverlay> {
        if !self.is_work_day(date) {
            return None;
        }

        let start = self.start_hour.max(band_start);
        let end = self.end_hour.min(band_end);
        (end > start).then(|| WorkOverlay {
            offset: start - band_start,
            length: end - start,
        })
    }

    /// Human-readable rule violations; only checked while enabled.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        let mut errs = Vec::new();
        if !self.enabled {
            return errs;
        }

        if !(0.0..=24.0).contains(&self.start_hour) {
            errs.push("Work start hour must be between 0 and 24".to_string());
        }
        if !(0.0..=24.0).contains(&self.end_hour) {
            errs.push("Work end hour must be between 0 and 24".to_string());
        }
        if self.start_hour >= self.end_hour {
            errs.push("Work end hour must be after start hour".to_string());
        }
        if self.work_days.iter().any(|d| !(0..=6).contains(d)) {
            errs.push("Work days must be valid day numbers (0-6)".to_string());
        }

        errs
    }

    /// True when [`WorkSchedule::errors`] is empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Fails with a `Validation` error listing every violated rule.
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();
        for message in self.errors() {
            errors.add("base", message);
        }
        errors.into_result()
    }
}
