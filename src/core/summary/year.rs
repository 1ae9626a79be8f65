use super::{ChartBucket, Period, month_key};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::BTreeMap;

/// Calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Year {
    first: NaiveDate,
}

impl Year {
    /// The calendar year number.
    #[must_use]
    pub fn number(&self) -> i32 {
        self.first.year()
    }

    /// First day of each month in the year.
    #[must_use]
    pub fn months(&self) -> Vec<NaiveDate> {
        (0..12)
            .filter_map(|m| self.first.checked_add_months(Months::new(m)))
            .collect()
    }
}

impl Period for Year {
    fn containing(date: NaiveDate) -> Self {
        Self {
            first: NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    fn start(&self) -> NaiveDate {
        self.first
    }

    fn end(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.first.year(), 12, 31).unwrap_or(self.first)
    }

    fn previous_date(&self) -> NaiveDate {
        self.first.checked_sub_months(Months::new(12)).unwrap_or(self.first)
    }

    fn next_date(&self) -> NaiveDate {
        self.first.checked_add_months(Months::new(12)).unwrap_or(self.first)
    }

    fn label(&self) -> String {
        self.first.year().to_string()
    }

    fn chart_title(&self) -> &'static str {
        "Hours per Month"
    }

    fn chart_buckets(&self, hours_by_day: &BTreeMap<NaiveDate, f64>) -> Vec<ChartBucket> {
        let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
        for (date, hours) in hours_by_day.range(self.start()..=self.end()) {
            *by_month.entry(month_key(*date)).or_insert(0.0) += hours;
        }

        self.months()
            .into_iter()
            .map(|first| {
                let hours = by_month.get(&month_key(first)).copied().unwrap_or(0.0);
                ChartBucket::new(first.format("%b").to_string(), hours)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::super::fixtures::*;
    use super::super::{PeriodSummary, Streaks};
    use super::*;

    #[test]
    fn test_year_bounds_and_navigation() {
        let year = Year::containing(date(2024, 7, 4));
        assert_eq!(year.start(), date(2024, 1, 1));
        assert_eq!(year.end(), date(2024, 12, 31));
        assert_eq!(year.number(), 2024);
        assert_eq!(year.label(), "2024");
        assert_eq!(year.previous_date(), date(2023, 1, 1));
        assert_eq!(year.next_date(), date(2025, 1, 1));
        assert!(year.can_navigate_next(date(2025, 3, 1)));
        assert!(!year.can_navigate_next(date(2024, 12, 31)));
        assert_eq!(year.days().len(), 366);
    }

    #[test]
    fn test_year_buckets_by_month() {
        let reading = habit(1, "Reading", 1, true);
        let blocks = vec![
            block(1, &reading, date(2025, 1, 3), 9.0, 10.0),
            block(2, &reading, date(2025, 1, 20), 9.0, 10.5),
            block(3, &reading, date(2025, 12, 31), 22.0, 24.0),
            block(4, &reading, date(2026, 1, 1), 0.0, 1.0),
        ];
        let summary = PeriodSummary::build(
            Year::containing(date(2025, 6, 1)),
            date(2025, 6, 1),
            &blocks,
            Streaks::default(),
        );

        let buckets = summary.chart_buckets();
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].label, "Jan");
        assert_eq!(buckets[0].hours, 2.5);
        assert_eq!(buckets[5].hours, 0.0);
        assert_eq!(buckets[11].label, "Dec");
        assert_eq!(buckets[11].hours, 2.0);

        let months = summary.hours_by_month();
        assert_eq!(months.get("2025-01"), Some(&2.5));
        assert_eq!(months.get("2025-12"), Some(&2.0));
        assert!(!months.contains_key("2026-01"));
        assert_eq!(summary.total_hours(), 4.5);
    }
}
