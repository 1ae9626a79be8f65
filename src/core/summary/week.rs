use super::{ChartBucket, Period};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeMap;

/// Monday-to-Sunday week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Week {
    monday: NaiveDate,
}

impl Period for Week {
    fn containing(date: NaiveDate) -> Self {
        let offset = u64::from(date.weekday().num_days_from_monday());
        Self {
            monday: date.checked_sub_days(Days::new(offset)).unwrap_or(date),
        }
    }

    fn start(&self) -> NaiveDate {
        self.monday
    }

    fn end(&self) -> NaiveDate {
        self.monday.checked_add_days(Days::new(6)).unwrap_or(self.monday)
    }

    fn previous_date(&self) -> NaiveDate {
        self.monday.checked_sub_days(Days::new(7)).unwrap_or(self.monday)
    }

    fn next_date(&self) -> NaiveDate {
        self.monday.checked_add_days(Days::new(7)).unwrap_or(self.monday)
    }

    fn label(&self) -> String {
        let end = self.end();
        if self.monday.year() == end.year() {
            format!("{} - {}", self.monday.format("%b %-d"), end.format("%b %-d, %Y"))
        } else {
            format!("{} - {}", self.monday.format("%b %-d, %Y"), end.format("%b %-d, %Y"))
        }
    }

    fn chart_title(&self) -> &'static str {
        "Hours per Day"
    }

    fn chart_buckets(&self, hours_by_day: &BTreeMap<NaiveDate, f64>) -> Vec<ChartBucket> {
        self.days()
            .into_iter()
            .map(|day| {
                let hours = hours_by_day.get(&day).copied().unwrap_or(0.0);
                ChartBucket::new(day.format("%a").to_string(), hours)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::super::fixtures::date;
    use super::*;

    #[test]
    fn test_week_starts_on_monday() {
        for day in 13..=19 {
            let week = Week::containing(date(2025, 1, day));
            assert_eq!(week.start(), date(2025, 1, 13));
            assert_eq!(week.end(), date(2025, 1, 19));
        }
        assert_eq!(Week::containing(date(2025, 1, 12)).start(), date(2025, 1, 6));
    }

    #[test]
    fn test_week_navigation() {
        let week = Week::containing(date(2025, 1, 15));
        assert_eq!(week.previous_date(), date(2025, 1, 6));
        assert_eq!(week.next_date(), date(2025, 1, 20));
        assert_eq!(week.next().previous(), week);

        assert!(!week.can_navigate_next(date(2025, 1, 19)));
        assert!(week.can_navigate_next(date(2025, 1, 20)));
    }

    #[test]
    fn test_week_label_spans_years() {
        assert_eq!(
            Week::containing(date(2025, 1, 15)).label(),
            "Jan 13 - Jan 19, 2025"
        );
        assert_eq!(
            Week::containing(date(2025, 1, 1)).label(),
            "Dec 30, 2024 - Jan 5, 2025"
        );
    }

    #[test]
    fn test_week_buckets_fill_missing_days() {
        let week = Week::containing(date(2025, 1, 15));
        let hours = BTreeMap::from([(date(2025, 1, 15), 2.25), (date(2025, 1, 19), 1.0)]);

        let buckets = week.chart_buckets(&hours);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
        assert_eq!(
            buckets.iter().map(|b| b.hours).collect::<Vec<_>>(),
            vec![0.0, 0.0, 2.3, 0.0, 0.0, 0.0, 1.0]
        );
    }
}
