use super::{ChartBucket, Period};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::BTreeMap;

/// Calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month {
    first: NaiveDate,
}

impl Period for Month {
    fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    fn start(&self) -> NaiveDate {
        self.first
    }

    fn end(&self) -> NaiveDate {
        self.next_date().pred_opt().unwrap_or(self.first)
    }

    fn previous_date(&self) -> NaiveDate {
        self.first.checked_sub_months(Months::new(1)).unwrap_or(self.first)
    }

    fn next_date(&self) -> NaiveDate {
        self.first.checked_add_months(Months::new(1)).unwrap_or(self.first)
    }

    fn label(&self) -> String {
        self.first.format("%B %Y").to_string()
    }

    fn chart_title(&self) -> &'static str {
        "Hours per Day"
    }

    fn chart_buckets(&self, hours_by_day: &BTreeMap<NaiveDate, f64>) -> Vec<ChartBucket> {
        self.days()
            .into_iter()
            .map(|day| {
                let hours = hours_by_day.get(&day).copied().unwrap_or(0.0);
                ChartBucket::new(day.day().to_string(), hours)
            })
            .collect()
    }
}
