//! Dated price series and the resampling used by the growth and beta estimates

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// A single dated value: a close price or a period return
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Chronological closing prices.
///
/// Non-finite closes are dropped on construction and a date appears at most
/// once (the last value supplied for it wins).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<Observation>,
}

impl PriceSeries {
    pub fn new(points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        let by_date: BTreeMap<NaiveDate, f64> = points
            .into_iter()
            .filter(|(_, close)| close.is_finite())
            .collect();

        Self {
            points: by_date
                .into_iter()
                .map(|(date, value)| Observation { date, value })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    /// Multiply every close by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.points.iter().map(|p| (p.date, p.value * factor)))
    }

    /// One close per calendar month, labelled with the month's last day.
    ///
    /// Each month takes its last available close; months without trades
    /// carry the previous month's close forward.
    pub fn month_end(&self) -> Self {
        let mut last_in_month: BTreeMap<(i32, u32), f64> = BTreeMap::new();
        for p in &self.points {
            last_in_month.insert((p.date.year(), p.date.month()), p.value);
        }

        let (Some(&first), Some(&last)) = (
            last_in_month.keys().next(),
            last_in_month.keys().next_back(),
        ) else {
            return Self::default();
        };

        let mut resampled = Vec::new();
        let mut carried = None;
        let mut month = first;
        loop {
            if let Some(&close) = last_in_month.get(&month) {
                carried = Some(close);
            }
            if let (Some(close), Some(date)) = (carried, last_day_of_month(month.0, month.1)) {
                resampled.push((date, close));
            }
            if month == last {
                break;
            }
            month = next_month(month);
        }

        Self::new(resampled)
    }

    /// One close per week ending Friday, labelled with that Friday.
    ///
    /// Weekend dates fall into the following Friday's week. Weeks without
    /// any close are skipped.
    pub fn weekly_friday(&self) -> Self {
        Self::new(
            self.points
                .iter()
                .map(|p| (week_ending_friday(p.date), p.value)),
        )
    }

    /// Simple period-over-period returns; the first observation has none
    pub fn pct_change(&self) -> Vec<Observation> {
        self.points
            .windows(2)
            .map(|w| Observation {
                date: w[1].date,
                value: (w[1].value - w[0].value) / w[0].value,
            })
            .collect()
    }
}

/// Arithmetic mean of the finite values; NaN when there are none
pub fn finite_mean<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    values
        .into_iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect::<Vec<_>>()
        .mean()
}

/// Pair up two date-sorted return series on the dates they share
pub fn inner_join(left: &[Observation], right: &[Observation]) -> Vec<(f64, f64)> {
    let right: BTreeMap<NaiveDate, f64> = right.iter().map(|o| (o.date, o.value)).collect();
    left.iter()
        .filter_map(|o| right.get(&o.date).map(|&r| (o.value, r)))
        .filter(|(l, r)| l.is_finite() && r.is_finite())
        .collect()
}

fn next_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next) = next_month((year, month));
    NaiveDate::from_ymd_opt(next_year, next, 1)?.pred_opt()
}

fn week_ending_friday(date: NaiveDate) -> NaiveDate {
    // Monday = 0, Friday = 4
    let weekday = date.weekday().num_days_from_monday();
    let ahead = (4 + 7 - weekday) % 7;
    date.checked_add_days(Days::new(u64::from(ahead)))
        .unwrap_or(date)
}
