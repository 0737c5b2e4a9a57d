//! Click series normalization
//!
//! The API only reports days that had at least one click. Charts want a
//! gap-free series, so the sparse response is densified into a fixed window
//! of consecutive calendar days ending today.

use chrono::{Days, NaiveDate};
use std::collections::HashMap;

use crate::model::AnalyticsPoint;

/// Length of the analytics window shown on the analytics page
pub const WINDOW_DAYS: usize = 12;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Builds exactly `window_days` points, oldest first, ending at `today`.
///
/// Days missing from `raw` get zero clicks and entries outside the window
/// are ignored. If a date is reported twice, the later entry wins.
pub fn build_fixed_window(
    raw: &[AnalyticsPoint],
    today: NaiveDate,
    window_days: usize,
) -> Vec<AnalyticsPoint> {
    let by_date: HashMap<&str, u64> = raw
        .iter()
        .map(|point| (point.date.trim(), point.clicks_count))
        .collect();

    (0..window_days)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset as u64)))
        .map(|day| {
            let date = day.format(DATE_FORMAT).to_string();
            let clicks_count = by_date.get(date.as_str()).copied().unwrap_or(0);
            AnalyticsPoint { date, clicks_count }
        })
        .collect()
}

/// Total shown next to the chart, summed over the dense window
pub fn total_clicks(window: &[AnalyticsPoint]) -> u64 {
    window.iter().map(|p| p.clicks_count).sum()
}
