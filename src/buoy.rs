//! In-situ buoy series.
//!
//! Buoy records are reduced to one value per calendar day before they are
//! compared with daily satellite products: either the mean over the month's
//! daylight hours or the median over the whole day. Individual passes are
//! instead matched with the buoy reading at the pass time. Comparisons are
//! reported overall and per calendar month.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::composite::DaylightTable;
use crate::error::{ColdpixError, Result};
use crate::stats::{compare, Comparison, DiffSummary};

/// One buoy measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuoyObservation {
    /// Measurement time, GMT
    pub time: NaiveDateTime,
    /// Sea surface temperature, degrees Celsius
    pub sst: f64,
}

/// A buoy's time series with its resolved position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuoySeries {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub observations: Vec<BuoyObservation>,
}

impl BuoySeries {
    /// Observations without NaN values or exact repeats, in time order
    pub fn cleaned(&self) -> Vec<BuoyObservation> {
        let mut obs: Vec<BuoyObservation> = self
            .observations
            .iter()
            .copied()
            .filter(|o| !o.sst.is_nan())
            .collect();
        obs.sort_by(|a, b| a.time.cmp(&b.time).then(a.sst.total_cmp(&b.sst)));
        obs.dedup();
        obs
    }
}

fn group_by_day(observations: impl Iterator<Item = BuoyObservation>) -> BTreeMap<NaiveDate, Vec<f64>> {
    let mut days: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for o in observations {
        days.entry(o.time.date()).or_default().push(o.sst);
    }
    days
}

/// Daily means over daylight hours.
///
/// An observation counts when `start_hour <= hour <= end_hour` for its month;
/// the end hour is inclusive here, unlike the compositor's pass window.
pub fn daylight_daily_means(series: &BuoySeries, table: &DaylightTable) -> Vec<(NaiveDate, f64)> {
    let daylight = series.cleaned().into_iter().filter(|o| {
        let window = table.for_day(o.time.date());
        let hour = o.time.hour();
        hour >= window.start_hour && hour <= window.end_hour
    });
    group_by_day(daylight)
        .into_iter()
        .map(|(day, values)| (day, values.iter().sum::<f64>() / values.len() as f64))
        .collect()
}

/// Daily medians over all hours
pub fn daily_medians(series: &BuoySeries) -> Vec<(NaiveDate, f64)> {
    group_by_day(series.cleaned().into_iter())
        .into_iter()
        .map(|(day, mut values)| {
            values.sort_by(f64::total_cmp);
            let mid = values.len() / 2;
            let median = if values.len() % 2 == 0 {
                (values[mid - 1] + values[mid]) / 2.0
            } else {
                values[mid]
            };
            (day, median)
        })
        .collect()
}

/// How buoy records become one value per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyReduction {
    /// Mean over the month's daylight hours, end hour inclusive
    #[default]
    DaylightMean,
    /// Median over all hours of the day
    Median,
}

impl DailyReduction {
    /// Reduce a series to `(day, value)` in day order
    pub fn apply(self, series: &BuoySeries, table: &DaylightTable) -> Vec<(NaiveDate, f64)> {
        match self {
            DailyReduction::DaylightMean => daylight_daily_means(series, table),
            DailyReduction::Median => daily_medians(series),
        }
    }
}

impl fmt::Display for DailyReduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DailyReduction::DaylightMean => write!(f, "daylight_mean"),
            DailyReduction::Median => write!(f, "median"),
        }
    }
}

impl FromStr for DailyReduction {
    type Err = ColdpixError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daylight_mean" => Ok(DailyReduction::DaylightMean),
            "median" => Ok(DailyReduction::Median),
            other => Err(ColdpixError::InvalidParameter {
                param: "reduction".to_string(),
                message: format!("Unknown daily reduction '{}': use daylight_mean or median", other),
            }),
        }
    }
}

/// A buoy value and the satellite value paired with it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedValue {
    pub day: NaiveDate,
    pub observed: f64,
    pub predicted: f64,
}

/// Join daily buoy and satellite values on day, in day order.
///
/// Days missing from either side or with a NaN satellite value are dropped.
pub fn pair_by_day(
    buoy_daily: &[(NaiveDate, f64)],
    sat_daily: &[(NaiveDate, f64)],
) -> Vec<PairedValue> {
    let sat: BTreeMap<NaiveDate, f64> = sat_daily
        .iter()
        .copied()
        .filter(|(_, v)| !v.is_nan())
        .collect();
    let buoy: BTreeMap<NaiveDate, f64> = buoy_daily.iter().copied().collect();

    buoy.into_iter()
        .filter_map(|(day, observed)| {
            sat.get(&day).map(|&predicted| PairedValue {
                day,
                observed,
                predicted,
            })
        })
        .collect()
}

/// Buoy reading at `time`.
///
/// Readings at exactly `time` are averaged. Otherwise the nearest readings
/// before and after are averaged, or the one that exists at either end of
/// the record. `observations` must be in time order.
pub fn buoy_value_at(observations: &[BuoyObservation], time: NaiveDateTime) -> Option<f64> {
    let lo = observations.partition_point(|o| o.time < time);
    let hi = observations.partition_point(|o| o.time <= time);
    let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;

    if hi > lo {
        let exact: Vec<f64> = observations[lo..hi].iter().map(|o| o.sst).collect();
        return Some(mean(&exact));
    }
    let before = lo.checked_sub(1).map(|i| observations[i].sst);
    let after = observations.get(lo).map(|o| o.sst);
    match (before, after) {
        (Some(b), Some(a)) => Some(mean(&[b, a])),
        (one, None) | (None, one) => one,
    }
}

/// Pair individual pass values, `(capture time, value)`, with the buoy.
///
/// NaN pass values are dropped. Pairs come back in time order.
pub fn pair_with_passes(series: &BuoySeries, passes: &[(NaiveDateTime, f64)]) -> Vec<PairedValue> {
    let observations = series.cleaned();
    let mut passes: Vec<(NaiveDateTime, f64)> =
        passes.iter().copied().filter(|(_, v)| !v.is_nan()).collect();
    passes.sort_by(|a, b| a.0.cmp(&b.0));

    passes
        .into_iter()
        .filter_map(|(time, predicted)| {
            buoy_value_at(&observations, time).map(|observed| PairedValue {
                day: time.date(),
                observed,
                predicted,
            })
        })
        .collect()
}

/// Split an inclusive date range into calendar-month chunks
pub fn month_ranges(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut ranges = Vec::new();
    let mut chunk_start = start;
    let mut day = start;
    while day <= end {
        let next = day + Duration::days(1);
        if next > end || next.month() != day.month() {
            ranges.push((chunk_start, day));
            chunk_start = next;
        }
        day = next;
    }
    ranges
}

/// Comparison statistics for one calendar month
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyComparison {
    /// `YYYY-MM`
    pub month: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub comparison: Comparison,
    pub summary: Option<DiffSummary>,
}

/// A buoy's comparison over a date range, overall and month by month
#[derive(Debug, Clone, Serialize)]
pub struct BuoyReport {
    pub buoy: String,
    /// How the buoy values were matched to the satellite values
    pub method: String,
    pub overall: Comparison,
    pub summary: Option<DiffSummary>,
    /// Months with at least one pair, in order
    pub months: Vec<MonthlyComparison>,
}

impl BuoyReport {
    /// Build the report from pairs in day order
    pub fn from_pairs(buoy: &str, method: &str, pairs: &[PairedValue]) -> Result<Self> {
        let (observed, predicted): (Vec<f64>, Vec<f64>) =
            pairs.iter().map(|p| (p.observed, p.predicted)).unzip();
        let overall = compare(&observed, &predicted)?;

        let mut months = Vec::new();
        if let (Some(first), Some(last)) = (pairs.first(), pairs.last()) {
            for (start, end) in month_ranges(first.day, last.day) {
                let (observed, predicted): (Vec<f64>, Vec<f64>) = pairs
                    .iter()
                    .filter(|p| p.day >= start && p.day <= end)
                    .map(|p| (p.observed, p.predicted))
                    .unzip();
                let comparison = compare(&observed, &predicted)?;
                if comparison.n == 0 {
                    continue;
                }
                months.push(MonthlyComparison {
                    month: start.format("%Y-%m").to_string(),
                    start,
                    end,
                    summary: comparison.summary(),
                    comparison,
                });
            }
        }

        Ok(Self {
            buoy: buoy.to_string(),
            method: method.to_string(),
            summary: overall.summary(),
            overall,
            months,
        })
    }
}
