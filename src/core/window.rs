// Time-windowed reductions over a single series

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::align::interpolate;
use crate::core::constants::MS_PER_SECOND;
use crate::core::error::{CanlogError, Result};
use crate::core::series::Series;

/// Unit for integration variables and reported times.
///
/// Series always store milliseconds; this is the only place they get converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    #[serde(rename = "ms")]
    Milliseconds,
    #[default]
    #[serde(rename = "s")]
    Seconds,
}

impl TimeUnit {
    pub fn from_ms(&self, ms: f64) -> f64 {
        match self {
            TimeUnit::Milliseconds => ms,
            TimeUnit::Seconds => ms / MS_PER_SECOND,
        }
    }

    pub fn to_ms(&self, value: f64) -> f64 {
        match self {
            TimeUnit::Milliseconds => value,
            TimeUnit::Seconds => value * MS_PER_SECOND,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = CanlogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "ms" => Ok(TimeUnit::Milliseconds),
            "s" => Ok(TimeUnit::Seconds),
            other => Err(CanlogError::InvalidParameter(format!(
                "unknown time unit {:?}",
                other
            ))),
        }
    }
}

/// A time window in milliseconds. `end: None` is unbounded on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: Option<i64>,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::all()
    }
}

impl TimeRange {
    pub fn all() -> Self {
        Self {
            start: 0,
            end: None,
        }
    }

    /// A negative `end` (conventionally `-1`) means "to the end of the data".
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: (end >= 0).then_some(end),
        }
    }

    /// Bounds given in `unit`, converted to milliseconds once here.
    pub fn from_unit(start: f64, end: f64, unit: TimeUnit) -> Self {
        Self {
            start: unit.to_ms(start).round() as i64,
            end: (end >= 0.0).then(|| unit.to_ms(end).round() as i64),
        }
    }

    /// Half-open membership: `start <= t < end`.
    pub fn contains(&self, t: i64) -> bool {
        t >= self.start && self.end.map_or(true, |end| t < end)
    }
}

/// Samples with timestamps in `[start, end)`.
pub fn slice(series: &Series, range: TimeRange) -> Series {
    series.retain(|t, _| range.contains(t))
}

/// `range` clipped to the series' own span, or `None` if that leaves nothing.
fn clip(series: &Series, range: TimeRange) -> Option<(i64, i64)> {
    let first = series.first_timestamp()?;
    let last = series.last_timestamp()?;
    let lo = range.start.max(first);
    let hi = range.end.map_or(last, |end| end.min(last));
    (lo < hi).then_some((lo, hi))
}

/// Trapezoidal integral of the series over `range` clipped to its span.
///
/// Values at the clipped bounds are linearly interpolated, so splitting a
/// range at any point gives two integrals that sum to the whole. A non-empty
/// series with fewer than two points in range integrates to 0.
pub fn integral(series: &Series, range: TimeRange, unit: TimeUnit) -> Result<f64> {
    series.require_non_empty("integral")?;
    if series.len() < 2 {
        return Ok(0.0);
    }
    let Some((lo, hi)) = clip(series, range) else {
        return Ok(0.0);
    };

    let ts = series.timestamps();
    let vals = series.values();
    let edge = |t: i64| interpolate(ts, vals, t as f64).unwrap_or(f64::NAN);

    let mut points = Vec::with_capacity(series.len() + 2);
    points.push((lo, edge(lo)));
    points.extend(series.iter().filter(|&(t, _)| t > lo && t < hi));
    points.push((hi, edge(hi)));

    Ok(points
        .windows(2)
        .map(|w| {
            let (t0, v0) = w[0];
            let (t1, v1) = w[1];
            unit.from_ms((t1 - t0) as f64) * (v0 + v1) / 2.0
        })
        .sum())
}

/// Time-weighted average: the integral divided by the elapsed time, both in `unit`.
pub fn average(series: &Series, range: TimeRange, unit: TimeUnit) -> Result<f64> {
    series.require_non_empty("average")?;
    let Some((lo, hi)) = clip(series, range) else {
        return Ok(0.0);
    };
    let elapsed = unit.from_ms((hi - lo) as f64);
    if elapsed == 0.0 {
        return Ok(0.0);
    }
    Ok(integral(series, range, unit)? / elapsed)
}

/// Summary of a series over a window, times expressed in `unit`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub unit: TimeUnit,
    pub first: f64,
    pub last: f64,
    pub min: f64,
    pub min_at: f64,
    pub max: f64,
    pub max_at: f64,
    pub average: f64,
    pub integral: f64,
}

pub fn stats(series: &Series, range: TimeRange, unit: TimeUnit) -> Result<SeriesStats> {
    let window = slice(series, range);
    window.require_non_empty("statistics")?;

    let mut min = (f64::INFINITY, 0i64);
    let mut max = (f64::NEG_INFINITY, 0i64);
    for (t, v) in window.iter().filter(|(_, v)| !v.is_nan()) {
        if v < min.0 {
            min = (v, t);
        }
        if v > max.0 {
            max = (v, t);
        }
    }
    if min.0 > max.0 {
        return Err(CanlogError::EmptySeries(format!(
            "statistics on '{}': every value in range is NaN",
            series.display_name()
        )));
    }

    let to_unit = |t: i64| unit.from_ms(t as f64);
    let first = window.first_timestamp().unwrap_or_default();
    let last = window.last_timestamp().unwrap_or_default();

    Ok(SeriesStats {
        count: window.len(),
        unit,
        first: to_unit(first),
        last: to_unit(last),
        min: min.0,
        min_at: to_unit(min.1),
        max: max.0,
        max_at: to_unit(max.1),
        average: average(series, range, unit)?,
        integral: integral(series, range, unit)?,
    })
}
