// Join and alignment algorithms for series sampled on different timestamp grids

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{CanlogError, Result};
use crate::core::series::Series;
use crate::core::window::TimeRange;

/// Two series' values on a common timestamp grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined {
    pub timestamps: Vec<i64>,
    pub left: Vec<f64>,
    pub right: Vec<f64>,
}

impl Joined {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Rebuild both sides as series, each keeping its input's identity.
    pub fn into_series(self, left: &Series, right: &Series) -> Result<(Series, Series)> {
        let l = left.with_samples(self.timestamps.clone(), self.left)?;
        let r = right.with_samples(self.timestamps, self.right)?;
        Ok((l, r))
    }
}

/// How a series is sampled at outer-join grid points it does not contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    #[default]
    Linear,
    /// Last sample at or before the grid point.
    Previous,
    /// First sample at or after the grid point.
    Next,
}

/// What to do with outer-join rows where one side has no value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Missing {
    #[default]
    Drop,
    Fill(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OuterJoin {
    pub interpolation: Interpolation,
    pub missing: Missing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Alignment {
    Left,
    Outer(OuterJoin),
    /// Tolerance in milliseconds, inclusive.
    Inner { tolerance: i64 },
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment::Outer(OuterJoin::default())
    }
}

pub fn align_pair(a: &Series, b: &Series, alignment: Alignment) -> Result<Joined> {
    match alignment {
        Alignment::Left => left_join(a, b),
        Alignment::Outer(opts) => outer_join(a, b, opts),
        Alignment::Inner { tolerance } => inner_join(a, b, tolerance),
    }
}

/// Apply `op` element-wise after aligning `a` and `b`. The result carries `a`'s identity.
pub fn combine(
    a: &Series,
    b: &Series,
    op: impl Fn(f64, f64) -> f64,
    alignment: Alignment,
) -> Result<Series> {
    let joined = align_pair(a, b, alignment)?;
    let values = joined
        .left
        .iter()
        .zip(joined.right.iter())
        .map(|(&x, &y)| op(x, y))
        .collect();
    a.with_samples(joined.timestamps, values)
}

fn require_pair(a: &Series, b: &Series, op: &str) -> Result<()> {
    a.require_non_empty(op)?;
    b.require_non_empty(op)
}

/// Keep `a`'s grid; each `b` sample goes to its nearest `a` timestamp.
///
/// Equidistant samples go to the earlier `a` timestamp, and samples sharing
/// a target are averaged. Targets that received nothing are linearly
/// interpolated from the ones that did.
pub fn left_join(a: &Series, b: &Series) -> Result<Joined> {
    require_pair(a, b, "left join")?;
    let a_ts = a.timestamps();

    let mut sums = vec![0.0; a_ts.len()];
    let mut counts = vec![0usize; a_ts.len()];
    for (t, v) in b.iter() {
        let idx = nearest_index(a_ts, t);
        sums[idx] += v;
        counts[idx] += 1;
    }

    let (anchor_ts, anchor_vals): (Vec<i64>, Vec<f64>) = (0..a_ts.len())
        .filter(|&i| counts[i] > 0)
        .map(|i| (a_ts[i], sums[i] / counts[i] as f64))
        .unzip();

    let right = (0..a_ts.len())
        .map(|i| {
            if counts[i] > 0 {
                anchor_vals[anchor_ts.partition_point(|&x| x < a_ts[i])]
            } else {
                interpolate_clamped(&anchor_ts, &anchor_vals, a_ts[i] as f64)
            }
        })
        .collect();

    Ok(Joined {
        timestamps: a_ts.to_vec(),
        left: a.values().to_vec(),
        right,
    })
}

/// Union of both grids, each side resampled onto it.
pub fn outer_join(a: &Series, b: &Series, opts: OuterJoin) -> Result<Joined> {
    require_pair(a, b, "outer join")?;

    let mut grid: Vec<i64> = a
        .timestamps()
        .iter()
        .chain(b.timestamps().iter())
        .copied()
        .collect();
    grid.sort_unstable();
    grid.dedup();

    let sample = |s: &Series, t: i64| -> Option<f64> {
        match opts.interpolation {
            Interpolation::Linear => interpolate(s.timestamps(), s.values(), t as f64),
            Interpolation::Previous => step_previous(s.timestamps(), s.values(), t),
            Interpolation::Next => step_next(s.timestamps(), s.values(), t),
        }
    };

    let mut joined = Joined {
        timestamps: Vec::with_capacity(grid.len()),
        left: Vec::with_capacity(grid.len()),
        right: Vec::with_capacity(grid.len()),
    };

    for t in grid {
        let (l, r) = match (sample(a, t), sample(b, t), opts.missing) {
            (Some(l), Some(r), _) => (l, r),
            (_, _, Missing::Drop) => continue,
            (l, r, Missing::Fill(c)) => (l.unwrap_or(c), r.unwrap_or(c)),
        };
        joined.timestamps.push(t);
        joined.left.push(l);
        joined.right.push(r);
    }

    Ok(joined)
}

/// `a` timestamps whose nearest `b` sample lies within `tolerance` ms.
///
/// All `b` samples at the minimal distance (both neighbours when
/// equidistant, plus duplicates) are averaged.
pub fn inner_join(a: &Series, b: &Series, tolerance: i64) -> Result<Joined> {
    if tolerance < 0 {
        return Err(CanlogError::InvalidParameter(format!(
            "inner join tolerance must be non-negative, got {}",
            tolerance
        )));
    }
    require_pair(a, b, "inner join")?;
    let b_ts = b.timestamps();
    let b_vals = b.values();

    let mut joined = Joined {
        timestamps: Vec::new(),
        left: Vec::new(),
        right: Vec::new(),
    };

    for (t, v) in a.iter() {
        let i = b_ts.partition_point(|&x| x < t);
        let before = (i > 0).then(|| t - b_ts[i - 1]);
        let after = (i < b_ts.len()).then(|| b_ts[i] - t);
        let dist = match (before, after) {
            (Some(p), Some(n)) => p.min(n),
            (Some(p), None) => p,
            (None, Some(n)) => n,
            (None, None) => continue,
        };
        if dist > tolerance {
            continue;
        }

        let (mut sum, mut count) = (0.0, 0usize);
        for target in [t - dist, t + dist] {
            let lo = b_ts.partition_point(|&x| x < target);
            let hi = b_ts.partition_point(|&x| x <= target);
            sum += b_vals[lo..hi].iter().sum::<f64>();
            count += hi - lo;
            if dist == 0 {
                break;
            }
        }

        joined.timestamps.push(t);
        joined.left.push(v);
        joined.right.push(sum / count as f64);
    }

    Ok(joined)
}

pub fn left_join_series(a: &Series, b: &Series) -> Result<(Series, Series)> {
    left_join(a, b)?.into_series(a, b)
}

pub fn outer_join_series(a: &Series, b: &Series, opts: OuterJoin) -> Result<(Series, Series)> {
    outer_join(a, b, opts)?.into_series(a, b)
}

pub fn inner_join_series(a: &Series, b: &Series, tolerance: i64) -> Result<(Series, Series)> {
    inner_join(a, b, tolerance)?.into_series(a, b)
}

/// Index of the `grid` timestamp nearest to `t`, preferring the earlier one on ties.
/// `grid` must be non-empty and sorted.
fn nearest_index(grid: &[i64], t: i64) -> usize {
    let i = grid.partition_point(|&x| x < t);
    if i == grid.len() {
        return grid.partition_point(|&x| x < grid[i - 1]);
    }
    if i == 0 {
        return 0;
    }
    let (prev, next) = (grid[i - 1], grid[i]);
    if t - prev <= next - t {
        grid.partition_point(|&x| x < prev)
    } else {
        i
    }
}

/// Linear interpolation at `x`, or `None` outside `[xs[0], xs[n-1]]`.
/// At a duplicated timestamp the last sample wins.
pub(crate) fn interpolate(xs: &[i64], ys: &[f64], x: f64) -> Option<f64> {
    let (first, last) = (*xs.first()?, *xs.last()?);
    if x < first as f64 || x > last as f64 {
        return None;
    }
    let i = xs.partition_point(|&v| (v as f64) <= x);
    if i > 0 && xs[i - 1] as f64 == x {
        return Some(ys[i - 1]);
    }
    let (x0, x1) = (xs[i - 1] as f64, xs[i] as f64);
    let frac = (x - x0) / (x1 - x0);
    Some(ys[i - 1] + frac * (ys[i] - ys[i - 1]))
}

fn interpolate_clamped(xs: &[i64], ys: &[f64], x: f64) -> f64 {
    match (xs.first(), xs.last()) {
        (Some(&first), _) if x <= first as f64 => ys[0],
        (_, Some(&last)) if x >= last as f64 => ys[ys.len() - 1],
        _ => interpolate(xs, ys, x).unwrap_or(f64::NAN),
    }
}

pub(crate) fn step_previous(xs: &[i64], ys: &[f64], t: i64) -> Option<f64> {
    let i = xs.partition_point(|&x| x <= t);
    (i > 0).then(|| ys[i - 1])
}

pub(crate) fn step_next(xs: &[i64], ys: &[f64], t: i64) -> Option<f64> {
    let i = xs.partition_point(|&x| x < t);
    (i < xs.len()).then(|| ys[i])
}

/// Gap-filling policy for N-way alignment and resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    /// Linear between the nearest samples on either side.
    #[default]
    Connect,
    /// Repeat the previous sample.
    ExtendForward,
    /// Use the next sample.
    ExtendBack,
}

impl FillMethod {
    /// Value of `series` at `t` (fractional milliseconds). Returns `None` only for an empty series.
    pub(crate) fn sample(&self, series: &Series, t: f64) -> Option<f64> {
        let ts = series.timestamps();
        let vals = series.values();

        // exact hit, last duplicate wins
        let hi = ts.partition_point(|&x| (x as f64) <= t);
        if hi > 0 && ts[hi - 1] as f64 == t {
            return Some(vals[hi - 1]);
        }

        let prev = (hi > 0).then(|| hi - 1);
        let next = (hi < ts.len()).then_some(hi);

        match (self, prev, next) {
            (_, None, None) => None,
            (FillMethod::Connect, Some(p), Some(n)) => {
                let frac = (t - ts[p] as f64) / (ts[n] - ts[p]) as f64;
                Some(vals[p] + frac * (vals[n] - vals[p]))
            }
            (FillMethod::ExtendForward, Some(p), _) => Some(vals[p]),
            (FillMethod::ExtendBack, _, Some(n)) => Some(vals[n]),
            // no neighbour on the preferred side
            (_, Some(p), None) => Some(vals[p]),
            (_, None, Some(n)) => Some(vals[n]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Op {
    type Err = CanlogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "+" => Ok(Op::Add),
            "-" => Ok(Op::Sub),
            "*" => Ok(Op::Mul),
            "/" => Ok(Op::Div),
            other => Err(CanlogError::InvalidParameter(format!(
                "unknown operator {:?}",
                other
            ))),
        }
    }
}

/// Several series filled onto one union grid.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFrame {
    pub timestamps: Vec<i64>,
    pub columns: Vec<Vec<f64>>,
}

/// Align `series` over their common time window (intersected with `range`).
pub fn align_many(series: &[&Series], fill: FillMethod, range: TimeRange) -> Result<AlignedFrame> {
    if series.is_empty() {
        return Err(CanlogError::InvalidParameter(
            "no series to align".to_string(),
        ));
    }

    let mut start = range.start;
    let mut end = range.end.unwrap_or(i64::MAX);
    for s in series {
        s.require_non_empty("n-way alignment")?;
        start = start.max(s.timestamps()[0]);
        end = end.min(s.timestamps()[s.len() - 1]);
    }
    if start > end {
        return Err(CanlogError::EmptySeries(format!(
            "no overlapping time range ({} > {})",
            start, end
        )));
    }

    let mut grid: Vec<i64> = series
        .iter()
        .flat_map(|s| s.timestamps().iter().copied())
        .filter(|&t| t >= start && t <= end)
        .collect();
    grid.sort_unstable();
    grid.dedup();

    let columns = series
        .iter()
        .map(|s| {
            grid.iter()
                .map(|&t| fill.sample(s, t as f64).unwrap_or(f64::NAN))
                .collect()
        })
        .collect();

    Ok(AlignedFrame {
        timestamps: grid,
        columns,
    })
}

/// Apply `ops` left to right across aligned `series` (`s0 op0 s1 op1 s2 ...`).
///
/// Any aligned zero divisor rejects the whole computation.
pub fn compute(
    series: &[&Series],
    ops: &[Op],
    fill: FillMethod,
    range: TimeRange,
) -> Result<Series> {
    if series.is_empty() || ops.len() + 1 != series.len() {
        return Err(CanlogError::InvalidParameter(format!(
            "{} series need {} operators, got {}",
            series.len(),
            series.len().saturating_sub(1),
            ops.len()
        )));
    }

    let frame = align_many(series, fill, range)?;
    let mut zero_divisions = 0;
    let values: Vec<f64> = (0..frame.timestamps.len())
        .map(|row| {
            ops.iter()
                .zip(frame.columns.iter().skip(1))
                .fold(frame.columns[0][row], |acc, (op, col)| {
                    let rhs = col[row];
                    match op {
                        Op::Add => acc + rhs,
                        Op::Sub => acc - rhs,
                        Op::Mul => acc * rhs,
                        Op::Div if rhs == 0.0 => {
                            zero_divisions += 1;
                            f64::NAN
                        }
                        Op::Div => acc / rhs,
                    }
                })
        })
        .collect();

    if zero_divisions > 0 {
        return Err(CanlogError::DivisionByZero {
            count: zero_divisions,
        });
    }

    let mut label = series[0].display_name().to_string();
    for (op, s) in ops.iter().zip(series.iter().skip(1)) {
        label.push_str(&format!(" {} {}", op, s.display_name()));
    }

    Series::new(
        series[0].id(),
        series[0].name(),
        label,
        frame.timestamps,
        values,
    )
}
