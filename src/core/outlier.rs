// Sliding-window IQR outlier rejection

use serde::{Deserialize, Serialize};

use crate::core::constants::{IQR_FENCE, MIN_OUTLIER_WINDOW};
use crate::core::error::{CanlogError, Result};
use crate::core::series::Series;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMode {
    /// Swap an outlier for its window's median; length is preserved.
    #[default]
    Replace,
    /// Remove outliers from the series.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutlierFilter {
    /// Window length in samples; defaults to `max(5, round(sqrt(N)))`.
    pub window: Option<usize>,
    pub mode: OutlierMode,
}

#[derive(Debug, Clone)]
pub struct Filtered {
    pub series: Series,
    /// Samples found outside their window's fences.
    pub flagged: usize,
}

#[derive(Debug, Clone, Copy)]
struct Fences {
    lower: f64,
    upper: f64,
    median: f64,
}

impl Fences {
    fn of(window: &[f64]) -> Self {
        let mut sorted = window.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 0.25);
        let q3 = percentile(&sorted, 0.75);
        let iqr = q3 - q1;
        Self {
            lower: q1 - IQR_FENCE * iqr,
            upper: q3 + IQR_FENCE * iqr,
            median: percentile(&sorted, 0.5),
        }
    }

    fn excludes(&self, v: f64) -> bool {
        v < self.lower || v > self.upper
    }
}

/// Linear-interpolated percentile of sorted data, `p` in `[0, 1]`.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

impl OutlierFilter {
    pub fn replacing() -> Self {
        Self {
            window: None,
            mode: OutlierMode::Replace,
        }
    }

    pub fn dropping() -> Self {
        Self {
            window: None,
            mode: OutlierMode::Drop,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    /// Odd window length for `n` samples, never longer than the series.
    fn window_len(&self, n: usize) -> Result<usize> {
        let requested = match self.window {
            Some(0) => {
                return Err(CanlogError::InvalidParameter(
                    "outlier window must be positive".to_string(),
                ))
            }
            Some(w) => w,
            None => MIN_OUTLIER_WINDOW.max((n as f64).sqrt().round() as usize),
        };

        let mut w = (requested | 1).min(n);
        if w % 2 == 0 {
            w -= 1;
        }
        Ok(w.max(1))
    }

    pub fn apply(&self, series: &Series) -> Result<Filtered> {
        series.require_non_empty("outlier rejection")?;

        if self.mode == OutlierMode::Drop && series.outliers_removed() {
            return Ok(Filtered {
                series: series.clone(),
                flagged: 0,
            });
        }

        let values = series.values();
        let n = values.len();
        let w = self.window_len(n)?;
        let half = w / 2;

        let fences: Vec<Fences> = values.windows(w).map(Fences::of).collect();
        let last = fences.len() - 1;

        let mut flagged = 0;
        let mut timestamps = Vec::with_capacity(n);
        let mut kept = Vec::with_capacity(n);

        for (i, (t, v)) in series.iter().enumerate() {
            // samples near either edge borrow the first or last full window
            let f = &fences[i.saturating_sub(half).min(last)];
            if !f.excludes(v) {
                timestamps.push(t);
                kept.push(v);
                continue;
            }

            flagged += 1;
            if self.mode == OutlierMode::Replace {
                timestamps.push(t);
                kept.push(f.median);
            }
        }

        let filtered = series.with_samples(timestamps, kept)?;
        let series = match self.mode {
            OutlierMode::Replace => filtered,
            OutlierMode::Drop => filtered.mark_outliers_removed(),
        };

        Ok(Filtered { series, flagged })
    }
}
