// FFT band-pass / band-stop filter over a uniformly resampled series

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::align::FillMethod;
use crate::core::constants::{MAX_RESAMPLED_POINTS, MS_PER_SECOND};
use crate::core::error::{CanlogError, Result};
use crate::core::series::Series;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandMode {
    /// Keep frequencies inside the band.
    #[default]
    Pass,
    /// Remove frequencies inside the band.
    Stop,
}

/// Frequencies are in Hz. `upper: None` leaves the band open above `lower`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BandFilter {
    /// Resampling rate; estimated from the median sample spacing when absent.
    pub sample_rate: Option<f64>,
    /// Defaults to a third of the sample rate.
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub mode: BandMode,
    pub fill: FillMethod,
}

impl BandFilter {
    pub fn band(lower: f64, upper: Option<f64>) -> Self {
        Self {
            lower: Some(lower),
            upper,
            ..Self::default()
        }
    }

    pub fn stop(mut self) -> Self {
        self.mode = BandMode::Stop;
        self
    }

    pub fn with_sample_rate(mut self, hz: f64) -> Self {
        self.sample_rate = Some(hz);
        self
    }

    pub fn with_fill(mut self, fill: FillMethod) -> Self {
        self.fill = fill;
        self
    }

    pub fn apply(&self, series: &Series) -> Result<Series> {
        series.require_non_empty("band filter")?;

        let fs = match self.sample_rate {
            Some(fs) => fs,
            None => estimate_sample_rate(series)?,
        };
        if !fs.is_finite() || fs <= 0.0 {
            return Err(CanlogError::InvalidParameter(format!(
                "sample rate must be positive and finite, got {}",
                fs
            )));
        }
        // timestamps are whole milliseconds
        if fs > MS_PER_SECOND {
            return Err(CanlogError::InvalidParameter(format!(
                "sample rate {} Hz exceeds the {} Hz timestamp resolution",
                fs, MS_PER_SECOND
            )));
        }

        let lower = self.lower.unwrap_or(fs / 3.0);
        if !lower.is_finite() || lower < 0.0 {
            return Err(CanlogError::InvalidParameter(format!(
                "lower cutoff must be non-negative, got {}",
                lower
            )));
        }
        if let Some(upper) = self.upper {
            if upper.is_nan() || upper < lower {
                return Err(CanlogError::InvalidParameter(format!(
                    "upper cutoff {} is below lower cutoff {}",
                    upper, lower
                )));
            }
        }

        let (grid, samples) = self.resample(series, fs)?;
        let n = samples.len();
        debug!(
            "band filter on '{}': {} points at {:.3} Hz, band [{}, {:?}]",
            series.display_name(),
            n,
            fs,
            lower,
            self.upper
        );

        let mut planner = FftPlanner::new();
        let mut spectrum: Vec<Complex<f64>> =
            samples.iter().map(|&re| Complex { re, im: 0.0 }).collect();
        planner.plan_fft_forward(n).process(&mut spectrum);

        for (k, bin) in spectrum.iter_mut().enumerate() {
            let freq = bin_frequency(k, n, fs).abs();
            let in_band = freq >= lower && self.upper.map_or(true, |upper| freq <= upper);
            let keep = match self.mode {
                BandMode::Pass => in_band,
                BandMode::Stop => !in_band,
            };
            if !keep {
                *bin = Complex { re: 0.0, im: 0.0 };
            }
        }

        planner.plan_fft_inverse(n).process(&mut spectrum);
        let scale = 1.0 / n as f64;
        let values = spectrum.iter().map(|c| c.re * scale).collect();

        series.with_samples(grid, values)
    }

    /// Uniform grid from the first to the last timestamp, filled with `self.fill`.
    fn resample(&self, series: &Series, fs: f64) -> Result<(Vec<i64>, Vec<f64>)> {
        let (first, last) = match (series.first_timestamp(), series.last_timestamp()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok((Vec::new(), Vec::new())),
        };

        let step = MS_PER_SECOND / fs;
        let span = (last - first) as f64 / step;
        if span >= MAX_RESAMPLED_POINTS as f64 {
            return Err(CanlogError::InvalidParameter(format!(
                "resampling '{}' at {} Hz needs more than {} points",
                series.display_name(),
                fs,
                MAX_RESAMPLED_POINTS
            )));
        }
        let n = span.floor() as usize + 1;

        Ok((0..n)
            .map(|k| {
                let t = first as f64 + k as f64 * step;
                let v = self.fill.sample(series, t).unwrap_or(f64::NAN);
                (t.round() as i64, v)
            })
            .unzip())
    }
}

/// Signed frequency of FFT bin `k` out of `n`.
fn bin_frequency(k: usize, n: usize, fs: f64) -> f64 {
    let k = if k <= n / 2 { k as f64 } else { k as f64 - n as f64 };
    k * fs / n as f64
}

/// Sample rate in Hz from the median positive spacing between timestamps.
pub fn estimate_sample_rate(series: &Series) -> Result<f64> {
    let mut gaps: Vec<i64> = series
        .timestamps()
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|&d| d > 0)
        .collect();
    if gaps.is_empty() {
        return Err(CanlogError::InvalidParameter(format!(
            "cannot estimate a sample rate for '{}' from {} samples",
            series.display_name(),
            series.len()
        )));
    }

    gaps.sort_unstable();
    let mid = gaps.len() / 2;
    let median = if gaps.len() % 2 == 0 {
        (gaps[mid - 1] + gaps[mid]) as f64 / 2.0
    } else {
        gaps[mid] as f64
    };
    Ok(MS_PER_SECOND / median)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn tones() -> (Series, Vec<f64>) {
        let ts: Vec<i64> = (0..1000).collect();
        let low: Vec<f64> = ts
            .iter()
            .map(|&t| (2.0 * PI * 5.0 * t as f64 / 1000.0).sin())
            .collect();
        let mixed = ts
            .iter()
            .zip(&low)
            .map(|(&t, l)| l + 0.5 * (2.0 * PI * 200.0 * t as f64 / 1000.0).sin())
            .collect();
        (Series::from_samples(ts, mixed).unwrap(), low)
    }

    #[test]
    fn test_estimate_sample_rate() {
        let s = Series::from_samples(vec![0, 10, 20, 20, 30, 45], vec![0.0; 6]).unwrap();
        assert_relative_eq!(estimate_sample_rate(&s).unwrap(), 100.0);
        let single = Series::from_samples(vec![5], vec![1.0]).unwrap();
        assert!(estimate_sample_rate(&single).is_err());
    }

    #[test]
    fn test_full_band_is_identity() {
        let ts: Vec<i64> = (0..64).map(|i| i * 10).collect();
        let vals: Vec<f64> = ts.iter().map(|&t| (t as f64 / 70.0).sin() + 0.3 * (t as f64 / 13.0).cos()).collect();
        let s = Series::from_samples(ts, vals).unwrap();

        let out = BandFilter::band(0.0, None).apply(&s).unwrap();
        assert_eq!(out.timestamps(), s.timestamps());
        for (a, b) in out.values().iter().zip(s.values()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_low_pass_removes_high_tone() {
        let (s, low) = tones();
        let out = BandFilter::band(0.0, Some(50.0)).apply(&s).unwrap();
        assert_eq!(out.len(), 1000);
        for (a, b) in out.values().iter().zip(&low) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_band_stop_removes_tone_inside_band() {
        let (s, low) = tones();
        let out = BandFilter::band(100.0, Some(300.0)).stop().apply(&s).unwrap();
        for (a, b) in out.values().iter().zip(&low) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_default_cutoff_is_a_third_of_rate() {
        let (s, _) = tones();
        // both tones sit below fs/3
        let out = BandFilter::default().apply(&s).unwrap();
        assert!(out.values().iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_invalid_parameters() {
        let (s, _) = tones();
        let empty = Series::from_samples(vec![], vec![]).unwrap();
        assert!(matches!(
            BandFilter::default().apply(&empty),
            Err(CanlogError::EmptySeries(_))
        ));
        assert!(matches!(
            BandFilter::default().with_sample_rate(0.0).apply(&s),
            Err(CanlogError::InvalidParameter(_))
        ));
        assert!(matches!(
            BandFilter::band(10.0, Some(5.0)).apply(&s),
            Err(CanlogError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_sample_rate_above_timestamp_resolution() {
        let (s, _) = tones();
        assert!(matches!(
            BandFilter::default().with_sample_rate(1e6).apply(&s),
            Err(CanlogError::InvalidParameter(_))
        ));
        assert!(BandFilter::band(0.0, None).with_sample_rate(1000.0).apply(&s).is_ok());

        // a long span at the finest rate would not fit the grid
        let wide = Series::from_samples(vec![0, 10, 1 << 30], vec![0.0, 1.0, 2.0]).unwrap();
        assert!(matches!(
            BandFilter::band(0.0, None).with_sample_rate(1000.0).apply(&wide),
            Err(CanlogError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_fill_method_covers_gaps() {
        // 10 ms spacing with a hole between 90 and 160
        let ts: Vec<i64> = (0..=90).step_by(10).chain((160..=200).step_by(10)).collect();
        let vals: Vec<f64> = ts.iter().map(|&t| t as f64).collect();
        let s = Series::from_samples(ts, vals).unwrap();

        let gap = |fill: FillMethod| -> Vec<(i64, f64)> {
            let out = BandFilter::band(0.0, None).with_fill(fill).apply(&s).unwrap();
            assert_eq!(out.len(), 21);
            out.iter().filter(|&(t, _)| t > 90 && t < 160).collect()
        };

        let forward = gap(FillMethod::ExtendForward);
        assert_eq!(forward.len(), 6);
        for (_, v) in forward {
            assert_relative_eq!(v, 90.0, epsilon = 1e-9);
        }
        for (_, v) in gap(FillMethod::ExtendBack) {
            assert_relative_eq!(v, 160.0, epsilon = 1e-9);
        }
        for (t, v) in gap(FillMethod::Connect) {
            assert_relative_eq!(v, t as f64, epsilon = 1e-9);
        }
    }
}
