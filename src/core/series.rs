// Per-signal time series value object

use serde::Serialize;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::core::align::{combine, Alignment};
use crate::core::error::{CanlogError, Result};

/// One signal's samples: millisecond timestamps and their values.
///
/// Timestamps are non-decreasing (duplicates allowed) and non-negative, and
/// there is exactly one value per timestamp. These are checked on
/// construction; every transform builds a new `Series`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    id: u32,
    name: String,
    label: String,
    timestamps: Vec<i64>,
    values: Vec<f64>,
    #[serde(skip)]
    outliers_removed: bool,
}

impl Series {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        label: impl Into<String>,
        timestamps: Vec<i64>,
        values: Vec<f64>,
    ) -> Result<Self> {
        validate(&timestamps, &values)?;
        Ok(Self {
            id,
            name: name.into(),
            label: label.into(),
            timestamps,
            values,
            outliers_removed: false,
        })
    }

    /// An anonymous series, handy for computed data.
    pub fn from_samples(timestamps: Vec<i64>, values: Vec<f64>) -> Result<Self> {
        Self::new(0, "", "", timestamps, values)
    }

    /// New samples under this series' identity.
    pub fn with_samples(&self, timestamps: Vec<i64>, values: Vec<f64>) -> Result<Self> {
        Self::new(self.id, self.name.clone(), self.label.clone(), timestamps, values)
    }

    pub(crate) fn mark_outliers_removed(mut self) -> Self {
        self.outliers_removed = true;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn outliers_removed(&self) -> bool {
        self.outliers_removed
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<i64> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.timestamps.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    pub(crate) fn require_non_empty(&self, op: &str) -> Result<()> {
        if self.is_empty() {
            return Err(CanlogError::EmptySeries(format!(
                "{} on '{}' (id {})",
                op,
                self.display_name(),
                self.id
            )));
        }
        Ok(())
    }

    pub(crate) fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.label
        } else {
            &self.name
        }
    }

    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            label: self.label.clone(),
            timestamps: self.timestamps.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
            outliers_removed: false,
        }
    }

    /// Samples for which `keep` holds. A subset of a valid series is valid.
    pub(crate) fn retain(&self, keep: impl Fn(i64, f64) -> bool) -> Self {
        let (timestamps, values): (Vec<i64>, Vec<f64>) =
            self.iter().filter(|&(t, v)| keep(t, v)).unzip();
        Self {
            id: self.id,
            name: self.name.clone(),
            label: self.label.clone(),
            timestamps,
            values,
            outliers_removed: false,
        }
    }

    /// Drop samples whose value is NaN.
    pub fn drop_nan(&self) -> Self {
        self.retain(|_, v| !v.is_nan())
    }

    pub fn powf(&self, exponent: f64) -> Self {
        self.map_values(|v| v.powf(exponent))
    }

    pub fn pow(&self, other: &Series) -> Result<Self> {
        combine(self, other, f64::powf, Alignment::default())
    }

    /// Divide by `other`, substituting NaN wherever the aligned divisor is zero.
    pub fn checked_div(&self, other: &Series) -> Result<Quotient> {
        let zero_divisions = std::cell::Cell::new(0usize);
        let series = combine(
            self,
            other,
            |a, b| {
                if b == 0.0 {
                    zero_divisions.set(zero_divisions.get() + 1);
                    f64::NAN
                } else {
                    a / b
                }
            },
            Alignment::default(),
        )?;

        Ok(Quotient {
            series,
            zero_divisions: zero_divisions.get(),
        })
    }
}

/// Result of [`Series::checked_div`].
#[derive(Debug, Clone)]
pub struct Quotient {
    pub series: Series,
    /// Aligned points whose divisor was zero; their values are NaN.
    pub zero_divisions: usize,
}

fn validate(timestamps: &[i64], values: &[f64]) -> Result<()> {
    if timestamps.len() != values.len() {
        return Err(CanlogError::InvalidSeries(format!(
            "{} timestamps but {} values",
            timestamps.len(),
            values.len()
        )));
    }
    if let Some(&first) = timestamps.first() {
        if first < 0 {
            return Err(CanlogError::InvalidSeries(format!(
                "negative timestamp {}",
                first
            )));
        }
    }
    if let Some(i) = timestamps.windows(2).position(|w| w[1] < w[0]) {
        return Err(CanlogError::InvalidSeries(format!(
            "timestamps decrease at index {} ({} -> {})",
            i + 1,
            timestamps[i],
            timestamps[i + 1]
        )));
    }
    Ok(())
}

macro_rules! series_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&Series> for &Series {
            type Output = Result<Series>;

            fn $method(self, rhs: &Series) -> Result<Series> {
                combine(self, rhs, |a, b| a $op b, Alignment::default())
            }
        }

        impl $trait<f64> for &Series {
            type Output = Series;

            fn $method(self, rhs: f64) -> Series {
                self.map_values(|v| v $op rhs)
            }
        }
    };
}

series_binary_op!(Add, add, +);
series_binary_op!(Sub, sub, -);
series_binary_op!(Mul, mul, *);
series_binary_op!(Div, div, /);

impl Neg for &Series {
    type Output = Series;

    fn neg(self) -> Series {
        self.map_values(|v| -v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn series(ts: &[i64], vals: &[f64]) -> Series {
        Series::new(3, "pcm.torque", "Torque", ts.to_vec(), vals.to_vec()).unwrap()
    }

    #[test]
    fn test_invariants_checked_on_construction() {
        assert!(matches!(
            Series::from_samples(vec![0, 1], vec![1.0]),
            Err(CanlogError::InvalidSeries(_))
        ));
        assert!(matches!(
            Series::from_samples(vec![5, 4], vec![1.0, 2.0]),
            Err(CanlogError::InvalidSeries(_))
        ));
        assert!(matches!(
            Series::from_samples(vec![-1, 4], vec![1.0, 2.0]),
            Err(CanlogError::InvalidSeries(_))
        ));
        // duplicates are fine
        assert!(Series::from_samples(vec![4, 4, 5], vec![1.0, 2.0, 3.0]).is_ok());
        assert!(Series::from_samples(vec![], vec![]).is_ok());
    }

    #[test]
    fn test_scalar_ops_keep_timestamps() {
        let s = series(&[0, 10, 20], &[1.0, 2.0, 3.0]);
        let doubled = &s * 2.0;
        assert_eq!(doubled.timestamps(), s.timestamps());
        assert_eq!(doubled.values(), &[2.0, 4.0, 6.0]);
        assert_eq!((&s + 1.0).values(), &[2.0, 3.0, 4.0]);
        assert_eq!((-&s).values(), &[-1.0, -2.0, -3.0]);
        assert_eq!(s.powf(2.0).values(), &[1.0, 4.0, 9.0]);
        assert_eq!(doubled.id(), 3);
        // input untouched
        assert_eq!(s.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_series_ops_align_on_union() {
        let a = series(&[0, 10, 20], &[0.0, 10.0, 20.0]);
        let b = Series::new(9, "other", "Other", vec![5, 15], vec![1.0, 1.0]).unwrap();

        let sum = (&a + &b).unwrap();
        // union [0,5,10,15,20], b is missing outside [5,15]
        assert_eq!(sum.timestamps(), &[5, 10, 15]);
        assert_eq!(sum.values(), &[6.0, 11.0, 16.0]);
        assert_eq!(sum.id(), 3);
        assert_eq!(sum.label(), "Torque");

        let diff = (&a - &a).unwrap();
        assert!(diff.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_series_op_on_empty_fails() {
        let a = series(&[0, 10], &[1.0, 2.0]);
        let empty = Series::from_samples(vec![], vec![]).unwrap();
        assert!(matches!(&a * &empty, Err(CanlogError::EmptySeries(_))));
    }

    #[test]
    fn test_division_by_aligned_zero() {
        let a = series(&[0, 10, 20], &[4.0, 4.0, 4.0]);
        let b = series(&[0, 10, 20], &[2.0, 0.0, 4.0]);

        // raw operator follows IEEE and never fails
        let raw = (&a / &b).unwrap();
        assert!(raw.values()[1].is_infinite());

        let q = a.checked_div(&b).unwrap();
        assert_eq!(q.zero_divisions, 1);
        assert_relative_eq!(q.series.values()[0], 2.0);
        assert!(q.series.values()[1].is_nan());

        let cleaned = q.series.drop_nan();
        assert_eq!(cleaned.timestamps(), &[0, 20]);
        assert_eq!(cleaned.values(), &[2.0, 1.0]);
    }

    #[test]
    fn test_pow_series() {
        let a = series(&[0, 10], &[2.0, 3.0]);
        let b = series(&[0, 10], &[3.0, 2.0]);
        assert_eq!(a.pow(&b).unwrap().values(), &[8.0, 9.0]);
    }
}
