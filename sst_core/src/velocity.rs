//! Suspension velocity estimation.
//!
//! The travel series is sampled on a regular grid, so the first derivative
//! is computed with a Savitzky-Golay filter: fit a low-order polynomial over
//! a sliding window and take its analytic derivative at the sample position.
//! The convolution weights depend only on (window, polynomial order) and are
//! precomputed once per filter. Near the boundaries the same fitted window
//! is reused with the derivative evaluated off-center, instead of padding or
//! reflecting the signal.

use eyre::eyre;
use nalgebra::DMatrix;

use crate::error::Result;

/// Savitzky-Golay first-derivative filter with shifted-window edge handling.
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window: usize,
    half: usize,
    poly_order: usize,
    /// One weight row per evaluation offset in `-half..=half`, indexed by
    /// `offset + half`; the center row is the classic smoothing-derivative
    /// kernel.
    weights: Vec<Vec<f64>>,
}

impl SavitzkyGolay {
    pub fn new(window: usize, poly_order: usize) -> Result<Self> {
        if window % 2 == 0 || window < 3 {
            return Err(eyre!("window length must be odd and at least 3, got {window}"));
        }
        if poly_order + 1 >= window {
            return Err(eyre!(
                "polynomial order {poly_order} does not fit a window of {window}"
            ));
        }
        let half = window / 2;

        // Design matrix over window positions -half..=half; its pseudo-inverse
        // maps window samples to fitted polynomial coefficients.
        let design = DMatrix::from_fn(window, poly_order + 1, |i, k| {
            (i as f64 - half as f64).powi(k as i32)
        });
        let pinv = design
            .pseudo_inverse(1e-12)
            .map_err(|e| eyre!("failed to invert the filter design matrix: {e}"))?;

        let mut weights = Vec::with_capacity(window);
        for offset in 0..window {
            let x0 = offset as f64 - half as f64;
            let mut row = vec![0.0; window];
            for (j, w) in row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for k in 1..=poly_order {
                    acc += k as f64 * x0.powi(k as i32 - 1) * pinv[(k, j)];
                }
                *w = acc;
            }
            weights.push(row);
        }

        Ok(Self {
            window,
            half,
            poly_order,
            weights,
        })
    }

    /// First derivative of `y` scaled by `sample_rate`, i.e. units per
    /// second for a series sampled at `sample_rate` Hz. Inputs shorter than
    /// the window fall back to a reduced window, and ultimately to two-point
    /// finite differences.
    pub fn differentiate(&self, y: &[f64], sample_rate: f64) -> Vec<f64> {
        let n = y.len();
        if n >= self.window {
            return self.apply(y, sample_rate);
        }
        let reduced = if n % 2 == 1 { n } else { n.saturating_sub(1) };
        if reduced >= 5 && reduced > self.poly_order + 1 {
            if let Ok(filter) = Self::new(reduced, self.poly_order) {
                return filter.apply(y, sample_rate);
            }
        }
        finite_differences(y, sample_rate)
    }

    fn apply(&self, y: &[f64], sample_rate: f64) -> Vec<f64> {
        let n = y.len();
        let mut out = vec![0.0; n];
        for (i, o) in out.iter_mut().enumerate() {
            let (row, base) = if i < self.half {
                (i, 0)
            } else if i >= n - self.half {
                (i - (n - self.window), n - self.window)
            } else {
                (self.half, i - self.half)
            };
            let mut acc = 0.0;
            for (w, &v) in self.weights[row].iter().zip(&y[base..base + self.window]) {
                acc += w * v;
            }
            *o = acc * sample_rate;
        }
        out
    }
}

fn finite_differences(y: &[f64], sample_rate: f64) -> Vec<f64> {
    let n = y.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    (y[1] - y[0]) * sample_rate
                } else if i == n - 1 {
                    (y[n - 1] - y[n - 2]) * sample_rate
                } else {
                    (y[i + 1] - y[i - 1]) / 2.0 * sample_rate
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_series_has_constant_derivative() {
        let filter = SavitzkyGolay::new(51, 3).unwrap();
        let y: Vec<f64> = (0..200).map(|i| 2.0 * i as f64).collect();
        let v = filter.differentiate(&y, 1000.0);
        assert_eq!(v.len(), y.len());
        for (i, &vi) in v.iter().enumerate() {
            assert!((vi - 2000.0).abs() < 1e-6, "index {i}: {vi}");
        }
    }

    #[test]
    fn quadratic_series_is_exact_including_edges() {
        let filter = SavitzkyGolay::new(51, 3).unwrap();
        let y: Vec<f64> = (0..120).map(|i| 0.01 * (i as f64) * (i as f64)).collect();
        let v = filter.differentiate(&y, 100.0);
        for (i, &vi) in v.iter().enumerate() {
            let expected = 0.02 * i as f64 * 100.0;
            assert!(
                (vi - expected).abs() < 1e-6,
                "index {i}: got {vi}, expected {expected}"
            );
        }
    }

    #[test]
    fn short_series_reduce_the_window() {
        let filter = SavitzkyGolay::new(51, 3).unwrap();
        let y: Vec<f64> = (0..10).map(|i| 3.0 * i as f64).collect();
        let v = filter.differentiate(&y, 1.0);
        for &vi in &v {
            assert!((vi - 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn tiny_series_use_finite_differences() {
        let filter = SavitzkyGolay::new(51, 3).unwrap();
        let v = filter.differentiate(&[0.0, 1.0, 4.0], 1.0);
        assert_eq!(v, vec![1.0, 2.0, 4.0 - 1.0]);
        assert_eq!(filter.differentiate(&[], 1.0), Vec::<f64>::new());
        assert_eq!(filter.differentiate(&[5.0], 1.0), vec![0.0]);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(SavitzkyGolay::new(50, 3).is_err());
        assert!(SavitzkyGolay::new(5, 4).is_err());
        assert!(SavitzkyGolay::new(1, 0).is_err());
    }
}
