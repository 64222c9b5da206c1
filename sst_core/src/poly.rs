//! Polynomial evaluation and least-squares fitting.
//!
//! Coefficients are stored lowest order first throughout, matching the
//! shock→wheel coefficient layout of the processed artifact.

use eyre::eyre;
use nalgebra::{DMatrix, DVector};

use crate::error::Result;

/// A dense polynomial evaluated with Horner's method.
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    /// Coefficients lowest order first; an empty slice is the zero polynomial.
    pub fn new(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn at(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }
}

/// Least-squares fit of `ys` as a degree-`degree` polynomial in `xs`,
/// solved through the SVD pseudo-inverse. Rank-deficient systems (fewer
/// points than coefficients) still yield the minimum-norm solution.
pub fn polyfit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>> {
    if xs.len() != ys.len() || xs.is_empty() {
        return Err(eyre!(
            "polynomial fit needs equally sized, non-empty inputs (got {} and {})",
            xs.len(),
            ys.len()
        ));
    }
    let design = DMatrix::from_fn(xs.len(), degree + 1, |i, k| xs[i].powi(k as i32));
    let rhs = DVector::from_column_slice(ys);
    let coeffs = design
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(|e| eyre!("least-squares solve failed: {e}"))?;
    Ok(coeffs.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horner_matches_direct_evaluation() {
        let p = Polynomial::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(p.at(0.0), 1.0);
        assert_eq!(p.at(2.0), 1.0 + 4.0 + 12.0);
        assert_eq!(Polynomial::new(vec![]).at(5.0), 0.0);
    }

    #[test]
    fn cubic_fit_recovers_exact_coefficients() {
        let xs: Vec<f64> = (0..8).map(f64::from).collect();
        let ys: Vec<f64> = xs
            .iter()
            .map(|&x| 2.0 + 3.0 * x - x * x + 0.5 * x * x * x)
            .collect();
        let coeffs = polyfit(&xs, &ys, 3).unwrap();
        let expected = [2.0, 3.0, -1.0, 0.5];
        for (c, e) in coeffs.iter().zip(expected) {
            assert!((c - e).abs() < 1e-8, "got {coeffs:?}");
        }
    }

    #[test]
    fn linear_data_fits_a_degenerate_cubic() {
        let xs = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];
        let ys = [0.0, 10.0, 20.0, 30.0];
        let coeffs = polyfit(&xs, &ys, 3).unwrap();
        let p = Polynomial::new(coeffs);
        assert!((p.at(0.5) - 15.0).abs() < 1e-6);
        assert!((p.at(1.0) - 30.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        assert!(polyfit(&[0.0, 1.0], &[0.0], 3).is_err());
        assert!(polyfit(&[], &[], 3).is_err());
    }
}
