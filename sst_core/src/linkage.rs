//! Frame linkage kinematics: from a measured leverage-ratio table to the
//! cubic polynomial mapping shock travel to rear wheel travel.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LinkageError, Result};
use crate::poly::{Polynomial, polyfit};

/// One row of the leverage table with its cumulative shock travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkageRecord {
    pub shock_travel: f64,
    pub wheel_travel: f64,
    pub leverage_ratio: f64,
}

/// Suspension geometry of one bike frame.
///
/// The raw table is plain text, one `wheel_travel_mm,leverage_ratio` pair
/// per line; rows that do not parse as two floats are skipped. `process_raw`
/// derives everything downstream needs: the ordered leverage pairs, the
/// shock→wheel polynomial coefficients (lowest order first) and the two
/// maximum travel values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Linkage {
    #[serde(default)]
    pub name: String,
    pub head_angle: f64,
    #[serde(rename = "data")]
    pub raw_data: String,
    #[serde(rename = "front_stroke")]
    pub max_front_stroke: f64,
    #[serde(rename = "rear_stroke")]
    pub max_rear_stroke: f64,
    #[serde(skip_deserializing)]
    pub leverage_ratio: Vec<[f64; 2]>,
    #[serde(skip_deserializing)]
    pub shock_wheel_coeffs: Vec<f64>,
    #[serde(skip_deserializing)]
    pub max_front_travel: f64,
    #[serde(skip_deserializing)]
    pub max_rear_travel: f64,
    #[serde(skip)]
    polynomial: Option<Polynomial>,
}

impl Linkage {
    pub fn new(
        name: &str,
        head_angle: f64,
        raw_data: &str,
        max_front_stroke: f64,
        max_rear_stroke: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            head_angle,
            raw_data: raw_data.to_string(),
            max_front_stroke,
            max_rear_stroke,
            ..Self::default()
        }
    }

    /// Parse the raw leverage text and derive the kinematic model. The
    /// cumulative shock travel starts at zero and each row advances it by
    /// the reciprocal of the previous row's leverage ratio.
    pub fn process_raw(&mut self) -> Result<()> {
        let mut records = Vec::new();
        let mut shock_travel = 0.0;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(self.raw_data.as_bytes());
        for row in reader.records() {
            let Ok(row) = row else { continue };
            let (Some(w), Some(l)) = (row.get(0), row.get(1)) else {
                continue;
            };
            let (Ok(wheel_travel), Ok(leverage_ratio)) = (w.parse::<f64>(), l.parse::<f64>())
            else {
                continue;
            };
            if leverage_ratio <= 0.0 {
                return Err(LinkageError::NonPositiveLeverage(leverage_ratio).into());
            }
            records.push(LinkageRecord {
                shock_travel,
                wheel_travel,
                leverage_ratio,
            });
            shock_travel += 1.0 / leverage_ratio;
        }
        self.process(&records)
    }

    /// Derive the kinematic model from structured leverage records. Tables
    /// with fewer than four rows still produce coefficients through the
    /// pseudo-inverse, but a cubic fit is ill-posed there and the resulting
    /// polynomial is undefined behaviourally.
    pub fn process(&mut self, records: &[LinkageRecord]) -> Result<()> {
        if records.is_empty() {
            return Err(LinkageError::NoValidRows.into());
        }

        let shock: Vec<f64> = records.iter().map(|r| r.shock_travel).collect();
        let wheel: Vec<f64> = records.iter().map(|r| r.wheel_travel).collect();
        self.leverage_ratio = records
            .iter()
            .map(|r| [r.wheel_travel, r.leverage_ratio])
            .collect();

        self.shock_wheel_coeffs = polyfit(&shock, &wheel, 3)?;
        let polynomial = Polynomial::new(self.shock_wheel_coeffs.clone());
        self.max_rear_travel = polynomial.at(self.max_rear_stroke);
        self.max_front_travel =
            (self.head_angle * std::f64::consts::PI / 180.0).sin() * self.max_front_stroke;
        self.polynomial = Some(polynomial);

        debug!(
            rows = records.len(),
            max_front_travel = self.max_front_travel,
            max_rear_travel = self.max_rear_travel,
            "fitted shock-wheel polynomial"
        );
        Ok(())
    }

    /// The fitted shock→wheel polynomial; available after `process`.
    pub(crate) fn polynomial(&self) -> Option<&Polynomial> {
        self.polynomial.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linkage(raw: &str) -> Linkage {
        Linkage::new("test frame", 90.0, raw, 60.0, 1.0)
    }

    #[test]
    fn invalid_rows_are_skipped() {
        let mut lnk = linkage("begin\n\n0,3\n10 , 3\nnot,numeric\n20,3\n30,3\n");
        lnk.process_raw().unwrap();
        assert_eq!(lnk.leverage_ratio.len(), 4);
        assert_eq!(lnk.leverage_ratio[1], [10.0, 3.0]);
    }

    #[test]
    fn constant_leverage_gives_a_linear_polynomial() {
        // Four rows at leverage 3: the shock grid is [0, 1/3, 2/3, 1] and
        // wheel travel is 30 * shock travel.
        let mut lnk = linkage("0,3\n10,3\n20,3\n30,3");
        lnk.process_raw().unwrap();
        let expected = [0.0, 30.0, 0.0, 0.0];
        for (c, e) in lnk.shock_wheel_coeffs.iter().zip(expected) {
            assert!((c - e).abs() < 1e-6, "got {:?}", lnk.shock_wheel_coeffs);
        }
        // One unit of shock stroke maps to the full 30 mm of wheel travel.
        assert!((lnk.max_rear_travel - 30.0).abs() < 1e-6);
        // Vertical head tube: front travel equals front stroke.
        assert!((lnk.max_front_travel - 60.0).abs() < 1e-9);
    }

    #[test]
    fn head_angle_projects_front_travel() {
        let mut lnk = linkage("0,3\n10,3\n20,3\n30,3");
        lnk.head_angle = 30.0;
        lnk.process_raw().unwrap();
        assert!((lnk.max_front_travel - 30.0).abs() < 1e-9);
    }

    #[test]
    fn empty_table_is_an_error() {
        let mut lnk = linkage("no numbers here\n\n");
        let err = lnk.process_raw().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LinkageError>(),
            Some(LinkageError::NoValidRows)
        ));
    }

    #[test]
    fn zero_leverage_is_an_error() {
        let mut lnk = linkage("0,3\n10,0\n20,3");
        let err = lnk.process_raw().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LinkageError>(),
            Some(LinkageError::NonPositiveLeverage(_))
        ));
    }

    #[test]
    fn structured_records_are_accepted() {
        let records: Vec<LinkageRecord> = (0..5)
            .map(|i| LinkageRecord {
                shock_travel: f64::from(i) * 0.5,
                wheel_travel: f64::from(i) * 1.2,
                leverage_ratio: 2.4,
            })
            .collect();
        let mut lnk = linkage("");
        lnk.max_rear_stroke = 2.0;
        lnk.process(&records).unwrap();
        assert!((lnk.max_rear_travel - 4.8).abs() < 1e-6);
    }
}
