//! Session processing: the top-level pipeline turning raw per-side sample
//! sequences into the processed artifact.
//!
//! Each side goes through calibration, geometric mapping (sine projection
//! for the fork, the linkage polynomial for the shock), clamping, travel and
//! velocity digitization, stroke segmentation and classification. Airtime
//! detection then correlates the two sides.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::airtime::{Airtime, detect_airtimes};
use crate::calibration::Calibration;
use crate::digitize::{digitize, digitize_velocity, linspace};
use crate::error::{Result, SessionError};
use crate::linkage::Linkage;
use crate::stroke::{Strokes, filter_strokes};
use crate::velocity::SavitzkyGolay;
use crate::{
    SAVGOL_POLY_ORDER, SAVGOL_WINDOW, TRAVEL_HIST_BINS, VELOCITY_HIST_STEP,
    VELOCITY_HIST_STEP_FINE,
};

/// Recording metadata from the SST header plus the host-supplied ride name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub name: String,
    pub version: u8,
    pub sample_rate: u16,
    pub timestamp: i64,
}

/// Everything the pipeline needs besides the samples themselves: the frame
/// geometry and one prepared calibration per side.
#[derive(Debug, Clone)]
pub struct SetupData {
    pub linkage: Linkage,
    pub front_calibration: Calibration,
    pub rear_calibration: Calibration,
}

/// Processed state of one suspension side.
#[derive(Debug, Clone, Serialize)]
pub struct Suspension {
    pub present: bool,
    pub calibration: Calibration,
    /// Linear travel in mm, clamped to `[0, max_travel]`.
    pub travel: Vec<f64>,
    /// Travel velocity in mm/s.
    pub velocity: Vec<f64>,
    pub strokes: Strokes,
    pub travel_bins: Vec<f64>,
    pub velocity_bins: Vec<f64>,
    pub fine_velocity_bins: Vec<f64>,
}

impl Suspension {
    pub(crate) fn new(calibration: Calibration) -> Self {
        Self {
            present: false,
            calibration,
            travel: Vec::new(),
            velocity: Vec::new(),
            strokes: Strokes::default(),
            travel_bins: Vec::new(),
            velocity_bins: Vec::new(),
            fine_velocity_bins: Vec::new(),
        }
    }

    /// Run the whole per-side pipeline over calibrated samples. `map`
    /// converts calibration output to wheel/crown travel; sides where
    /// nothing but noise remains are demoted to not-present.
    fn process(
        &mut self,
        samples: impl Iterator<Item = f64>,
        map: impl Fn(f64) -> f64,
        max_travel: f64,
        filter: &SavitzkyGolay,
        rate: u16,
    ) -> Result<()> {
        // Sensor glitches (a broken connection mid-ride, leverage tables
        // measured slightly off, polynomial overshoot) produce travel
        // outside the physical range; those samples are clamped, not
        // rejected, and show up plainly on the graphs.
        self.travel = samples
            .map(|s| {
                let out = self.calibration.evaluate(s)?;
                Ok(map(out).max(0.0).min(max_travel))
            })
            .collect::<Result<Vec<f64>>>()?;

        let travel_bins = linspace(0.0, max_travel, TRAVEL_HIST_BINS + 1);
        let digitized_travel = digitize(&self.travel, &travel_bins);
        self.travel_bins = travel_bins;

        self.velocity = filter.differentiate(&self.travel, f64::from(rate));
        let (velocity_bins, digitized_velocity) =
            digitize_velocity(&self.velocity, VELOCITY_HIST_STEP);
        self.velocity_bins = velocity_bins;
        let (fine_bins, digitized_fine) =
            digitize_velocity(&self.velocity, VELOCITY_HIST_STEP_FINE);
        self.fine_velocity_bins = fine_bins;

        let strokes = filter_strokes(&self.velocity, &self.travel, max_travel, rate);
        trace!(runs = strokes.len(), "segmented velocity sign runs");
        self.strokes.categorize(strokes);

        if self.strokes.compressions.is_empty() && self.strokes.rebounds.is_empty() {
            // Nothing but noise on this channel.
            self.present = false;
        } else {
            self.strokes
                .digitize(&digitized_travel, &digitized_velocity, &digitized_fine);
        }
        debug!(
            compressions = self.strokes.compressions.len(),
            rebounds = self.strokes.rebounds.len(),
            idlings = self.strokes.idlings.len(),
            present = self.present,
            "processed suspension side"
        );
        Ok(())
    }
}

/// The processed session artifact.
#[derive(Debug, Clone, Serialize)]
pub struct Processed {
    pub meta: Meta,
    pub front: Suspension,
    pub rear: Suspension,
    pub linkage: Linkage,
    pub airtimes: Vec<Airtime>,
}

/// Process one recording. `front` and `rear` are the raw angular count
/// sequences (an empty slice marks an absent side); `setup` must hold a
/// processed linkage and prepared calibrations.
pub fn process_recording<T>(
    front: &[T],
    rear: &[T],
    meta: Meta,
    setup: &SetupData,
) -> Result<Processed>
where
    T: Copy + Into<f64>,
{
    let mut pd = Processed {
        meta,
        front: Suspension::new(setup.front_calibration.clone()),
        rear: Suspension::new(setup.rear_calibration.clone()),
        linkage: setup.linkage.clone(),
        airtimes: Vec::new(),
    };

    pd.front.present = !front.is_empty();
    pd.rear.present = !rear.is_empty();
    if !(pd.front.present || pd.rear.present) {
        return Err(SessionError::MissingRecords.into());
    }
    if pd.front.present && pd.rear.present && front.len() != rear.len() {
        return Err(SessionError::RecordCountMismatch.into());
    }

    let filter = SavitzkyGolay::new(SAVGOL_WINDOW, SAVGOL_POLY_ORDER)?;
    let rate = pd.meta.sample_rate;

    if pd.front.present {
        let coeff = (pd.linkage.head_angle * std::f64::consts::PI / 180.0).sin();
        pd.front.process(
            front.iter().map(|&s| s.into()),
            |out| out * coeff,
            pd.linkage.max_front_travel,
            &filter,
            rate,
        )?;
    }
    if pd.rear.present {
        let polynomial = pd
            .linkage
            .polynomial()
            .ok_or_else(|| eyre::eyre!("linkage has not been processed"))?;
        pd.rear.process(
            rear.iter().map(|&s| s.into()),
            |out| polynomial.at(out),
            pd.linkage.max_rear_travel,
            &filter,
            rate,
        )?;
    }

    detect_airtimes(&mut pd);

    Ok(pd)
}
