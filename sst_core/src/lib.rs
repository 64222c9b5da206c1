#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core processing for mountain-bike suspension telemetry.
//!
//! Turns raw angular sensor counts into a processed session artifact:
//! linear travel, velocity, segmented strokes, airtimes and the histogram
//! data downstream tuning tools work with. The crate owns no I/O; raw
//! sample decoding lives in `sst_format` and the host decides how the
//! artifact is serialized.
//!
//! ## Architecture
//!
//! - **Expression language**: compiled arithmetic programs for user-defined
//!   calibrations (`expression` module)
//! - **Calibration**: raw count → linear stroke displacement (`calibration`)
//! - **Linkage**: leverage-ratio table → shock-to-wheel polynomial (`linkage`,
//!   `poly`)
//! - **Velocity**: Savitzky-Golay smoothed differentiation (`velocity`)
//! - **Strokes**: compression/rebound/idling segmentation (`stroke`)
//! - **Airtimes**: cross-side idling correlation (`airtime`)
//! - **Session**: the pipeline orchestrator (`session`)
//!
//! Processing is synchronous and allocation is O(N) in the sample count;
//! hosts parallelize across sessions, not within one.

pub mod airtime;
pub mod calibration;
pub mod digitize;
pub mod error;
pub mod expression;
pub mod linkage;
pub mod poly;
pub mod session;
pub mod stroke;
pub mod velocity;

pub use airtime::Airtime;
pub use calibration::{Calibration, CalibrationMethod, load_calibrations};
pub use error::{
    CalibrationError, ExpressionError, LinkageError, Report, Result, SessionError,
};
pub use linkage::{Linkage, LinkageRecord};
pub use session::{Meta, Processed, SetupData, Suspension, process_recording};
pub use stroke::{Stroke, StrokeStat, Strokes};

pub const VELOCITY_ZERO_THRESHOLD: f64 = 0.02; // (mm/s) maximum velocity considered zero
pub const IDLING_DURATION_THRESHOLD: f64 = 0.10; // (s) minimum duration of an idle period
pub const AIRTIME_DURATION_THRESHOLD: f64 = 0.20; // (s) minimum duration of an airtime
pub const AIRTIME_VELOCITY_THRESHOLD: f64 = 500.0; // (mm/s) minimum peak velocity after an airtime
pub const AIRTIME_OVERLAP_THRESHOLD: f64 = 0.5; // required overlap between f&r airtime candidates
pub const AIRTIME_TRAVEL_MEAN_THRESHOLD_RATIO: f64 = 0.04; // mean travel below max*this may still be airtime
pub const STROKE_LENGTH_THRESHOLD: f64 = 5.0; // (mm) minimum length of a compression/rebound
pub const TRAVEL_HIST_BINS: usize = 20; // number of travel histogram bins
pub const VELOCITY_HIST_STEP: f64 = 100.0; // (mm/s) coarse velocity histogram bin step
pub const VELOCITY_HIST_STEP_FINE: f64 = 15.0; // (mm/s) fine velocity histogram bin step
pub const BOTTOMOUT_THRESHOLD: f64 = 3.0; // (mm) bottomouts are regions with travel > max - this

pub(crate) const SAVGOL_WINDOW: usize = 51;
pub(crate) const SAVGOL_POLY_ORDER: usize = 3;
