//! Stroke segmentation and classification.
//!
//! The travel series is cut into maximal runs of constant velocity sign
//! (with a small dead band around zero), then each run is classified as a
//! compression, a rebound, or an idling period. Idling periods that look
//! like the wheels leaving the ground are tagged as airtime candidates and
//! resolved later against the other side.

use serde::Serialize;

use crate::{
    AIRTIME_DURATION_THRESHOLD, AIRTIME_OVERLAP_THRESHOLD, AIRTIME_VELOCITY_THRESHOLD,
    BOTTOMOUT_THRESHOLD, IDLING_DURATION_THRESHOLD, STROKE_LENGTH_THRESHOLD,
    VELOCITY_ZERO_THRESHOLD,
};

/// Summary statistics over one stroke's sample range.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrokeStat {
    pub sum_travel: f64,
    pub max_travel: f64,
    pub min_travel: f64,
    pub sum_velocity: f64,
    pub max_velocity: f64,
    pub min_velocity: f64,
    pub bottomouts: usize,
    pub count: usize,
}

/// A contiguous, monotonically-signed interval of the travel series.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stroke {
    pub start: usize,
    pub end: usize,
    pub stat: StrokeStat,
    pub digitized_travel: Vec<usize>,
    pub digitized_velocity: Vec<usize>,
    pub digitized_velocity_fine: Vec<usize>,
    #[serde(skip)]
    pub(crate) length: f64,
    #[serde(skip)]
    pub(crate) duration: f64,
    #[serde(skip)]
    pub(crate) air_candidate: bool,
}

impl Stroke {
    fn new(
        start: usize,
        end: usize,
        duration: f64,
        travel: &[f64],
        velocity: &[f64],
        max_travel: f64,
    ) -> Self {
        let t = &travel[start..=end];
        let v = &velocity[start..=end];
        let mut stat = StrokeStat {
            sum_travel: t.iter().sum(),
            max_travel: f64::MIN,
            min_travel: f64::MAX,
            sum_velocity: v.iter().sum(),
            max_velocity: f64::MIN,
            min_velocity: f64::MAX,
            bottomouts: 0,
            count: end - start + 1,
        };
        for &x in t {
            stat.max_travel = stat.max_travel.max(x);
            stat.min_travel = stat.min_travel.min(x);
        }
        for &x in v {
            stat.max_velocity = stat.max_velocity.max(x);
            stat.min_velocity = stat.min_velocity.min(x);
        }

        // Count contiguous bottom-out regions inside the stroke.
        let threshold = max_travel - BOTTOMOUT_THRESHOLD;
        let mut i = 0;
        while i < t.len() {
            if t[i] > threshold {
                stat.bottomouts += 1;
                while i < t.len() && t[i] > threshold {
                    i += 1;
                }
            } else {
                i += 1;
            }
        }

        Self {
            start,
            end,
            stat,
            digitized_travel: Vec::new(),
            digitized_velocity: Vec::new(),
            digitized_velocity_fine: Vec::new(),
            length: travel[end] - travel[start],
            duration,
            air_candidate: false,
        }
    }

    /// Signed travel difference between the last and first sample, in mm.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Stroke duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// The signed peak velocity: for rebound strokes the "maximum" is the
    /// most negative velocity.
    pub fn peak_velocity(&self) -> f64 {
        if self.length < 0.0 {
            self.stat.min_velocity
        } else {
            self.stat.max_velocity
        }
    }

    /// Two idling intervals overlap enough to be the same airborne period if
    /// the shared sample span covers at least half of the longer interval.
    pub(crate) fn overlaps(&self, other: &Stroke) -> bool {
        let longer = (self.end - self.start).max(other.end - other.start) as f64;
        let s = self.start.max(other.start) as f64;
        let e = self.end.min(other.end) as f64;
        e - s >= AIRTIME_OVERLAP_THRESHOLD * longer
    }
}

/// Strokes of one suspension side, grouped by class.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Strokes {
    pub compressions: Vec<Stroke>,
    pub rebounds: Vec<Stroke>,
    #[serde(skip)]
    pub(crate) idlings: Vec<Stroke>,
}

impl Strokes {
    /// Classify candidate strokes. Short low-displacement intervals that
    /// last long enough become idlings; the rest split into compressions
    /// and rebounds by signed length. Idlings sandwiched between strokes,
    /// staying near full extension long enough and followed by a violent
    /// stroke are tagged as airtime candidates for cross-side confirmation.
    pub(crate) fn categorize(&mut self, strokes: Vec<Stroke>) {
        let n = strokes.len();
        let mut candidate = vec![false; n];
        for (i, stroke) in strokes.iter().enumerate() {
            if i > 0
                && i + 1 < n
                && stroke.stat.max_travel <= STROKE_LENGTH_THRESHOLD
                && stroke.duration >= AIRTIME_DURATION_THRESHOLD
                && strokes[i + 1].peak_velocity().abs() >= AIRTIME_VELOCITY_THRESHOLD
            {
                candidate[i] = true;
            }
        }

        for (i, mut stroke) in strokes.into_iter().enumerate() {
            if stroke.length.abs() < STROKE_LENGTH_THRESHOLD
                && stroke.duration >= IDLING_DURATION_THRESHOLD
            {
                stroke.air_candidate = candidate[i];
                self.idlings.push(stroke);
            } else if stroke.length >= STROKE_LENGTH_THRESHOLD {
                self.compressions.push(stroke);
            } else if stroke.length <= -STROKE_LENGTH_THRESHOLD {
                self.rebounds.push(stroke);
            }
        }
    }

    /// Attach the per-stroke histogram index subranges.
    pub(crate) fn digitize(&mut self, travel: &[usize], velocity: &[usize], velocity_fine: &[usize]) {
        for stroke in self
            .compressions
            .iter_mut()
            .chain(self.rebounds.iter_mut())
        {
            stroke.digitized_travel = travel[stroke.start..=stroke.end].to_vec();
            stroke.digitized_velocity = velocity[stroke.start..=stroke.end].to_vec();
            stroke.digitized_velocity_fine = velocity_fine[stroke.start..=stroke.end].to_vec();
        }
    }
}

fn sign(v: f64) -> i8 {
    if v.abs() <= VELOCITY_ZERO_THRESHOLD {
        0
    } else if v < 0.0 {
        -1
    } else {
        1
    }
}

/// Split the series into maximal constant-sign velocity runs. Top-out
/// periods oscillate around zero and would split into many short strokes;
/// consecutive runs whose travel stays below the stroke threshold are
/// merged back together. The emitted ranges partition `[0, N-1]`.
pub(crate) fn filter_strokes(
    velocity: &[f64],
    travel: &[f64],
    max_travel: f64,
    rate: u16,
) -> Vec<Stroke> {
    let n = velocity.len();
    let mut strokes: Vec<Stroke> = Vec::new();
    let mut i = 0;
    while i < n {
        let start = i;
        let run_sign = sign(velocity[i]);
        while i + 1 < n && sign(velocity[i + 1]) == run_sign {
            i += 1;
        }

        let duration = (i - start + 1) as f64 / f64::from(rate.max(1));
        let pos_max = travel[start..=i].iter().copied().fold(f64::MIN, f64::max);
        let merge = pos_max < STROKE_LENGTH_THRESHOLD
            && strokes
                .last()
                .is_some_and(|prev| prev.stat.max_travel < STROKE_LENGTH_THRESHOLD);
        if merge {
            if let Some(prev) = strokes.last_mut() {
                prev.end = i;
                prev.duration += duration;
            }
        } else {
            strokes.push(Stroke::new(start, i, duration, travel, velocity, max_travel));
        }
        i += 1;
    }
    strokes
}
