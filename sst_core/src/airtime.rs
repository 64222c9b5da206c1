//! Airtime detection: correlating front and rear idling periods into
//! confirmed airborne intervals.

use serde::Serialize;
use tracing::debug;

use crate::AIRTIME_TRAVEL_MEAN_THRESHOLD_RATIO;
use crate::session::Processed;

/// One confirmed airborne interval, in seconds from session start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Airtime {
    pub start: f64,
    pub end: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Resolve airtime candidates. With both sides present, overlapping
/// candidate pairs are matched first (clearing their flags), then leftover
/// candidates survive on their own if the combined mean travel over their
/// span is low enough. With a single side present every candidate counts.
/// Output order: matched pairs, then front residuals, then rear residuals.
pub(crate) fn detect_airtimes(pd: &mut Processed) {
    let rate = f64::from(pd.meta.sample_rate.max(1));
    pd.airtimes.clear();

    let front = &mut pd.front;
    let rear = &mut pd.rear;
    if front.present && rear.present {
        for fi in 0..front.strokes.idlings.len() {
            if !front.strokes.idlings[fi].air_candidate {
                continue;
            }
            for ri in 0..rear.strokes.idlings.len() {
                if !rear.strokes.idlings[ri].air_candidate {
                    continue;
                }
                let f = &front.strokes.idlings[fi];
                let r = &rear.strokes.idlings[ri];
                if f.overlaps(r) {
                    let airtime = Airtime {
                        start: f.start.min(r.start) as f64 / rate,
                        end: f.end.min(r.end) as f64 / rate,
                    };
                    front.strokes.idlings[fi].air_candidate = false;
                    rear.strokes.idlings[ri].air_candidate = false;
                    pd.airtimes.push(airtime);
                    break;
                }
            }
        }

        // Candidates one side never confirmed can still be real airtime, for
        // example when the other sensor dropped out; accept them if the bike
        // sat near full extension for the whole span.
        let max_mean = (pd.linkage.max_front_travel + pd.linkage.max_rear_travel) / 2.0;
        let threshold = max_mean * AIRTIME_TRAVEL_MEAN_THRESHOLD_RATIO;
        for stroke in front
            .strokes
            .idlings
            .iter()
            .chain(rear.strokes.idlings.iter())
        {
            if !stroke.air_candidate {
                continue;
            }
            let span = stroke.start..=stroke.end;
            let fmean = mean(&front.travel[span.clone()]);
            let rmean = mean(&rear.travel[span]);
            if (fmean + rmean) / 2.0 <= threshold {
                pd.airtimes.push(Airtime {
                    start: stroke.start as f64 / rate,
                    end: stroke.end as f64 / rate,
                });
            }
        }
    } else {
        let single = if front.present {
            &front.strokes.idlings
        } else if rear.present {
            &rear.strokes.idlings
        } else {
            return;
        };
        for stroke in single {
            if stroke.air_candidate {
                pd.airtimes.push(Airtime {
                    start: stroke.start as f64 / rate,
                    end: stroke.end as f64 / rate,
                });
            }
        }
    }

    debug!(airtimes = pd.airtimes.len(), "airtime detection finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Calibration;
    use crate::linkage::Linkage;
    use crate::session::{Meta, Processed, Suspension};
    use crate::stroke::Stroke;

    fn idling(start: usize, end: usize, candidate: bool) -> Stroke {
        Stroke {
            start,
            end,
            air_candidate: candidate,
            ..Stroke::default()
        }
    }

    fn processed(rate: u16, samples: usize) -> Processed {
        let mut linkage = Linkage::default();
        linkage.max_front_travel = 150.0;
        linkage.max_rear_travel = 150.0;
        let mut pd = Processed {
            meta: Meta {
                sample_rate: rate,
                ..Meta::default()
            },
            front: Suspension::new(Calibration::default()),
            rear: Suspension::new(Calibration::default()),
            linkage,
            airtimes: Vec::new(),
        };
        pd.front.present = true;
        pd.rear.present = true;
        pd.front.travel = vec![0.0; samples];
        pd.rear.travel = vec![0.0; samples];
        pd
    }

    #[test]
    fn overlapping_candidates_pair_into_one_airtime() {
        let mut pd = processed(100, 400);
        pd.front.strokes.idlings.push(idling(200, 300, true));
        pd.rear.strokes.idlings.push(idling(220, 310, true));

        detect_airtimes(&mut pd);

        assert_eq!(pd.airtimes.len(), 1);
        assert!((pd.airtimes[0].start - 2.0).abs() < 1e-9);
        assert!((pd.airtimes[0].end - 3.0).abs() < 1e-9);
        assert!(!pd.front.strokes.idlings[0].air_candidate);
        assert!(!pd.rear.strokes.idlings[0].air_candidate);
    }

    #[test]
    fn disjoint_candidates_do_not_pair() {
        let mut pd = processed(100, 800);
        pd.front.strokes.idlings.push(idling(100, 200, true));
        pd.rear.strokes.idlings.push(idling(500, 700, true));

        detect_airtimes(&mut pd);

        // No overlap, but both spans sit at full extension so the residual
        // pass accepts each on its own; front residuals come first.
        assert_eq!(pd.airtimes.len(), 2);
        assert!((pd.airtimes[0].start - 1.0).abs() < 1e-9);
        assert!((pd.airtimes[1].start - 5.0).abs() < 1e-9);
    }

    #[test]
    fn residuals_with_high_mean_travel_are_rejected() {
        let mut pd = processed(100, 400);
        pd.front.strokes.idlings.push(idling(100, 160, true));
        for t in &mut pd.front.travel[100..=160] {
            *t = 50.0;
        }

        detect_airtimes(&mut pd);

        // Mean travel (50 + 0) / 2 = 25 exceeds 0.04 * 150 = 6.
        assert!(pd.airtimes.is_empty());
    }

    #[test]
    fn single_side_candidates_pass_through() {
        let mut pd = processed(100, 400);
        pd.front.present = false;
        pd.rear.strokes.idlings.push(idling(40, 80, true));
        pd.rear.strokes.idlings.push(idling(120, 140, false));

        detect_airtimes(&mut pd);

        assert_eq!(pd.airtimes.len(), 1);
        assert!((pd.airtimes[0].start - 0.4).abs() < 1e-9);
        assert!((pd.airtimes[0].end - 0.8).abs() < 1e-9);
    }

    #[test]
    fn no_sides_present_yields_no_airtimes() {
        let mut pd = processed(100, 10);
        pd.front.present = false;
        pd.rear.present = false;
        detect_airtimes(&mut pd);
        assert!(pd.airtimes.is_empty());
    }
}
