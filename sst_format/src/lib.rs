#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Decoder for the SST binary telemetry container.
//!
//! Layout (all little-endian, fixed offsets):
//!
//! | offset | size  | field |
//! |--------|-------|-------|
//! | 0      | 3     | magic `"SST"` |
//! | 3      | 1     | version |
//! | 4      | 2     | sample rate (Hz) |
//! | 6      | 2     | reserved |
//! | 8      | 8     | timestamp (signed) |
//! | 16     | 4 · N | records: fork angle u16, shock angle u16 |
//!
//! A side is absent when its angle in the first record is `0xFFFF`; absent
//! sides are excluded from the output. Each present side gets a one-time
//! baseline-error correction for sensors that jump to a large offset within
//! the first fraction of a second but measure correctly from there on.

use tracing::{debug, trace};

pub mod error;
pub use error::SstError;

use error::Result;
use sst_core::session::{Meta, Processed, SetupData, process_recording};

const HEADER_LEN: usize = 16;
const RECORD_LEN: usize = 4;
const ABSENT: u16 = 0xFFFF;

/// A sensor value must exceed this before it can be a baseline error offset;
/// genuine top-out readings stay below it.
const BASELINE_ERROR_MIN: u16 = 0x0050;

/// Find the one-time error offset of a channel: starting from the first
/// record's baseline, the first strictly greater value decides. If it is
/// large it is the offset, otherwise the channel is clean.
fn baseline_error(samples: impl Iterator<Item = u16>) -> u16 {
    let mut samples = samples;
    let Some(baseline) = samples.next() else {
        return 0;
    };
    for value in samples {
        if value > baseline {
            if value > BASELINE_ERROR_MIN {
                return value;
            }
            break;
        }
    }
    0
}

/// Decode an SST byte stream into per-side corrected sample sequences and
/// the recording metadata. An absent side decodes to an empty vector; the
/// ride name is left for the caller to fill in. Corrected samples are
/// signed: subtracting the error offset can push early samples below zero,
/// and the calibration clamp downstream absorbs those.
pub fn decode(data: &[u8]) -> Result<(Vec<i32>, Vec<i32>, Meta)> {
    if data.len() < HEADER_LEN || &data[0..3] != b"SST" {
        return Err(SstError::NotSst.into());
    }
    let mut timestamp = [0u8; 8];
    timestamp.copy_from_slice(&data[8..16]);
    let meta = Meta {
        name: String::new(),
        version: data[3],
        sample_rate: u16::from_le_bytes([data[4], data[5]]),
        timestamp: i64::from_le_bytes(timestamp),
    };

    // Trailing bytes short of a full record are ignored.
    let records: Vec<(u16, u16)> = data[HEADER_LEN..]
        .chunks_exact(RECORD_LEN)
        .map(|chunk| {
            (
                u16::from_le_bytes([chunk[0], chunk[1]]),
                u16::from_le_bytes([chunk[2], chunk[3]]),
            )
        })
        .collect();
    debug!(
        version = meta.version,
        sample_rate = meta.sample_rate,
        records = records.len(),
        "decoded SST header"
    );

    let Some(&(first_fork, first_shock)) = records.first() else {
        return Ok((Vec::new(), Vec::new(), meta));
    };
    let has_front = first_fork != ABSENT;
    let has_rear = first_shock != ABSENT;

    let mut front = Vec::new();
    let mut rear = Vec::new();
    if has_front {
        let error = baseline_error(records.iter().map(|r| r.0));
        trace!(error, "fork baseline correction");
        front = records
            .iter()
            .map(|r| i32::from(r.0) - i32::from(error))
            .collect();
    }
    if has_rear {
        let error = baseline_error(records.iter().map(|r| r.1));
        trace!(error, "shock baseline correction");
        rear = records
            .iter()
            .map(|r| i32::from(r.1) - i32::from(error))
            .collect();
    }

    Ok((front, rear, meta))
}

/// Decode an SST byte stream and run the full processing pipeline over it.
pub fn process_session(data: &[u8], name: &str, setup: &SetupData) -> Result<Processed> {
    let (front, rear, mut meta) = decode(data)?;
    meta.name = name.to_string();
    process_recording(&front, &rear, meta, setup)
}
