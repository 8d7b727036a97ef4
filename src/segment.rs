// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Revolution segmentation with a carry-over buffer.
//!
//! Packet batches do not line up with revolutions of the sensor. The
//! [`ScanSegmenter`] cuts the decoded stream at the configured scan phase:
//! trailing points of a batch whose azimuth lies in the half-turn following
//! the cut already belong to the next revolution, so they are held back and
//! prepended to the next batch.
//!
//! ```text
//!   carry-over │ decoded points of this batch          │
//!   ───────────┴──────────────────────┬─────────────────┤
//!   emitted revolution                │ next carry-over │
//!                                     ▲ scan phase
//! ```

use edgefirst_schemas::std_msgs::Header;
use tracing::trace;

use crate::lidar::{AZIMUTH_RESOLUTION, Batch, Point, time_from_secs};

/// Half of a full turn in hundredths of a degree.
const HALF_TURN: u32 = AZIMUTH_RESOLUTION as u32 / 2;

/// Convert a scan phase in degrees into the cut angle in hundredths of a
/// degree, wrapped into `[0, 36000)`.
pub fn phase_to_centidegrees(scan_phase: f64) -> u16 {
    ((scan_phase * 100.0).round() as i64).rem_euclid(AZIMUTH_RESOLUTION as i64) as u16
}

/// Angular distance from the cut to `azimuth`, moving with the rotation.
#[inline]
pub fn phase_diff(azimuth: u16, phase: u16) -> u32 {
    let resolution = AZIMUTH_RESOLUTION as u32;
    (resolution + (azimuth as u32 % resolution) - phase as u32) % resolution
}

/// Owns the carry-over buffer between segmentation calls.
///
/// One segmenter belongs to one pipeline; calls must be serialized.
#[derive(Debug, Default)]
pub struct ScanSegmenter {
    /// Points deferred to the next revolution, in capture order.
    carry_over: Vec<Point>,
    /// Size of the previous emitted batch, used to pre-size the next one.
    capacity_hint: usize,
}

impl ScanSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points currently deferred to the next revolution.
    pub fn carry_over(&self) -> &[Point] {
        &self.carry_over
    }

    /// Start a new cycle: returns a working buffer holding the carry-over
    /// points, leaving the carry-over buffer empty.
    ///
    /// `additional` is the number of points the caller expects to append.
    pub fn begin(&mut self, additional: usize) -> Vec<Point> {
        let capacity = self
            .capacity_hint
            .max(self.carry_over.len() + additional);
        let mut working = Vec::with_capacity(capacity);
        working.append(&mut self.carry_over);
        working
    }

    /// Cut the working buffer at `scan_phase` degrees.
    ///
    /// Trailing points in the half-turn after the cut become the new
    /// carry-over; the rest is returned as the emitted batch under `header`.
    /// The batch stamp is the capture time of its first point, or the stamp
    /// of `header` when nothing is emitted.
    pub fn finish(&mut self, mut working: Vec<Point>, scan_phase: f64, header: Header) -> Batch {
        let phase = phase_to_centidegrees(scan_phase);

        let split = working
            .iter()
            .rposition(|p| phase_diff(p.azimuth, phase) >= HALF_TURN)
            .map_or(0, |idx| idx + 1);
        self.carry_over = working.split_off(split);

        trace!(
            "segmented {} points at phase {}, {} carried over",
            working.len(),
            phase,
            self.carry_over.len()
        );

        self.capacity_hint = working.len();

        let mut batch = Batch {
            header,
            points: working,
        };
        if let Some(time_stamp) = batch.first_timestamp() {
            batch.header.stamp = time_from_secs(time_stamp);
        }
        batch
    }

    /// Merge `raw` after the carry-over and cut at `scan_phase` degrees.
    pub fn segment(&mut self, raw: &[Point], scan_phase: f64, header: Header) -> Batch {
        let mut working = self.begin(raw.len());
        working.extend_from_slice(raw);
        self.finish(working, scan_phase, header)
    }
}
