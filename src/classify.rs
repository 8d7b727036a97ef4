// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Point validity classification.
//!
//! A revolution is split into:
//!
//! - **valid** points whose line-of-sight distance is inside the configured
//!   range limits;
//! - **invalid-near** points: sustained runs of samples from a single laser
//!   that report that laser's configured invalid intensity. A short run is
//!   plausible noise, a long one is a near-field reflection off the housing
//!   or cabling;
//! - the **combined** cloud of both.

use crate::lidar::{Batch, Point};

/// Keep points with `min_range <= distance <= max_range`, in order.
///
/// Limits are compared at the precision of the decoded distance, so a point
/// decoded at exactly `min_range` is kept.
pub fn extract_valid(batch: &Batch, min_range: f64, max_range: f64) -> Batch {
    let (min, max) = (min_range as f32, max_range as f32);
    let points = batch
        .points
        .iter()
        .filter(|p| p.distance >= min && p.distance <= max)
        .copied()
        .collect();

    Batch {
        header: batch.header.clone(),
        points,
    }
}

/// Group points by laser, keeping capture order within each laser.
pub fn sort_by_laser(batch: &Batch) -> Batch {
    let mut points = batch.points.clone();
    // Stable: capture order survives within a ring.
    points.sort_by_key(|p| p.ring);

    Batch {
        header: batch.header.clone(),
        points,
    }
}

/// Keep runs of at least `threshold` consecutive points from one laser whose
/// intensity equals that laser's entry in `invalid_intensity`.
///
/// `sorted` must be grouped by laser, see [`sort_by_laser`]. Points from a
/// laser at or beyond `num_lasers` never match. Runs do not wrap from the end
/// of a laser's group back to its start.
pub fn extract_invalid_near(
    sorted: &Batch,
    invalid_intensity: &[f32],
    num_lasers: usize,
    threshold: usize,
) -> Batch {
    let lasers = num_lasers.min(invalid_intensity.len());
    let is_suspect = |p: &Point| {
        let ring = p.ring as usize;
        ring < lasers && p.intensity == invalid_intensity[ring]
    };

    let mut points = Vec::new();
    for group in sorted.points.chunk_by(|a, b| a.ring == b.ring) {
        let mut start = 0;
        while start < group.len() {
            if !is_suspect(&group[start]) {
                start += 1;
                continue;
            }

            let len = group[start..]
                .iter()
                .position(|p| !is_suspect(p))
                .unwrap_or(group.len() - start);
            if len >= threshold {
                points.extend_from_slice(&group[start..start + len]);
            }
            start += len;
        }
    }

    Batch {
        header: sorted.header.clone(),
        points,
    }
}

/// Concatenate `a` then `b` under the header of `a`.
pub fn combine(a: &Batch, b: &Batch) -> Batch {
    let mut points = Vec::with_capacity(a.len() + b.len());
    points.extend_from_slice(&a.points);
    points.extend_from_slice(&b.points);

    Batch {
        header: a.header.clone(),
        points,
    }
}
