// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Tunable conversion parameters.
//!
//! A [`Config`] is an immutable snapshot. Reconfiguration builds a new
//! snapshot from the current one plus a [`ConfigUpdate`] and swaps it into the
//! shared [`ConfigHandle`], so a processing cycle that loaded the previous
//! snapshot keeps seeing it in full until the cycle ends.

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::{f64::consts::TAU, sync::Arc};
use tracing::info;

use crate::lidar::{AZIMUTH_RESOLUTION, Error};

/// Snapshot of all conversion parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Minimum published range in meters.
    pub min_range: f64,
    /// Maximum published range in meters.
    pub max_range: f64,
    /// Center of the azimuthal view window in radians.
    pub view_direction: f64,
    /// Width of the azimuthal view window in radians.
    pub view_width: f64,
    /// Cut angle in degrees where one revolution ends and the next begins.
    pub scan_phase: f64,
    /// Minimum run length confirming an invalid-near run.
    pub num_points_threshold: usize,
    /// Intensity marking a suspect sample, one entry per laser.
    pub invalid_intensity: Vec<f32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_range: 0.9,
            max_range: 130.0,
            view_direction: 0.0,
            view_width: TAU,
            scan_phase: 0.0,
            num_points_threshold: 300,
            invalid_intensity: Vec::new(),
        }
    }
}

impl Config {
    /// Apply the fields present in `update`, keeping the others.
    ///
    /// `invalid_intensity` is always left with exactly `num_lasers` entries.
    pub fn apply(&mut self, update: &ConfigUpdate, num_lasers: usize) {
        if let Some(v) = update.min_range {
            self.min_range = v;
        }
        if let Some(v) = update.max_range {
            self.max_range = v;
        }
        if let Some(v) = update.view_direction {
            self.view_direction = v;
        }
        if let Some(v) = update.view_width {
            self.view_width = v;
        }
        if let Some(v) = update.scan_phase {
            self.scan_phase = v;
        }
        if let Some(v) = update.num_points_threshold {
            self.num_points_threshold = v;
        }
        if let Some(v) = &update.invalid_intensity {
            self.invalid_intensity = v.clone();
        }
        self.invalid_intensity = resize_invalid_intensity(&self.invalid_intensity, num_lasers);
    }

    /// Azimuth window derived from `view_direction` and `view_width`.
    pub fn view_window(&self) -> ViewWindow {
        ViewWindow::new(self.view_direction, self.view_width)
    }
}

/// Zero-fill or truncate a per-laser intensity table to `num_lasers`.
pub fn resize_invalid_intensity(values: &[f32], num_lasers: usize) -> Vec<f32> {
    let mut table = vec![0.0; num_lasers];
    for (dst, src) in table.iter_mut().zip(values) {
        *dst = *src;
    }
    table
}

/// Partial reconfiguration request. Absent fields keep their prior values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub min_range: Option<f64>,
    pub max_range: Option<f64>,
    pub view_direction: Option<f64>,
    pub view_width: Option<f64>,
    pub scan_phase: Option<f64>,
    pub num_points_threshold: Option<usize>,
    pub invalid_intensity: Option<Vec<f32>>,
}

impl ConfigUpdate {
    /// Parse a JSON reconfiguration request, such as
    /// `{"scan_phase": 90.0, "invalid_intensity": [0.0, 1.0]}`.
    pub fn from_json(payload: &[u8]) -> Result<Self, Error> {
        Ok(serde_json::from_slice(payload)?)
    }
}

/// Acknowledgement returned by [`ConfigHandle::reconfigure`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SetParametersResult {
    pub successful: bool,
    pub reason: String,
}

/// Shared, atomically replaceable configuration.
///
/// Cloning the handle shares the same underlying snapshot slot.
#[derive(Clone, Debug)]
pub struct ConfigHandle {
    current: Arc<ArcSwap<Config>>,
    num_lasers: usize,
}

impl ConfigHandle {
    /// Create a handle for a sensor with `num_lasers` lasers.
    pub fn new(mut config: Config, num_lasers: usize) -> Self {
        config.invalid_intensity = resize_invalid_intensity(&config.invalid_intensity, num_lasers);
        Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
            num_lasers,
        }
    }

    /// Current snapshot. Hold it for the duration of one processing cycle.
    pub fn snapshot(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Replace the snapshot with the current one plus `update`.
    pub fn reconfigure(&self, update: &ConfigUpdate) -> SetParametersResult {
        info!("reconfigure request: {:?}", update);
        let num_lasers = self.num_lasers;
        self.current.rcu(|current| {
            let mut next = Config::clone(current);
            next.apply(update, num_lasers);
            next
        });

        SetParametersResult {
            successful: true,
            reason: String::from("success"),
        }
    }
}

/// Azimuth interval accepted by the decoder, in hundredths of a degree.
///
/// The sensor counts azimuth clockwise while the view parameters are given
/// counter-clockwise in radians, hence the reflection through 2π.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewWindow {
    pub min_angle: u16,
    pub max_angle: u16,
}

impl ViewWindow {
    pub fn new(view_direction: f64, view_width: f64) -> Self {
        let tmp_min = (view_direction + view_width / 2.0).rem_euclid(TAU);
        let tmp_max = (view_direction - view_width / 2.0).rem_euclid(TAU);

        let min_angle = to_centidegrees(TAU - tmp_min);
        let max_angle = to_centidegrees(TAU - tmp_max);

        if min_angle == max_angle {
            // A degenerate window means the full turn.
            return Self {
                min_angle: 0,
                max_angle: AZIMUTH_RESOLUTION,
            };
        }

        Self {
            min_angle,
            max_angle,
        }
    }

    pub fn contains(&self, azimuth: u16) -> bool {
        if self.min_angle < self.max_angle {
            azimuth >= self.min_angle && azimuth <= self.max_angle
        } else {
            azimuth <= self.max_angle || azimuth >= self.min_angle
        }
    }
}

fn to_centidegrees(radians: f64) -> u16 {
    (100.0 * radians.to_degrees() + 0.5) as u16
}
