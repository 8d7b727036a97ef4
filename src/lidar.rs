// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Common point types and error handling shared by the conversion pipeline.
//!
//! Points flow through the pipeline as an array-of-structures: the carry-over
//! buffer moves individual points between revolutions and the classifier
//! re-orders them by laser, both of which are simpler with whole points than
//! with parallel coordinate arrays.

use edgefirst_schemas::{builtin_interfaces::Time, serde_cdr, std_msgs::Header};
use std::fmt;

/// Full turn of the sensor in hundredths of a degree.
pub const AZIMUTH_RESOLUTION: u16 = 36000;

/// Return tag reported by the sensor for each sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReturnType {
    #[default]
    Invalid = 0,
    SingleStrongest = 1,
    SingleLast = 2,
    DualStrongestFirst = 3,
    DualStrongestLast = 4,
    DualWeakFirst = 5,
    DualWeakLast = 6,
    DualOnly = 7,
}

impl From<u8> for ReturnType {
    fn from(value: u8) -> Self {
        match value {
            1 => ReturnType::SingleStrongest,
            2 => ReturnType::SingleLast,
            3 => ReturnType::DualStrongestFirst,
            4 => ReturnType::DualStrongestLast,
            5 => ReturnType::DualWeakFirst,
            6 => ReturnType::DualWeakLast,
            7 => ReturnType::DualOnly,
            _ => ReturnType::Invalid,
        }
    }
}

/// A single decoded sample.
///
/// `azimuth` is in hundredths of a degree in `[0, 36000)` and `time_stamp`
/// is the capture time in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
    pub return_type: ReturnType,
    pub ring: u16,
    pub azimuth: u16,
    pub distance: f32,
    pub time_stamp: f64,
}

/// An ordered run of points with the header they are published under.
#[derive(Clone, Debug)]
pub struct Batch {
    pub header: Header,
    pub points: Vec<Point>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Capture time of the first point, if any.
    pub fn first_timestamp(&self) -> Option<f64> {
        self.points.first().map(|p| p.time_stamp)
    }
}

/// Convert a capture time in seconds into a message timestamp.
pub fn time_from_secs(seconds: f64) -> Time {
    let sec = seconds.floor();
    let nanosec = ((seconds - sec) * 1e9).round() as u32;
    // Rounding can push the fraction to a full second.
    if nanosec >= 1_000_000_000 {
        Time {
            sec: sec as i32 + 1,
            nanosec: nanosec - 1_000_000_000,
        }
    } else {
        Time {
            sec: sec as i32,
            nanosec,
        }
    }
}

/// Common error type for the publisher.
///
/// Only setup and I/O paths produce errors; a processing cycle never fails.
#[derive(Debug)]
pub enum Error {
    /// I/O error (test vector files)
    Io(std::io::Error),
    /// CDR encoding or decoding failure
    Cdr(serde_cdr::Error),
    /// YAML serialization failure
    Yaml(serde_yaml::Error),
    /// JSON configuration parse failure
    Json(serde_json::Error),
    /// Zenoh session, publisher or subscriber failure
    Zenoh(zenoh::Error),
}

impl std::error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Cdr(err) => write!(f, "CDR error: {:?}", err),
            Error::Yaml(err) => write!(f, "YAML error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Zenoh(err) => write!(f, "zenoh error: {}", err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_cdr::Error> for Error {
    fn from(err: serde_cdr::Error) -> Self {
        Error::Cdr(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<zenoh::Error> for Error {
    fn from(err: zenoh::Error) -> Self {
        Error::Zenoh(err)
    }
}
