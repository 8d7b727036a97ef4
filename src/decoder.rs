// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Packet batch wire types and the decoder abstraction.
//!
//! The pipeline does not know the bit layout of sensor packets. A
//! [`PacketDecoder`] turns one [`PacketBatch`] into points in capture order;
//! the only decoder shipped here is [`PointRecordDecoder`], which reads
//! fixed-size point records produced by an upstream decoder.
//!
//! # Point record layout (36 bytes, little-endian)
//!
//! ```text
//! ┌──────┬──────┬──────┬───────────┬──────┬─────┬──────┬─────────┬─────┬──────────┬──────────┐
//! │ x    │ y    │ z    │ intensity │ ret  │ pad │ ring │ azimuth │ pad │ distance │ stamp    │
//! │ f32  │ f32  │ f32  │ f32       │ u8   │ u8  │ u16  │ u16     │ u16 │ f32      │ f64      │
//! └──────┴──────┴──────┴───────────┴──────┴─────┴──────┴─────────┴─────┴──────────┴──────────┘
//! ```

use edgefirst_schemas::{builtin_interfaces::Time, std_msgs::Header};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    config::Config,
    lidar::{AZIMUTH_RESOLUTION, Point, ReturnType},
};

/// Size of one encoded point record in bytes.
pub const RECORD_SIZE: usize = 36;

/// One raw sensor packet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanPacket {
    pub stamp: Time,
    pub data: Vec<u8>,
}

/// A batch of packets delivered together by the sensor driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacketBatch {
    pub header: Header,
    pub packets: Vec<ScanPacket>,
}

/// Turns packet batches into decoded points.
pub trait PacketDecoder: Send {
    /// Number of lasers of the attached sensor.
    fn num_lasers(&self) -> usize;

    /// Upper bound on points per packet, used to pre-size buffers.
    fn points_per_packet(&self) -> usize;

    /// Append the points of `scan` to `out` in capture order.
    ///
    /// Never fails: malformed packets contribute no points.
    fn decode(&mut self, scan: &PacketBatch, config: &Config, out: &mut Vec<Point>);
}

/// Decoder for packets carrying pre-decoded point records.
#[derive(Clone, Debug)]
pub struct PointRecordDecoder {
    num_lasers: usize,
    points_per_packet: usize,
}

impl PointRecordDecoder {
    pub fn new(num_lasers: usize) -> Self {
        Self {
            num_lasers,
            points_per_packet: 384,
        }
    }

    /// Override the expected number of records per packet.
    pub fn with_points_per_packet(mut self, points_per_packet: usize) -> Self {
        self.points_per_packet = points_per_packet;
        self
    }
}

impl PacketDecoder for PointRecordDecoder {
    fn num_lasers(&self) -> usize {
        self.num_lasers
    }

    fn points_per_packet(&self) -> usize {
        self.points_per_packet
    }

    fn decode(&mut self, scan: &PacketBatch, config: &Config, out: &mut Vec<Point>) {
        let window = config.view_window();

        for packet in &scan.packets {
            let records = packet.data.chunks_exact(RECORD_SIZE);
            if !records.remainder().is_empty() {
                trace!(
                    "ignoring {} trailing bytes in packet",
                    records.remainder().len()
                );
            }

            for record in records {
                let point = parse_record(record);
                if (point.ring as usize) < self.num_lasers
                    && point.azimuth < AZIMUTH_RESOLUTION
                    && window.contains(point.azimuth)
                {
                    out.push(point);
                }
            }
        }
    }
}

/// Encode a point as a record, the inverse of [`parse_record`].
pub fn encode_record(point: &Point, out: &mut Vec<u8>) {
    out.extend_from_slice(&point.x.to_le_bytes());
    out.extend_from_slice(&point.y.to_le_bytes());
    out.extend_from_slice(&point.z.to_le_bytes());
    out.extend_from_slice(&point.intensity.to_le_bytes());
    out.push(point.return_type as u8);
    out.push(0);
    out.extend_from_slice(&point.ring.to_le_bytes());
    out.extend_from_slice(&point.azimuth.to_le_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&point.distance.to_le_bytes());
    out.extend_from_slice(&point.time_stamp.to_le_bytes());
}

fn parse_record(r: &[u8]) -> Point {
    Point {
        x: f32::from_le_bytes([r[0], r[1], r[2], r[3]]),
        y: f32::from_le_bytes([r[4], r[5], r[6], r[7]]),
        z: f32::from_le_bytes([r[8], r[9], r[10], r[11]]),
        intensity: f32::from_le_bytes([r[12], r[13], r[14], r[15]]),
        return_type: ReturnType::from(r[16]),
        ring: u16::from_le_bytes([r[18], r[19]]),
        azimuth: u16::from_le_bytes([r[20], r[21]]),
        distance: f32::from_le_bytes([r[24], r[25], r[26], r[27]]),
        time_stamp: f64::from_le_bytes([
            r[28], r[29], r[30], r[31], r[32], r[33], r[34], r[35],
        ]),
    }
}
