// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Capture of input packets and decoded points as YAML test vectors.
//!
//! Two append-only files are written, one record per processed cycle, both
//! keyed by the same incrementing frame id:
//!
//! ```yaml
//! # test_vector_input.yaml
//! - frame_id: 0
//!   packets:
//!   - packet_id: 0
//!     data: [255, 238, ...]
//!
//! # test_vector_output.yaml
//! - frame_id: 0
//!   clouds:
//!   - [x, y, z, intensity, return_type, ring, azimuth, distance, time_stamp]
//! ```

use serde::Serialize;
use std::{
    fs::{File, OpenOptions},
    io::Write as _,
    path::{Path, PathBuf},
};

use crate::{
    decoder::PacketBatch,
    lidar::{Error, Point},
};

pub const INPUT_FILE: &str = "test_vector_input.yaml";
pub const OUTPUT_FILE: &str = "test_vector_output.yaml";

#[derive(Serialize)]
struct PacketRecord<'a> {
    packet_id: usize,
    data: &'a [u8],
}

#[derive(Serialize)]
struct InputRecord<'a> {
    frame_id: u32,
    packets: Vec<PacketRecord<'a>>,
}

type PointTuple = (f32, f32, f32, f32, u8, u16, u16, f32, f64);

#[derive(Serialize)]
struct OutputRecord {
    frame_id: u32,
    clouds: Vec<PointTuple>,
}

/// Appends one input and one output record per processed cycle.
#[derive(Debug)]
pub struct TestVectorWriter {
    input_path: PathBuf,
    output_path: PathBuf,
    frame_id: u32,
}

impl TestVectorWriter {
    /// Create (truncating) both files in `dir`.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let input_path = dir.as_ref().join(INPUT_FILE);
        let output_path = dir.as_ref().join(OUTPUT_FILE);
        File::create(&input_path)?;
        File::create(&output_path)?;

        Ok(Self {
            input_path,
            output_path,
            frame_id: 0,
        })
    }

    /// Id of the next record to be written.
    pub fn frame_id(&self) -> u32 {
        self.frame_id
    }

    /// Append the packets of `scan` and the decoded `points`.
    ///
    /// The frame id is consumed even if an append fails, so ids never repeat.
    pub fn write(&mut self, scan: &PacketBatch, points: &[Point]) -> Result<(), Error> {
        let input = [InputRecord {
            frame_id: self.frame_id,
            packets: scan
                .packets
                .iter()
                .enumerate()
                .map(|(packet_id, packet)| PacketRecord {
                    packet_id,
                    data: &packet.data,
                })
                .collect(),
        }];
        let output = [OutputRecord {
            frame_id: self.frame_id,
            clouds: points
                .iter()
                .map(|p| {
                    (
                        p.x,
                        p.y,
                        p.z,
                        p.intensity,
                        p.return_type as u8,
                        p.ring,
                        p.azimuth,
                        p.distance,
                        p.time_stamp,
                    )
                })
                .collect(),
        }];
        let input = serde_yaml::to_string(&input)?;
        let output = serde_yaml::to_string(&output)?;

        self.frame_id += 1;
        append(&self.input_path, &input)?;
        append(&self.output_path, &output)
    }
}

fn append(path: &Path, text: &str) -> Result<(), Error> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}
