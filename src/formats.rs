// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Point cloud formatting into packed ROS PointCloud2 messages.
//!
//! # Layouts
//!
//! ## XYZIR, 18-byte stride
//! ```text
//! ┌───────┬───────┬───────┬───────────────┬──────────┐
//! │ x:f32 │ y:f32 │ z:f32 │ intensity:f32 │ ring:u16 │
//! │ 4B    │ 4B    │ 4B    │ 4B            │ 2B       │
//! └───────┴───────┴───────┴───────────────┴──────────┘
//! ```
//!
//! ## XYZIRADT, 35-byte stride
//! ```text
//! ┌───────┬───────┬───────┬───────────────┬────────────────┬──────────┬─────────────┬──────────────┬────────────────┐
//! │ x:f32 │ y:f32 │ z:f32 │ intensity:f32 │ return_type:u8 │ ring:u16 │ azimuth:f32 │ distance:f32 │ time_stamp:f64 │
//! │ 4B    │ 4B    │ 4B    │ 4B            │ 1B             │ 2B       │ 4B          │ 4B           │ 8B             │
//! └───────┴───────┴───────┴───────────────┴────────────────┴──────────┴─────────────┴──────────────┴────────────────┘
//! ```

use edgefirst_schemas::sensor_msgs::{PointCloud2, PointField};

use crate::lidar::{Batch, Point};

/// Point field data types for PointCloud2 messages.
///
/// These values correspond to the ROS sensor_msgs/PointField datatype field.
/// All variants are defined for completeness, even if not all are currently
/// used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(dead_code)]
pub enum PointFieldType {
    INT8 = 1,
    UINT8 = 2,
    INT16 = 3,
    UINT16 = 4,
    INT32 = 5,
    UINT32 = 6,
    FLOAT32 = 7,
    FLOAT64 = 8,
}

/// Packed point layout of an output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLayout {
    /// Position, intensity and ring.
    Xyzir,
    /// Every decoded attribute.
    Xyziradt,
}

impl PointLayout {
    /// Bytes per packed point.
    pub fn point_step(self) -> u32 {
        match self {
            PointLayout::Xyzir => 18,
            PointLayout::Xyziradt => 35,
        }
    }

    pub fn fields(self) -> Vec<PointField> {
        match self {
            PointLayout::Xyzir => xyzir_fields(),
            PointLayout::Xyziradt => xyziradt_fields(),
        }
    }
}

fn field(name: &str, offset: u32, datatype: PointFieldType) -> PointField {
    PointField {
        name: String::from(name),
        offset,
        datatype: datatype as u8,
        count: 1,
    }
}

/// Build the XYZIR point fields (18-byte stride).
pub fn xyzir_fields() -> Vec<PointField> {
    vec![
        field("x", 0, PointFieldType::FLOAT32),
        field("y", 4, PointFieldType::FLOAT32),
        field("z", 8, PointFieldType::FLOAT32),
        field("intensity", 12, PointFieldType::FLOAT32),
        field("ring", 16, PointFieldType::UINT16),
    ]
}

/// Build the XYZIRADT point fields (35-byte stride).
pub fn xyziradt_fields() -> Vec<PointField> {
    vec![
        field("x", 0, PointFieldType::FLOAT32),
        field("y", 4, PointFieldType::FLOAT32),
        field("z", 8, PointFieldType::FLOAT32),
        field("intensity", 12, PointFieldType::FLOAT32),
        field("return_type", 16, PointFieldType::UINT8),
        field("ring", 17, PointFieldType::UINT16),
        field("azimuth", 19, PointFieldType::FLOAT32),
        field("distance", 23, PointFieldType::FLOAT32),
        field("time_stamp", 27, PointFieldType::FLOAT64),
    ]
}

/// Pack `points` into `layout`, little-endian.
pub fn format_points(points: &[Point], layout: PointLayout) -> Vec<u8> {
    let mut data = Vec::with_capacity(points.len() * layout.point_step() as usize);
    for p in points {
        data.extend_from_slice(&p.x.to_le_bytes());
        data.extend_from_slice(&p.y.to_le_bytes());
        data.extend_from_slice(&p.z.to_le_bytes());
        data.extend_from_slice(&p.intensity.to_le_bytes());
        match layout {
            PointLayout::Xyzir => {
                data.extend_from_slice(&p.ring.to_le_bytes());
            }
            PointLayout::Xyziradt => {
                data.push(p.return_type as u8);
                data.extend_from_slice(&p.ring.to_le_bytes());
                data.extend_from_slice(&(p.azimuth as f32).to_le_bytes());
                data.extend_from_slice(&p.distance.to_le_bytes());
                data.extend_from_slice(&p.time_stamp.to_le_bytes());
            }
        }
    }
    data
}

/// Build a PointCloud2 message for `batch` in `layout`.
pub fn to_point_cloud(batch: &Batch, layout: PointLayout) -> PointCloud2 {
    let n_points = batch.len() as u32;
    let point_step = layout.point_step();

    PointCloud2 {
        header: batch.header.clone(),
        height: 1,
        width: n_points,
        fields: layout.fields(),
        is_bigendian: false,
        point_step,
        row_step: point_step * n_points,
        data: format_points(&batch.points, layout),
        is_dense: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lidar::ReturnType;
    use edgefirst_schemas::{builtin_interfaces::Time, std_msgs::Header};

    fn sample() -> Point {
        Point {
            x: 1.0,
            y: 10.0,
            z: 100.0,
            intensity: 55.0,
            return_type: ReturnType::SingleStrongest,
            ring: 7,
            azimuth: 12345,
            distance: 100.5,
            time_stamp: 1.25,
        }
    }

    #[test]
    fn test_format_xyzir() {
        let data = format_points(&[sample(), sample()], PointLayout::Xyzir);
        assert_eq!(data.len(), 18 * 2);

        let x0 = f32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let y0 = f32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        let z0 = f32::from_le_bytes([data[8], data[9], data[10], data[11]]);
        let i0 = f32::from_le_bytes([data[12], data[13], data[14], data[15]]);
        let r0 = u16::from_le_bytes([data[16], data[17]]);

        assert_eq!(x0, 1.0);
        assert_eq!(y0, 10.0);
        assert_eq!(z0, 100.0);
        assert_eq!(i0, 55.0);
        assert_eq!(r0, 7);

        // Second point starts right after the first
        let x1 = f32::from_le_bytes([data[18], data[19], data[20], data[21]]);
        assert_eq!(x1, 1.0);
    }

    #[test]
    fn test_format_xyziradt() {
        let data = format_points(&[sample()], PointLayout::Xyziradt);
        assert_eq!(data.len(), 35);

        assert_eq!(data[16], ReturnType::SingleStrongest as u8);
        assert_eq!(u16::from_le_bytes([data[17], data[18]]), 7);
        let azimuth = f32::from_le_bytes([data[19], data[20], data[21], data[22]]);
        let distance = f32::from_le_bytes([data[23], data[24], data[25], data[26]]);
        let mut stamp = [0u8; 8];
        stamp.copy_from_slice(&data[27..35]);

        assert_eq!(azimuth, 12345.0);
        assert_eq!(distance, 100.5);
        assert_eq!(f64::from_le_bytes(stamp), 1.25);
    }

    #[test]
    fn test_point_field_builders() {
        let fields = xyzir_fields();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[4].name, "ring");
        assert_eq!(fields[4].offset, 16);

        let fields = xyziradt_fields();
        assert_eq!(fields.len(), 9);
        let last = &fields[8];
        assert_eq!(last.name, "time_stamp");
        assert_eq!(last.offset + 8, PointLayout::Xyziradt.point_step());
        assert_eq!(last.datatype, PointFieldType::FLOAT64 as u8);
    }

    #[test]
    fn test_to_point_cloud() {
        let batch = Batch {
            header: Header {
                stamp: Time { sec: 3, nanosec: 0 },
                frame_id: String::from("velodyne"),
            },
            points: vec![sample(); 4],
        };
        let msg = to_point_cloud(&batch, PointLayout::Xyzir);
        assert_eq!(msg.width, 4);
        assert_eq!(msg.height, 1);
        assert_eq!(msg.row_step, 18 * 4);
        assert_eq!(msg.data.len(), 18 * 4);
        assert_eq!(msg.header.frame_id, "velodyne");
    }
}
