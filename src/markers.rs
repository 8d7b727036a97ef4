// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Sensor housing model published as a visualization marker array.
//!
//! The housing is drawn as four cylinders stacked in the sensor frame:
//! bottom body, laser window, top body and the cable exit.

use edgefirst_schemas::{
    builtin_interfaces::Duration,
    geometry_msgs::{Point, Pose, Quaternion, Vector3},
    std_msgs::Header,
};
use serde::{Deserialize, Serialize};

/// visualization_msgs/Marker type for a cylinder.
pub const CYLINDER: i32 = 3;
/// visualization_msgs/Marker action to add or modify a marker.
pub const ADD: i32 = 0;

/// Housing radius in meters.
const RADIUS: f64 = 0.1033;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorRGBA {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// visualization_msgs/Marker
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Marker {
    pub header: Header,
    pub ns: String,
    pub id: i32,
    #[serde(rename = "type")]
    pub type_: i32,
    pub action: i32,
    pub pose: Pose,
    pub scale: Vector3,
    pub color: ColorRGBA,
    pub lifetime: Duration,
    pub frame_locked: bool,
    pub points: Vec<Point>,
    pub colors: Vec<ColorRGBA>,
    pub text: String,
    pub mesh_resource: String,
    pub mesh_use_embedded_materials: bool,
}

/// visualization_msgs/MarkerArray
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarkerArray {
    pub markers: Vec<Marker>,
}

fn point(x: f64, y: f64, z: f64) -> Point {
    Point { x, y, z }
}

fn vector(x: f64, y: f64, z: f64) -> Vector3 {
    Vector3 { x, y, z }
}

fn color(r: f32, g: f32, b: f32, a: f32) -> ColorRGBA {
    ColorRGBA { r, g, b, a }
}

/// Quaternion from roll, pitch and yaw in radians.
fn quaternion(roll: f64, pitch: f64, yaw: f64) -> Quaternion {
    let (sr, cr) = (roll / 2.0).sin_cos();
    let (sp, cp) = (pitch / 2.0).sin_cos();
    let (sy, cy) = (yaw / 2.0).sin_cos();

    Quaternion {
        x: sr * cp * cy - cr * sp * sy,
        y: cr * sp * cy + sr * cp * sy,
        z: cr * cp * sy - sr * sp * cy,
        w: cr * cp * cy + sr * sp * sy,
    }
}

/// Build the housing markers for `header`. Depends on nothing but the header.
pub fn build_markers(header: &Header) -> MarkerArray {
    let parts = [
        (
            point(0.0, 0.0, -0.0285),
            quaternion(0.0, 0.0, 0.0),
            vector(RADIUS, RADIUS, 0.020),
            color(0.85, 0.85, 0.85, 0.85),
        ),
        (
            point(0.0, 0.0, 0.0),
            quaternion(0.0, 0.0, 0.0),
            vector(RADIUS, RADIUS, 0.037),
            color(0.1, 0.1, 0.1, 0.98),
        ),
        (
            point(0.0, 0.0, 0.0255),
            quaternion(0.0, 0.0, 0.0),
            vector(RADIUS, RADIUS, 0.015),
            color(0.85, 0.85, 0.85, 0.85),
        ),
        (
            point(-RADIUS / 2.0 - 0.005, 0.0, -0.03),
            quaternion(0.0, std::f64::consts::FRAC_PI_2, 0.0),
            vector(0.0127, 0.0127, 0.02),
            color(0.2, 0.2, 0.2, 0.98),
        ),
    ];

    let ns = format!("{}_velodyne_model", header.frame_id);
    let markers = parts
        .into_iter()
        .enumerate()
        .map(|(id, (position, orientation, scale, color))| Marker {
            header: header.clone(),
            ns: ns.clone(),
            id: id as i32,
            type_: CYLINDER,
            action: ADD,
            pose: Pose {
                position,
                orientation,
            },
            scale,
            color,
            lifetime: Duration { sec: 0, nanosec: 0 },
            frame_locked: false,
            points: Vec::new(),
            colors: Vec::new(),
            text: String::new(),
            mesh_resource: String::new(),
            mesh_use_embedded_materials: false,
        })
        .collect();

    MarkerArray { markers }
}
