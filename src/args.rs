// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edgefirst_scanpub::Config as ScanConfig;
use serde_json::json;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use zenoh::config::{Config, WhatAmI};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Packet batch topic published by the sensor driver
    #[arg(long, env, default_value = "rt/velodyne/packets")]
    pub packets_topic: String,

    /// lidar base topic, outputs are published below it
    #[arg(long, env, default_value = "rt/lidar")]
    pub lidar_topic: String,

    /// Number of lasers of the sensor
    #[arg(long, env, default_value = "16")]
    pub num_lasers: usize,

    /// Minimum range to publish, in meters
    #[arg(long, env, default_value = "0.9")]
    pub min_range: f64,

    /// Maximum range to publish, in meters
    #[arg(long, env, default_value = "130.0")]
    pub max_range: f64,

    /// Center of the view window in radians
    #[arg(long, env, default_value = "0.0", allow_negative_numbers = true)]
    pub view_direction: f64,

    /// Width of the view window in radians
    #[arg(long, env, default_value_t = std::f64::consts::TAU)]
    pub view_width: f64,

    /// Cut angle in degrees where one revolution ends and the next begins
    #[arg(long, env, default_value = "0.0")]
    pub scan_phase: f64,

    /// Minimum run of matching samples from one laser to report as
    /// invalid-near
    #[arg(long, env, default_value = "300")]
    pub num_points_threshold: usize,

    /// Per-laser intensity marking invalid-near samples
    #[arg(long, env, value_delimiter = ' ', num_args = 0..)]
    pub invalid_intensity: Vec<f32>,

    /// Save input packets and decoded points as YAML test vectors
    #[arg(long, env)]
    pub save_test_vector: bool,

    /// Directory for the test vector files
    #[arg(long, env, default_value = ".")]
    pub test_vector_dir: PathBuf,

    /// Application log level
    #[arg(long, env, default_value = "info")]
    pub rust_log: LevelFilter,

    /// zenoh connection mode
    #[arg(long, env, default_value = "peer")]
    mode: WhatAmI,

    /// connect to zenoh endpoints
    #[arg(long, env)]
    connect: Vec<String>,

    /// listen to zenoh endpoints
    #[arg(long, env)]
    listen: Vec<String>,

    /// disable zenoh multicast scouting
    #[arg(long, env)]
    no_multicast_scouting: bool,
}

impl From<&Args> for ScanConfig {
    fn from(args: &Args) -> Self {
        ScanConfig {
            min_range: args.min_range,
            max_range: args.max_range,
            view_direction: args.view_direction,
            view_width: args.view_width,
            scan_phase: args.scan_phase,
            num_points_threshold: args.num_points_threshold,
            invalid_intensity: args.invalid_intensity.clone(),
        }
    }
}

impl TryFrom<&Args> for Config {
    type Error = zenoh::Error;

    fn try_from(args: &Args) -> Result<Self, Self::Error> {
        let mut config = Config::default();

        config.insert_json5("mode", &json!(args.mode).to_string())?;

        if !args.connect.is_empty() {
            config.insert_json5("connect/endpoints", &json!(args.connect).to_string())?;
        }

        if !args.listen.is_empty() {
            config.insert_json5("listen/endpoints", &json!(args.listen).to_string())?;
        }

        if args.no_multicast_scouting {
            config.insert_json5("scouting/multicast/enabled", &json!(false).to_string())?;
        }

        config.insert_json5("scouting/multicast/interface", &json!("lo").to_string())?;

        Ok(config)
    }
}
