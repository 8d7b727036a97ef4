// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! EdgeFirst Scan Publisher Library
//!
//! Converts the packet stream of a spinning LiDAR into revolution-aligned
//! point clouds and publishes them on demand.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌───────────────┐     ┌─────────────────┐
//! │  PacketBatch    │ ──► │ PacketDecoder │ ──► │  ScanSegmenter  │
//! │  (zenoh / test) │     │ (records/...) │     │  (carry-over)   │
//! └─────────────────┘     └───────────────┘     └─────────────────┘
//!                                                       │
//!                                                       ▼
//!                               ┌─────────────────────────────────────┐
//!                               │  classify::extract_* / combine      │
//!                               │  (valid, invalid-near, combined)    │
//!                               └─────────────────────────────────────┘
//!                                                       │
//!                                                       ▼
//!                               ┌─────────────────────────────────────┐
//!                               │  OutputChannel (only if consumed)   │
//!                               └─────────────────────────────────────┘
//! ```
//!
//! The [`pipeline::ScanPipeline`] owns the decoder, the segmenter and the
//! outputs. Configuration lives in a shared [`config::ConfigHandle`] that
//! another task may replace at any time; each cycle works on one snapshot.
//!
//! # Modules
//!
//! - [`lidar`]: Point and batch types, error handling
//! - [`decoder`]: Packet batch wire types and the decoder trait
//! - [`segment`]: Revolution segmentation with carry-over
//! - [`classify`]: Valid / invalid-near classification
//! - [`config`]: Configuration snapshots and reconfiguration
//! - [`output`]: Demand-gated output channels
//! - [`formats`]: PointCloud2 packing
//! - [`markers`]: Sensor housing markers
//! - [`test_vector`]: YAML test vector capture
//! - [`pipeline`]: Per-cycle orchestration
//!
//! # Example
//!
//! ```ignore
//! use edgefirst_scanpub::{
//!     config::{Config, ConfigHandle},
//!     decoder::PointRecordDecoder,
//!     pipeline::ScanPipeline,
//! };
//!
//! let decoder = PointRecordDecoder::new(16);
//! let config = ConfigHandle::new(Config::default(), 16);
//! let mut pipeline = ScanPipeline::new(Box::new(decoder), config, outputs);
//!
//! while let Ok(scan) = rx.recv() {
//!     pipeline.process_packet_batch(&scan);
//! }
//! ```

pub mod classify;
pub mod config;
pub mod decoder;
pub mod formats;
pub mod lidar;
pub mod markers;
pub mod output;
pub mod pipeline;
pub mod segment;
pub mod test_vector;

// Re-exports for convenience
pub use config::{Config, ConfigHandle, ConfigUpdate};
pub use decoder::{PacketBatch, PacketDecoder, PointRecordDecoder, ScanPacket};
pub use formats::PointFieldType;
pub use lidar::{Batch, Error, Point, ReturnType};
pub use output::{OutputChannel, Outputs};
pub use pipeline::ScanPipeline;
pub use segment::ScanSegmenter;
