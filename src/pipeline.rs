// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! One processing cycle per packet batch.
//!
//! ```text
//! PacketBatch ─► decode ─► segment ─► extract_valid ──────────► points / points_ex
//!                (carry-over) │                       │
//!                             └► sort + invalid_near ─┴► combine ► points_combined_ex
//!                                         │
//!                                         └────────────────────► points_invalid_near
//! ```
//!
//! Each stage runs only if some output that depends on it has a consumer.
//! When no point output has a consumer, nothing is decoded and the
//! carry-over buffer is left untouched until the next active cycle.

use tracing::{debug, info_span, instrument, warn};

use crate::{
    classify::{combine, extract_invalid_near, extract_valid, sort_by_laser},
    config::{Config, ConfigHandle},
    decoder::{PacketBatch, PacketDecoder},
    lidar::Batch,
    markers::build_markers,
    output::Outputs,
    segment::ScanSegmenter,
    test_vector::TestVectorWriter,
};

/// Converts packet batches into revolution-aligned, classified point clouds.
pub struct ScanPipeline {
    decoder: Box<dyn PacketDecoder>,
    segmenter: ScanSegmenter,
    config: ConfigHandle,
    outputs: Outputs,
    test_vectors: Option<TestVectorWriter>,
}

impl ScanPipeline {
    pub fn new(decoder: Box<dyn PacketDecoder>, config: ConfigHandle, outputs: Outputs) -> Self {
        Self {
            decoder,
            segmenter: ScanSegmenter::new(),
            config,
            outputs,
            test_vectors: None,
        }
    }

    /// Record every processed cycle with `writer`.
    pub fn with_test_vectors(mut self, writer: TestVectorWriter) -> Self {
        self.test_vectors = Some(writer);
        self
    }

    /// Shared configuration handle, for reconfiguration from another task.
    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn segmenter(&self) -> &ScanSegmenter {
        &self.segmenter
    }

    /// Process one packet batch and publish to every output with a consumer.
    #[instrument(skip_all, fields(packets = scan.packets.len()))]
    pub fn process_packet_batch(&mut self, scan: &PacketBatch) {
        let config = self.config.snapshot();

        let want_points = self.outputs.points.has_consumer();
        let want_points_ex = self.outputs.points_ex.has_consumer();
        let want_invalid_near = self.outputs.invalid_near.has_consumer();
        let want_combined = self.outputs.combined_ex.has_consumer();

        let want_valid = want_points || want_points_ex || want_combined;
        let want_near = want_invalid_near || want_combined;

        if want_valid || want_near {
            let batch = info_span!("segment").in_scope(|| {
                let additional = scan.packets.len() * self.decoder.points_per_packet();
                let mut working = self.segmenter.begin(additional);
                self.decoder.decode(scan, &config, &mut working);

                if let Some(writer) = &mut self.test_vectors {
                    let frame_id = writer.frame_id();
                    if let Err(e) = writer.write(scan, &working) {
                        warn!("test vector frame {} capture failed: {}", frame_id, e);
                    }
                }

                self.segmenter
                    .finish(working, config.scan_phase, scan.header.clone())
            });

            debug!(
                "revolution of {} points, {} carried over",
                batch.len(),
                self.segmenter.carry_over().len()
            );

            if batch.is_empty() {
                debug!("empty revolution, skipping point outputs");
            } else {
                self.dispatch_points(
                    &batch,
                    &config,
                    [want_points, want_points_ex, want_invalid_near, want_combined],
                );
            }
        }

        if self.outputs.markers.has_consumer() {
            self.outputs.markers.publish(&build_markers(&scan.header));
        }
    }

    fn dispatch_points(
        &self,
        batch: &Batch,
        config: &Config,
        [want_points, want_points_ex, want_invalid_near, want_combined]: [bool; 4],
    ) {
        let valid = (want_points || want_points_ex || want_combined).then(|| {
            info_span!("extract_valid")
                .in_scope(|| extract_valid(batch, config.min_range, config.max_range))
        });

        if let Some(valid) = &valid {
            if want_points {
                self.outputs.points.publish(valid);
            }
            if want_points_ex {
                self.outputs.points_ex.publish(valid);
            }
        }

        let invalid_near = (want_invalid_near || want_combined).then(|| {
            info_span!("extract_invalid_near").in_scope(|| {
                extract_invalid_near(
                    &sort_by_laser(batch),
                    &config.invalid_intensity,
                    self.decoder.num_lasers(),
                    config.num_points_threshold,
                )
            })
        });

        if let Some(invalid_near) = &invalid_near {
            if want_invalid_near {
                self.outputs.invalid_near.publish(invalid_near);
            }
        }

        if want_combined {
            if let (Some(valid), Some(invalid_near)) = (&valid, &invalid_near) {
                self.outputs.combined_ex.publish(&combine(valid, invalid_near));
            }
        }
    }
}
