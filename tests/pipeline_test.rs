// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Integration tests for the conversion pipeline using synthetic revolutions.
//!
//! The synthetic sensor has 16 lasers firing together every 0.2 degrees, so
//! one revolution is 1800 firings. Packet batches end slightly past the cut,
//! the way a driver that batches per revolution delivers them.

use edgefirst_scanpub::{
    Batch, Config, ConfigHandle, ConfigUpdate, OutputChannel, Outputs, PacketBatch, Point,
    PointRecordDecoder, ReturnType, ScanPacket, ScanPipeline,
    decoder::encode_record,
    markers::MarkerArray,
    segment::{phase_diff, phase_to_centidegrees},
    test_vector::{INPUT_FILE, OUTPUT_FILE, TestVectorWriter},
};
use edgefirst_schemas::{builtin_interfaces::Time, std_msgs::Header};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

const NUM_LASERS: usize = 16;
const FIRINGS_PER_REV: usize = 1800;
const AZIMUTH_STEP: usize = 20;
const FIRINGS_PER_PACKET: usize = 12;

/// Call-counting output stub.
struct Stub<T> {
    consumer: Arc<AtomicBool>,
    queries: Arc<AtomicUsize>,
    published: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Stub<T> {
    fn clone(&self) -> Self {
        Self {
            consumer: self.consumer.clone(),
            queries: self.queries.clone(),
            published: self.published.clone(),
        }
    }
}

impl<T> Stub<T> {
    fn new(consumer: bool) -> Self {
        Self {
            consumer: Arc::new(AtomicBool::new(consumer)),
            queries: Arc::new(AtomicUsize::new(0)),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn attach(&self, consumer: bool) {
        self.consumer.store(consumer, Ordering::SeqCst);
    }

    fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.published.lock().unwrap())
    }
}

impl<T: Clone + Send> OutputChannel<T> for Stub<T> {
    fn has_consumer(&self) -> bool {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.consumer.load(Ordering::SeqCst)
    }

    fn publish(&self, msg: &T) {
        self.published.lock().unwrap().push(msg.clone());
    }
}

struct StubOutputs {
    points: Stub<Batch>,
    points_ex: Stub<Batch>,
    invalid_near: Stub<Batch>,
    combined_ex: Stub<Batch>,
    markers: Stub<MarkerArray>,
}

impl StubOutputs {
    fn new() -> Self {
        Self {
            points: Stub::new(false),
            points_ex: Stub::new(false),
            invalid_near: Stub::new(false),
            combined_ex: Stub::new(false),
            markers: Stub::new(false),
        }
    }

    fn outputs(&self) -> Outputs {
        Outputs {
            points: Box::new(self.points.clone()),
            points_ex: Box::new(self.points_ex.clone()),
            invalid_near: Box::new(self.invalid_near.clone()),
            combined_ex: Box::new(self.combined_ex.clone()),
            markers: Box::new(self.markers.clone()),
        }
    }
}

fn pipeline(stubs: &StubOutputs, config: Config) -> (ScanPipeline, ConfigHandle) {
    let handle = ConfigHandle::new(config, NUM_LASERS);
    let decoder = PointRecordDecoder::new(NUM_LASERS)
        .with_points_per_packet(FIRINGS_PER_PACKET * NUM_LASERS);
    let pipeline = ScanPipeline::new(Box::new(decoder), handle.clone(), stubs.outputs());
    (pipeline, handle)
}

fn header() -> Header {
    Header {
        stamp: Time { sec: 0, nanosec: 0 },
        frame_id: String::from("velodyne"),
    }
}

/// All points of firings `start..end`.
fn firings(start: usize, end: usize) -> Vec<Point> {
    let mut points = Vec::with_capacity((end - start) * NUM_LASERS);
    for firing in start..end {
        let azimuth = ((firing * AZIMUTH_STEP) % 36000) as u16;
        for ring in 0..NUM_LASERS as u16 {
            points.push(Point {
                x: ring as f32,
                y: 1.0,
                z: 0.5,
                intensity: 100.0,
                return_type: ReturnType::SingleStrongest,
                ring,
                azimuth,
                distance: 5.0,
                time_stamp: firing as f64 * 1e-4 + ring as f64 * 1e-6,
            });
        }
    }
    points
}

fn packet_batch(points: &[Point]) -> PacketBatch {
    let packets = points
        .chunks(FIRINGS_PER_PACKET * NUM_LASERS)
        .map(|chunk| {
            let mut data = Vec::new();
            for p in chunk {
                encode_record(p, &mut data);
            }
            ScanPacket {
                stamp: Time { sec: 0, nanosec: 0 },
                data,
            }
        })
        .collect();

    PacketBatch {
        header: header(),
        packets,
    }
}

/// Driver batch ends (in firings), each a little past a revolution boundary.
const BATCH_ENDS: [usize; 4] = [1850, 3640, 5455, 7255];

fn driver_batches() -> Vec<Vec<Point>> {
    let mut start = 0;
    BATCH_ENDS
        .iter()
        .map(|&end| {
            let points = firings(start, end);
            start = end;
            points
        })
        .collect()
}

#[test]
fn test_no_consumer_no_work() {
    let stubs = StubOutputs::new();
    let (mut pipeline, _) = pipeline(&stubs, Config::default());

    for points in driver_batches() {
        pipeline.process_packet_batch(&packet_batch(&points));
    }

    assert_eq!(stubs.points.count(), 0);
    assert_eq!(stubs.points_ex.count(), 0);
    assert_eq!(stubs.invalid_near.count(), 0);
    assert_eq!(stubs.combined_ex.count(), 0);
    assert_eq!(stubs.markers.count(), 0);
    // Consumers are polled every cycle.
    assert_eq!(stubs.points.queries.load(Ordering::SeqCst), BATCH_ENDS.len());
    // Nothing was decoded, so nothing was deferred.
    assert!(pipeline.segmenter().carry_over().is_empty());
}

#[test]
fn test_only_consumed_channels_publish() {
    let stubs = StubOutputs::new();
    stubs.points.attach(true);
    let (mut pipeline, _) = pipeline(&stubs, Config::default());

    for points in driver_batches() {
        pipeline.process_packet_batch(&packet_batch(&points));
    }

    assert_eq!(stubs.points.count(), BATCH_ENDS.len());
    assert_eq!(stubs.points_ex.count(), 0);
    assert_eq!(stubs.invalid_near.count(), 0);
    assert_eq!(stubs.combined_ex.count(), 0);
    assert_eq!(stubs.markers.count(), 0);
}

#[test]
fn test_consumer_attach_detach_between_cycles() {
    let stubs = StubOutputs::new();
    let (mut pipeline, _) = pipeline(&stubs, Config::default());
    let batches = driver_batches();

    stubs.invalid_near.attach(true);
    stubs.markers.attach(true);
    pipeline.process_packet_batch(&packet_batch(&batches[0]));
    assert_eq!(stubs.invalid_near.count(), 1);
    assert_eq!(stubs.markers.count(), 1);

    stubs.invalid_near.attach(false);
    stubs.combined_ex.attach(true);
    pipeline.process_packet_batch(&packet_batch(&batches[1]));
    assert_eq!(stubs.invalid_near.count(), 1);
    assert_eq!(stubs.combined_ex.count(), 1);
    assert_eq!(stubs.markers.count(), 2);
}

#[test]
fn test_revolutions_aligned_to_phase() {
    let stubs = StubOutputs::new();
    stubs.points_ex.attach(true);
    let (mut pipeline, _) = pipeline(&stubs, Config::default());

    for points in driver_batches() {
        pipeline.process_packet_batch(&packet_batch(&points));
    }

    let phase = phase_to_centidegrees(0.0);
    let emitted = stubs.points_ex.take();
    assert_eq!(emitted.len(), BATCH_ENDS.len());

    for (rev, batch) in emitted.iter().enumerate() {
        assert_eq!(batch.len(), FIRINGS_PER_REV * NUM_LASERS, "revolution {}", rev);
        let first = batch.points.first().unwrap();
        let last = batch.points.last().unwrap();
        assert_eq!(first.azimuth, 0);
        assert_eq!(last.azimuth, 36000 - AZIMUTH_STEP as u16);
        // The trailing point precedes the cut.
        assert!(phase_diff(last.azimuth, phase) >= 18000);
        // Stamped from the first point.
        let expected = first.time_stamp;
        let stamp = batch.header.stamp.sec as f64 + batch.header.stamp.nanosec as f64 * 1e-9;
        assert!((stamp - expected).abs() < 1e-6);
    }

    // The 55 firings past the last cut wait for the next revolution.
    let carry = pipeline.segmenter().carry_over();
    assert_eq!(carry.len(), 55 * NUM_LASERS);
    assert!(carry.iter().all(|p| phase_diff(p.azimuth, phase) < 18000));
}

#[test]
fn test_points_conserved_across_cycles() {
    let stubs = StubOutputs::new();
    stubs.points_ex.attach(true);
    let (mut pipeline, _) = pipeline(&stubs, Config::default());

    let batches = driver_batches();
    for points in &batches {
        pipeline.process_packet_batch(&packet_batch(points));
    }

    let input: Vec<Point> = batches.concat();
    let mut output: Vec<Point> = stubs
        .points_ex
        .take()
        .into_iter()
        .flat_map(|b| b.points)
        .collect();
    output.extend_from_slice(pipeline.segmenter().carry_over());

    assert_eq!(output, input);
}

#[test]
fn test_phase_change_applies_to_next_cycle() {
    let stubs = StubOutputs::new();
    stubs.points_ex.attach(true);
    let (mut pipeline, config) = pipeline(&stubs, Config::default());
    let batches = driver_batches();

    pipeline.process_packet_batch(&packet_batch(&batches[0]));
    pipeline.process_packet_batch(&packet_batch(&batches[1]));
    assert_eq!(pipeline.segmenter().carry_over().len(), 40 * NUM_LASERS);

    let result = config.reconfigure(&ConfigUpdate {
        scan_phase: Some(180.0),
        ..Default::default()
    });
    assert!(result.successful);

    // Earlier revolutions are not reprocessed.
    assert_eq!(stubs.points_ex.count(), 2);

    // Batch 3 ends 55 firings past 0 degrees, outside the half-turn after
    // the new 180 degree cut, so nothing is deferred.
    pipeline.process_packet_batch(&packet_batch(&batches[2]));
    assert!(pipeline.segmenter().carry_over().is_empty());

    let emitted = stubs.points_ex.take();
    assert_eq!(emitted.len(), 3);
    assert_eq!(emitted[0].len(), FIRINGS_PER_REV * NUM_LASERS);
    assert_eq!(emitted[1].len(), FIRINGS_PER_REV * NUM_LASERS);
    assert_eq!(emitted[2].len(), (5455 - 3600) * NUM_LASERS);
}

#[test]
fn test_invalid_near_and_combined() {
    let stubs = StubOutputs::new();
    stubs.points.attach(true);
    stubs.invalid_near.attach(true);
    stubs.combined_ex.attach(true);

    let config = Config {
        num_points_threshold: 20,
        ..Default::default()
    };
    let (mut pipeline, _) = pipeline(&stubs, config);

    // Laser 3 sees its housing for 25 consecutive firings, laser 5 for 19.
    let mut points = firings(0, 1850);
    for (i, p) in points.iter_mut().enumerate() {
        let firing = i / NUM_LASERS;
        let near = match p.ring {
            3 => (100..125).contains(&firing),
            5 => (400..419).contains(&firing),
            _ => false,
        };
        if near {
            p.intensity = 0.0;
            p.distance = 0.2;
        }
    }
    pipeline.process_packet_batch(&packet_batch(&points));

    let valid = stubs.points.take();
    let near = stubs.invalid_near.take();
    let combined = stubs.combined_ex.take();
    assert_eq!(valid.len(), 1);
    assert_eq!(near.len(), 1);
    assert_eq!(combined.len(), 1);

    let revolution = FIRINGS_PER_REV * NUM_LASERS;
    assert_eq!(valid[0].len(), revolution - 25 - 19);
    assert!(valid[0].points.iter().all(|p| p.distance >= 0.9));

    assert_eq!(near[0].len(), 25);
    assert!(near[0].points.iter().all(|p| p.ring == 3));
    // Capture order is kept within the laser.
    assert!(
        near[0]
            .points
            .windows(2)
            .all(|w| w[0].time_stamp < w[1].time_stamp)
    );

    assert_eq!(combined[0].len(), valid[0].len() + near[0].len());
    assert_eq!(&combined[0].points[..valid[0].len()], &valid[0].points[..]);
    assert_eq!(&combined[0].points[valid[0].len()..], &near[0].points[..]);
}

#[test]
fn test_empty_revolution_publishes_nothing() {
    let stubs = StubOutputs::new();
    stubs.points.attach(true);
    stubs.combined_ex.attach(true);
    stubs.markers.attach(true);
    let (mut pipeline, _) = pipeline(&stubs, Config::default());

    // Empty decode.
    pipeline.process_packet_batch(&PacketBatch {
        header: header(),
        packets: Vec::new(),
    });
    // Everything in the half-turn after the cut: all deferred.
    pipeline.process_packet_batch(&packet_batch(&firings(0, 100)));

    assert_eq!(stubs.points.count(), 0);
    assert_eq!(stubs.combined_ex.count(), 0);
    assert_eq!(stubs.markers.count(), 2);
    assert_eq!(pipeline.segmenter().carry_over().len(), 100 * NUM_LASERS);
}

fn read_records(path: &std::path::Path) -> Vec<serde_yaml::Value> {
    let text = std::fs::read_to_string(path).unwrap();
    if text.is_empty() {
        return Vec::new();
    }
    match serde_yaml::from_str::<serde_yaml::Value>(&text).unwrap() {
        serde_yaml::Value::Sequence(records) => records,
        other => panic!("expected a sequence of records, got {:?}", other),
    }
}

#[test]
fn test_vectors_record_active_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let stubs = StubOutputs::new();
    let (pipeline, _) = pipeline(&stubs, Config::default());
    let mut pipeline = pipeline.with_test_vectors(TestVectorWriter::create(dir.path()).unwrap());
    let batches = driver_batches();

    // Idle: nothing is decoded, nothing is recorded.
    pipeline.process_packet_batch(&packet_batch(&batches[0]));
    assert!(read_records(&dir.path().join(OUTPUT_FILE)).is_empty());

    stubs.points.attach(true);
    pipeline.process_packet_batch(&packet_batch(&batches[1]));
    let carried: Vec<Point> = pipeline.segmenter().carry_over().to_vec();
    assert_eq!(carried.len(), 40 * NUM_LASERS);
    pipeline.process_packet_batch(&packet_batch(&batches[2]));

    let inputs = read_records(&dir.path().join(INPUT_FILE));
    let outputs = read_records(&dir.path().join(OUTPUT_FILE));
    assert_eq!(inputs.len(), 2);
    assert_eq!(outputs.len(), 2);
    for (id, (input, output)) in inputs.iter().zip(&outputs).enumerate() {
        assert_eq!(input["frame_id"].as_u64(), Some(id as u64));
        assert_eq!(output["frame_id"].as_u64(), Some(id as u64));
    }

    // Packets are logged as received.
    let packets = inputs[1]["packets"].as_sequence().unwrap();
    assert_eq!(packets.len(), packet_batch(&batches[2]).packets.len());

    // The first record holds only the decoded batch.
    let first = outputs[0]["clouds"].as_sequence().unwrap();
    assert_eq!(first.len(), batches[1].len());

    // The second starts with the carry-over, then the decoded batch, uncut.
    let second = outputs[1]["clouds"].as_sequence().unwrap();
    assert_eq!(second.len(), carried.len() + batches[2].len());
    let expected = carried.iter().chain(&batches[2]);
    for (logged, point) in second.iter().zip(expected) {
        assert_eq!(logged[5].as_u64(), Some(point.ring as u64));
        assert_eq!(logged[6].as_u64(), Some(point.azimuth as u64));
        assert_eq!(logged[8].as_f64(), Some(point.time_stamp));
    }
}
